pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::NativeHost;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{ConversionDriver, ConversionReport, ConversionRequest};
pub use domain::{format::SourceFormat, model::Scene, ports::Host};
pub use utils::error::{ConvertError, HostError, Result};
