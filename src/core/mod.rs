pub mod driver;

pub use crate::domain::model::Scene;
pub use crate::domain::ports::{ConfigProvider, Host, Storage};
pub use crate::utils::error::Result;
pub use driver::{ConversionDriver, ConversionReport, ConversionRequest};
