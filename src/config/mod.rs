pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "mesh2glb")]
#[command(about = "Convert an FBX, OBJ or STL model into a binary glTF (GLB) file")]
#[command(override_usage = "mesh2glb [OPTIONS] -- <input_file> <output_file>")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log process CPU and memory usage after each phase
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override import.global_scale from the config file
    #[arg(long)]
    pub scale: Option<f32>,

    /// Everything after `--`: <input_file> <output_file>
    #[arg(last = true, value_name = "ARGS")]
    pub paths: Vec<String>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 TOML 配置（若有指定）並套用命令列覆蓋設定
    pub fn load_settings(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                crate::utils::validation::validate_path("config", path)?;
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        if let Some(scale) = self.scale {
            config.import.global_scale = scale;
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if self.verbose {
            config.logging.verbose = true;
        }

        Ok(config)
    }
}
