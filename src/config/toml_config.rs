use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ConvertError, Result};
use crate::utils::validation::{self, Validate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GENERATOR: &str = concat!("mesh2glb ", env!("CARGO_PKG_VERSION"));
pub const MAX_GLOBAL_SCALE: f32 = 10_000.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub import: ImportConfig,
    pub export: ExportConfig,
    pub monitoring: MonitoringConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub global_scale: f32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { global_scale: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub generator: String,
    pub copyright: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_string(),
            copyright: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub verbose: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConvertError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConvertError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MESH2GLB_COPYRIGHT})，未設定的變數原樣保留
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConvertError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn global_scale(&self) -> f32 {
        self.import.global_scale
    }

    fn generator(&self) -> &str {
        &self.export.generator
    }

    fn copyright(&self) -> Option<&str> {
        self.export.copyright.as_deref()
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_scale("import.global_scale", self.import.global_scale, MAX_GLOBAL_SCALE)?;
        validation::validate_non_empty_string("export.generator", &self.export.generator)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.global_scale(), 1.0);
        assert_eq!(config.generator(), DEFAULT_GENERATOR);
        assert!(config.copyright().is_none());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[import]
global_scale = 0.01

[export]
generator = "asset-pipeline"
copyright = "ACME"

[monitoring]
enabled = true

[logging]
json = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.global_scale(), 0.01);
        assert_eq!(config.generator(), "asset-pipeline");
        assert_eq!(config.copyright(), Some("ACME"));
        assert!(config.monitoring_enabled());
        assert!(config.logging.json);
        assert!(!config.logging.verbose);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MESH2GLB_TEST_COPYRIGHT", "Studio 42");

        let toml_content = r#"
[export]
copyright = "${MESH2GLB_TEST_COPYRIGHT}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.copyright(), Some("Studio 42"));

        std::env::remove_var("MESH2GLB_TEST_COPYRIGHT");
    }

    #[test]
    fn test_unset_env_var_is_kept() {
        let toml_content = r#"
[export]
copyright = "${MESH2GLB_SURELY_UNSET_VAR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.copyright(), Some("${MESH2GLB_SURELY_UNSET_VAR}"));
    }

    #[test]
    fn test_invalid_scale_fails_validation() {
        let config = TomlConfig::from_toml_str("[import]\nglobal_scale = -1.0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConvertError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let result = TomlConfig::from_toml_str("[import\nglobal_scale = ");
        assert!(matches!(result, Err(ConvertError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[export]\ngenerator = \"file-test\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.generator(), "file-test");
    }
}
