use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Host 端（匯入器 / 匯出器）回報的錯誤，對驅動程式而言是不透明的
#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ load failed: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("STL parse error: {message}")]
    Stl { message: String },

    #[error("FBX parse error: {message}")]
    Fbx { message: String },

    #[error("GLB encode error: {message}")]
    Glb { message: String },

    #[error("glTF serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    pub fn stl(message: impl Into<String>) -> Self {
        Self::Stl {
            message: message.into(),
        }
    }

    pub fn fbx(message: impl Into<String>) -> Self {
        Self::Fbx {
            message: message.into(),
        }
    }

    pub fn glb(message: impl Into<String>) -> Self {
        Self::Glb {
            message: message.into(),
        }
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// 驅動程式呼叫的 host 操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOperation {
    ImportFbx,
    ImportObj,
    ImportStl,
    ExportGlb,
}

impl fmt::Display for HostOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ImportFbx => "import FBX",
            Self::ImportObj => "import OBJ",
            Self::ImportStl => "import STL",
            Self::ExportGlb => "export GLB",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Missing argument: expected <input_file> <output_file> after '--', got {found}")]
    MissingArgument { found: usize },

    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Host operation '{operation}' failed for {}: {source}", path.display())]
    HostOperation {
        operation: HostOperation,
        path: PathBuf,
        #[source]
        source: HostError,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Usage,
    Configuration,
    Host,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ConvertError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingArgument { .. } | Self::UnsupportedFormat { .. } => ErrorCategory::Usage,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::HostOperation { .. } => ErrorCategory::Host,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Usage | ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Host => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 依嚴重程度決定行程結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingArgument { .. } => {
                "Pass both paths after the separator: mesh2glb -- <input_file> <output_file>"
                    .to_string()
            }
            Self::UnsupportedFormat { .. } => {
                "Use an input file with one of the extensions: fbx, obj, stl".to_string()
            }
            Self::HostOperation { operation, .. } => match operation {
                HostOperation::ExportGlb => {
                    "Check that the output directory is writable and has free space".to_string()
                }
                _ => "Check that the input file exists and is not corrupt".to_string(),
            },
            Self::IoError(_) => "Check file permissions and paths".to_string(),
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line options".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingArgument { found } => format!(
                "Expected an input and an output path after '--' but got {}",
                found
            ),
            Self::UnsupportedFormat { extension } if extension.is_empty() => {
                "The input file has no extension, cannot pick an importer".to_string()
            }
            Self::UnsupportedFormat { extension } => {
                format!("Unsupported file type: {}", extension)
            }
            Self::HostOperation {
                operation,
                path,
                source,
            } => format!("Failed to {} '{}': {}", operation, path.display(), source),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
