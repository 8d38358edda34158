use crate::utils::error::{ConvertError, Result};
use std::fmt;
use std::path::Path;

/// 支援的輸入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Fbx,
    Obj,
    Stl,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [SourceFormat::Fbx, SourceFormat::Obj, SourceFormat::Stl];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Fbx => "fbx",
            Self::Obj => "obj",
            Self::Stl => "stl",
        }
    }

    /// 依副檔名（不分大小寫）判斷格式
    pub fn from_extension(extension: &str) -> Result<Self> {
        let lowered = extension.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extension() == lowered)
            .ok_or(ConvertError::UnsupportedFormat { extension: lowered })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_extension(&extension_of(path.as_ref()))
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// 檔名最後一個 '.' 之後的字串，沒有 '.' 時為空字串
pub fn extension_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions_any_case() {
        assert_eq!(SourceFormat::from_path("a/b/model.fbx").unwrap(), SourceFormat::Fbx);
        assert_eq!(SourceFormat::from_path("model.OBJ").unwrap(), SourceFormat::Obj);
        assert_eq!(SourceFormat::from_path("model.Stl").unwrap(), SourceFormat::Stl);
        assert_eq!(SourceFormat::from_path("archive.tar.obj").unwrap(), SourceFormat::Obj);
    }

    #[test]
    fn test_unsupported_extensions() {
        for (path, expected) in [("scene.dae", "dae"), ("model", ""), ("model.", ""), ("dir.obj/model", "")] {
            match SourceFormat::from_path(path) {
                Err(ConvertError::UnsupportedFormat { extension }) => assert_eq!(extension, expected),
                other => panic!("expected UnsupportedFormat for {}, got {:?}", path, other),
            }
        }
    }

    #[test]
    fn test_extension_of_hidden_file() {
        assert_eq!(extension_of(Path::new(".obj")), "obj");
        assert_eq!(extension_of(Path::new("MODEL.FBX")), "fbx");
    }
}
