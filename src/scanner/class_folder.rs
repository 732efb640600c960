use crate::error::{Result, SpectroFeatError};
use std::path::{Path, PathBuf};

/// Character offset of the label digit inside the folder name (`C0_xxx`).
const LABEL_OFFSET: usize = 1;

/// A class-labelled directory such as `C1_pathological`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFolder {
    pub path: PathBuf,
    pub name: String,
    pub label: u8,
}

impl ClassFolder {
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SpectroFeatError::InvalidClassFolder {
                folder: path.display().to_string(),
            })?
            .to_string();

        let label = parse_class_label(&name)?;

        Ok(Self { path, name, label })
    }
}

/// Reads the label digit that follows the marker character in the first
/// `_`-delimited token of a folder name.
pub fn parse_class_label(folder_name: &str) -> Result<u8> {
    let token = folder_name.split('_').next().unwrap_or("");

    token
        .chars()
        .nth(LABEL_OFFSET)
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
        .ok_or_else(|| SpectroFeatError::InvalidClassFolder {
            folder: folder_name.to_string(),
        })
}

/// An image inside a class folder that will become one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub identifier: String,
    pub label: u8,
}

impl ImageFile {
    pub fn new(path: PathBuf, identifier: String, label: u8) -> Self {
        Self {
            path,
            identifier,
            label,
        }
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_label() {
        assert_eq!(parse_class_label("C0_healthy").unwrap(), 0);
        assert_eq!(parse_class_label("C1_sample").unwrap(), 1);
        assert_eq!(parse_class_label("C7").unwrap(), 7);
        // Only the digit right after the marker is read.
        assert_eq!(parse_class_label("C12_extra").unwrap(), 1);
        // The marker itself is not checked.
        assert_eq!(parse_class_label("X3_other").unwrap(), 3);
    }

    #[test]
    fn test_parse_class_label_rejects_malformed_names() {
        for name in ["healthy", "C_0", "", "C", "Cx_1", "_C0"] {
            let err = parse_class_label(name).unwrap_err();
            assert!(
                matches!(err, SpectroFeatError::InvalidClassFolder { ref folder } if folder == name),
                "Should reject: {}",
                name
            );
        }
    }

    #[test]
    fn test_class_folder_from_path() {
        let folder = ClassFolder::from_path("/data/speech/C2_mild").unwrap();
        assert_eq!(folder.name, "C2_mild");
        assert_eq!(folder.label, 2);
        assert_eq!(folder.path, PathBuf::from("/data/speech/C2_mild"));

        assert!(ClassFolder::from_path("/data/speech/misc").is_err());
    }

    #[test]
    fn test_image_file_accessors() {
        let image = ImageFile::new(PathBuf::from("/data/C0_a/p01.png"), "p01".to_string(), 0);
        assert_eq!(image.file_name(), "p01.png");
        assert_eq!(image.display_path(), "/data/C0_a/p01.png");
    }
}
