use crate::config::DatasetConfig;
use std::path::Path;

/// Decides which files inside a class folder are images to process.
///
/// Matching is case-sensitive: with extension `png`, `scan.PNG` is skipped.
pub struct ImageFilter {
    suffix: String,
}

impl ImageFilter {
    pub fn new(config: &DatasetConfig) -> Self {
        Self::with_extension(&config.image_extension)
    }

    pub fn with_extension(extension: &str) -> Self {
        Self {
            suffix: format!(".{}", extension),
        }
    }

    pub fn is_image_file(&self, path: &Path) -> bool {
        self.identifier(path).is_some()
    }

    /// File name with the image extension removed, or `None` when the file
    /// does not carry the extension.
    pub fn identifier(&self, path: &Path) -> Option<String> {
        let name = path.file_name().and_then(|n| n.to_str())?;
        name.strip_suffix(self.suffix.as_str())
            .map(|stem| stem.to_string())
    }

    pub fn extension(&self) -> &str {
        &self.suffix[1..]
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new(&DatasetConfig::default())
    }
}
