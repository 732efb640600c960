use crate::config::DatasetConfig;
use crate::error::{Result, SpectroFeatError};
use crate::scanner::class_folder::{ClassFolder, ImageFile};
use crate::scanner::file_filter::ImageFilter;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Images found in one class folder.
#[derive(Debug, Clone, Default)]
pub struct FolderListing {
    pub images: Vec<ImageFile>,
    pub skipped_files: usize,
}

/// Class folders found under one modality root.
#[derive(Debug, Clone, Default)]
pub struct ClassFolderScan {
    pub folders: Vec<ClassFolder>,
    /// Names of directories skipped because their label could not be parsed.
    pub malformed: Vec<String>,
}

pub struct DatasetScanner {
    filter: ImageFilter,
    skip_malformed_folders: bool,
}

impl DatasetScanner {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            filter: ImageFilter::new(config),
            skip_malformed_folders: config.skip_malformed_folders,
        }
    }

    pub fn with_skip_malformed(mut self, skip: bool) -> Self {
        self.skip_malformed_folders = skip;
        self
    }

    /// Lists the class folders directly under `root`, sorted by name.
    ///
    /// Plain files are ignored. A directory whose name carries no label digit
    /// fails the scan unless malformed folders are configured to be skipped.
    pub fn class_folders<P: AsRef<Path>>(&self, root: P) -> Result<ClassFolderScan> {
        let root_path = root.as_ref();
        validate_root(root_path)?;

        let mut scan = ClassFolderScan::default();

        let walker = WalkDir::new(root_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| SpectroFeatError::Io(e.into()))?;

            // Follows symlinks, so a linked class folder still counts.
            if !entry.path().is_dir() {
                continue;
            }

            match ClassFolder::from_path(entry.path()) {
                Ok(folder) => scan.folders.push(folder),
                Err(_) if self.skip_malformed_folders => {
                    let name = entry.file_name().to_string_lossy().to_string();
                    tracing::debug!(folder = %name, "skipping folder without class label");
                    scan.malformed.push(name);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(scan)
    }

    /// Lists the images of one class folder in file-system order.
    pub fn images(&self, folder: &ClassFolder) -> Result<FolderListing> {
        let mut listing = FolderListing::default();

        let walker = WalkDir::new(&folder.path).min_depth(1).max_depth(1);

        for entry in walker {
            let entry = entry.map_err(|e| SpectroFeatError::Io(e.into()))?;
            let path = entry.path();

            match self.filter.identifier(path) {
                Some(identifier) => listing.images.push(ImageFile::new(
                    path.to_path_buf(),
                    identifier,
                    folder.label,
                )),
                None => listing.skipped_files += 1,
            }
        }

        Ok(listing)
    }

    pub fn get_statistics(&self, listings: &[(ClassFolder, FolderListing)]) -> ScanStatistics {
        let mut stats = ScanStatistics {
            class_folders: listings.len(),
            ..ScanStatistics::default()
        };

        for (folder, listing) in listings {
            stats.total_images += listing.images.len();
            stats.skipped_files += listing.skipped_files;
            *stats.images_by_label.entry(folder.label).or_insert(0) += listing.images.len();
        }

        stats
    }
}

fn validate_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(SpectroFeatError::InvalidPath {
            path: root.display().to_string(),
        });
    }

    if !root.is_dir() {
        return Err(SpectroFeatError::InvalidPath {
            path: format!("{} is not a directory", root.display()),
        });
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub class_folders: usize,
    pub total_images: usize,
    pub skipped_files: usize,
    pub images_by_label: BTreeMap<u8, usize>,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  Class folders: {}\n  Images: {}\n  Skipped files: {}\n",
            self.class_folders, self.total_images, self.skipped_files
        );

        if !self.images_by_label.is_empty() {
            summary.push_str("  Images by label:\n");
            for (label, count) in &self.images_by_label {
                summary.push_str(&format!("    {}: {} images\n", label, count));
            }
        }

        summary
    }
}
