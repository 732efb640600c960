pub mod class_folder;
pub mod dataset_scanner;
pub mod file_filter;

pub use class_folder::{parse_class_label, ClassFolder, ImageFile};
pub use dataset_scanner::{ClassFolderScan, DatasetScanner, FolderListing, ScanStatistics};
pub use file_filter::ImageFilter;
