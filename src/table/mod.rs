pub mod feature_table;
pub mod report;

pub use feature_table::{sorted_label_counts, FeatureRow, FeatureTable, TableSchema};
pub use report::{ExtractionProgress, ImageFailure, ModalityReport};
