use crate::error::{ImageError, Result, SpectroFeatError};
use crate::scanner::ImageFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// An image that produced no row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub stage: String,
    pub message: String,
}

impl ImageFailure {
    pub fn new(image: &ImageFile, error: &ImageError) -> Self {
        Self {
            path: image.path.clone(),
            stage: error.stage().to_string(),
            message: error.message().to_string(),
        }
    }

    pub fn display_line(&self) -> String {
        format!(
            "Error processing {} ({}): {}",
            self.path.display(),
            self.stage,
            self.message
        )
    }
}

/// Running counters for one modality pass.
#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub images_processed: usize,
    pub total_images: usize,
    pub skipped_files: usize,
    pub current_folder: Option<String>,
    pub start_time: Instant,
    pub failures: Vec<ImageFailure>,
}

impl ExtractionProgress {
    pub fn new() -> Self {
        Self {
            images_processed: 0,
            total_images: 0,
            skipped_files: 0,
            current_folder: None,
            start_time: Instant::now(),
            failures: Vec::new(),
        }
    }

    pub fn start_folder(&mut self, name: &str, images: usize, skipped_files: usize) {
        self.current_folder = Some(name.to_string());
        self.total_images += images;
        self.skipped_files += skipped_files;
    }

    pub fn record_success(&mut self) {
        self.images_processed += 1;
    }

    pub fn record_failure(&mut self, failure: ImageFailure) {
        self.images_processed += 1;
        self.failures.push(failure);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ExtractionProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one modality pass, printed to the console and optionally
/// saved as JSON next to the CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityReport {
    pub modality: String,
    pub model: String,
    pub device: String,
    pub input_root: PathBuf,
    pub output_path: PathBuf,
    pub rows_written: usize,
    pub feature_dimension: usize,
    pub label_counts: BTreeMap<u8, usize>,
    pub class_folders: Vec<String>,
    pub malformed_folders: Vec<String>,
    pub skipped_files: usize,
    pub failures: Vec<ImageFailure>,
    pub duration: Duration,
    pub extracted_at: DateTime<Utc>,
}

impl ModalityReport {
    pub fn has_warnings(&self) -> bool {
        !self.failures.is_empty() || self.rows_written == 0
    }

    /// `<table stem>.report.json` beside the CSV.
    pub fn report_path(&self) -> PathBuf {
        report_path_for(&self.output_path)
    }

    pub fn save_json(&self) -> Result<PathBuf> {
        let path = self.report_path();
        let json = serde_json::to_string_pretty(self).map_err(|e| SpectroFeatError::Config {
            message: format!("Failed to serialize report to JSON: {}", e),
        })?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

pub fn report_path_for(table_path: &Path) -> PathBuf {
    let stem = table_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "features".to_string());
    table_path.with_file_name(format!("{}.report.json", stem))
}
