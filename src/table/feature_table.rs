use crate::config::OutputConfig;
use crate::error::{ImageError, Result};
use crate::model::FeatureVector;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One output row: an image identifier, its class label and its features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub identifier: String,
    pub label: u8,
    pub features: FeatureVector,
}

/// Column naming for a feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub id_column: String,
    pub feature_prefix: String,
    pub dimension: usize,
}

impl TableSchema {
    pub fn new(config: &OutputConfig, dimension: usize) -> Self {
        Self {
            id_column: config.id_column.clone(),
            feature_prefix: config.feature_prefix.clone(),
            dimension,
        }
    }

    /// `patient_id, label, resnet_feat_1 .. resnet_feat_D`
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.dimension + 2);
        header.push(self.id_column.clone());
        header.push("label".to_string());
        header.extend((1..=self.dimension).map(|i| format!("{}{}", self.feature_prefix, i)));
        header
    }
}

/// All rows of one modality, kept in memory until the pass finishes.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    schema: TableSchema,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Appends a row whose vector has exactly the schema's width.
    ///
    /// A vector of any other length means the network produced something
    /// unexpected, so it is reported as an inference failure for that image.
    pub fn push(&mut self, row: FeatureRow) -> std::result::Result<(), ImageError> {
        if row.features.len() != self.schema.dimension {
            return Err(ImageError::Inference(format!(
                "expected {} features, got {}",
                self.schema.dimension,
                row.features.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows per label, in label order.
    pub fn label_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.label).or_insert(0) += 1;
        }
        counts
    }

    /// Writes the whole table as CSV, replacing any existing file.
    ///
    /// The header is written even when there are no rows.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.schema.header())?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.features.len() + 2);
            record.push(row.identifier.clone());
            record.push(row.label.to_string());
            record.extend(row.features.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Label counts ordered the way they are reported: most frequent first,
/// ties broken by label.
pub fn sorted_label_counts(counts: &BTreeMap<u8, usize>) -> Vec<(u8, usize)> {
    let mut sorted: Vec<(u8, usize)> = counts.iter().map(|(l, c)| (*l, *c)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sorted
}
