use image::{Rgb, RgbImage};
use spectrofeat::{
    Config, FeatureExtractor, FeatureVector, ImageError, ModalityReport, OutputMode, SpectroFeat,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Deterministic stand-in for the network: channel means of a corner patch.
struct PatchExtractor;

impl FeatureExtractor for PatchExtractor {
    fn name(&self) -> &str {
        "patch"
    }

    fn dimension(&self) -> usize {
        8
    }

    fn extract(&self, image: &RgbImage) -> Result<FeatureVector, ImageError> {
        let pixel = image.get_pixel(0, 0);
        Ok((0..8)
            .map(|i| pixel[i % 3] as f32 / 255.0 + i as f32)
            .collect())
    }
}

fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .unwrap();
}

/// C0_sample: two valid images and a zero-byte one; C1_sample: one valid image.
fn sample_tree(root: &Path) {
    let c0 = root.join("C0_sample");
    let c1 = root.join("C1_sample");
    fs::create_dir_all(&c0).unwrap();
    fs::create_dir_all(&c1).unwrap();

    write_png(&c0.join("a.png"), 32, 16, [0, 128, 255]);
    write_png(&c0.join("b.png"), 5, 90, [10, 10, 10]);
    fs::write(c0.join("empty.png"), b"").unwrap();
    write_png(&c1.join("c.png"), 64, 64, [255, 0, 0]);
}

fn app_for(temp: &Path, modalities: &[&str]) -> SpectroFeat {
    let mut config = Config::default();
    config.dataset.spectrogram_dir = temp.join("Spectrograms");
    config.dataset.modalities = modalities.iter().map(|m| m.to_string()).collect();
    config.output.directory = temp.join("Deep_Features");
    SpectroFeat::new_for_test(config, OutputMode::Plain, 0, true)
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[test]
fn corrupt_image_does_not_block_other_rows() {
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(temp_dir.path(), &["speech"]);
    sample_tree(&app.config().modality_dir("speech"));

    let reports = app.run(&PatchExtractor).unwrap();
    let report: &ModalityReport = &reports[0];

    assert_eq!(report.rows_written, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, "decode");
    assert_eq!(report.label_counts.get(&0), Some(&2));
    assert_eq!(report.label_counts.get(&1), Some(&1));

    let rows = read_rows(&app.config().output_path("speech"));
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.len(), 2 + 8);
    }

    let mut c0_ids: Vec<_> = rows
        .iter()
        .filter(|r| r[1] == "0")
        .map(|r| r[0].as_str())
        .collect();
    c0_ids.sort();
    assert_eq!(c0_ids, vec!["a", "b"]);

    // C1 rows follow C0 rows
    assert_eq!(rows[2][0], "c");
    assert_eq!(rows[2][1], "1");
}

#[test]
fn header_names_every_feature_column() {
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(temp_dir.path(), &["egg"]);
    sample_tree(&app.config().modality_dir("egg"));

    app.run(&PatchExtractor).unwrap();

    let mut reader = csv::Reader::from_path(app.config().output_path("egg")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 10);
    assert_eq!(&headers[0], "patient_id");
    assert_eq!(&headers[1], "label");
    assert_eq!(&headers[2], "resnet_feat_1");
    assert_eq!(&headers[9], "resnet_feat_8");
}

#[test]
fn rerun_overwrites_previous_table() {
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(temp_dir.path(), &["speech"]);
    let root = app.config().modality_dir("speech");
    sample_tree(&root);

    app.run(&PatchExtractor).unwrap();
    fs::remove_file(root.join("C1_sample").join("c.png")).unwrap();
    let reports = app.run(&PatchExtractor).unwrap();

    assert_eq!(reports[0].rows_written, 2);
    assert_eq!(read_rows(&app.config().output_path("speech")).len(), 2);
}

#[test]
fn report_json_matches_table() {
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(temp_dir.path(), &["speech"]);
    sample_tree(&app.config().modality_dir("speech"));

    let reports = app.run(&PatchExtractor).unwrap();
    let saved: ModalityReport =
        serde_json::from_str(&fs::read_to_string(reports[0].report_path()).unwrap()).unwrap();

    assert_eq!(saved.rows_written, 3);
    assert_eq!(saved.feature_dimension, 8);
    assert_eq!(saved.class_folders, vec!["C0_sample", "C1_sample"]);
    assert!(saved.failures[0].path.ends_with("empty.png"));
}
