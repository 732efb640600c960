pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod scanner;
pub mod table;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, DatasetConfig, DevicePreference, ModelConfig, OutputConfig};
pub use error::{ImageError, Result, SpectroFeatError, UserFriendlyError};

// Core functionality re-exports
pub use model::{ComputeDevice, FeatureExtractor, FeatureVector, ResNetExtractor};
pub use scanner::{ClassFolder, DatasetScanner, ImageFile, ScanStatistics};
pub use table::{FeatureRow, FeatureTable, ImageFailure, ModalityReport, TableSchema};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use chrono::Utc;
use std::path::{Path, PathBuf};
use table::ExtractionProgress;
use ui::ProgressAwareOutput;

/// Main library interface: one configured extraction run over all modalities.
pub struct SpectroFeat {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

/// What a modality pass would read and write, as shown by `--dry-run`.
#[derive(Debug)]
pub struct ModalityPlan {
    pub modality: String,
    pub input_root: PathBuf,
    pub output_path: PathBuf,
    pub statistics: ScanStatistics,
    pub malformed_folders: Vec<String>,
}

impl SpectroFeat {
    /// Create a new instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create an instance without installing a Ctrl+C handler, so several
    /// can live in one test process.
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::with_shutdown(
            config,
            output_mode,
            verbose,
            quiet,
            GracefulShutdown::new_for_test(),
        )
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        // Bars would interleave with JSON lines
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create an instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(
            config,
            cli_args.output_format.into(),
            cli_args.verbose,
            cli_args.quiet,
        )
    }

    /// Resolves the compute device and loads the ResNet-18 weights once.
    pub fn load_extractor(&self) -> Result<ResNetExtractor> {
        self.output_formatter.start_operation("Loading feature extractor");

        let compute_device = ComputeDevice::resolve(self.config.model.device)?;
        self.output_formatter
            .info(&format!("Using device: {}", compute_device));

        let spinner = self.progress_manager.create_spinner(&format!(
            "Loading {} weights from {}",
            self.config.model.architecture,
            self.config.model.weights.display()
        ));

        let extractor = match ResNetExtractor::load(&self.config.model, compute_device) {
            Ok(extractor) => extractor,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };

        ui::progress::finish_progress_with_summary(
            &spinner,
            &format!("{} ready on {}", extractor.name(), compute_device),
            spinner.elapsed(),
        );

        Ok(extractor)
    }

    /// Runs every configured modality in order, printing each report as
    /// soon as its table is written. The first fatal error stops the run.
    pub fn run(&self, extractor: &dyn FeatureExtractor) -> Result<Vec<ModalityReport>> {
        let mut reports = Vec::with_capacity(self.config.dataset.modalities.len());

        for modality in &self.config.dataset.modalities {
            self.shutdown.check_shutdown()?;

            let report = self.process_modality(
                extractor,
                modality,
                &self.config.modality_dir(modality),
                &self.config.output_path(modality),
            )?;

            self.output_formatter.print_modality_report(&report);
            reports.push(report);
        }

        Ok(reports)
    }

    /// Extracts one row per image under `input_root` and writes them to
    /// `output_path`.
    ///
    /// Images that fail to decode, transform or run through the network are
    /// reported and skipped. Folder and listing problems abort the pass
    /// before anything is written.
    pub fn process_modality(
        &self,
        extractor: &dyn FeatureExtractor,
        modality: &str,
        input_root: &Path,
        output_path: &Path,
    ) -> Result<ModalityReport> {
        self.output_formatter.start_operation(&format!(
            "Extracting {} features from {}",
            modality,
            input_root.display()
        ));

        let scanner = DatasetScanner::new(&self.config.dataset);
        let scan = scanner.class_folders(input_root)?;

        let schema = TableSchema::new(&self.config.output, extractor.dimension());
        let mut table = FeatureTable::new(schema);
        let mut progress = ExtractionProgress::new();
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));

        for folder in &scan.folders {
            self.shutdown.check_shutdown()?;

            let listing = scanner.images(folder)?;
            progress.start_folder(&folder.name, listing.images.len(), listing.skipped_files);
            tracing::debug!(
                folder = %folder.name,
                label = folder.label,
                images = listing.images.len(),
                skipped = listing.skipped_files,
                "processing class folder"
            );

            if !self.progress_manager.is_enabled() {
                self.output_formatter.start_operation(&format!(
                    "Class folder {} (label {}, {} images)",
                    folder.name,
                    folder.label,
                    listing.images.len()
                ));
            }

            let pb = self
                .progress_manager
                .create_folder_progress(&folder.name, listing.images.len() as u64);

            for image in &listing.images {
                if let Err(e) = self.shutdown.check_shutdown() {
                    pb.abandon();
                    return Err(e);
                }

                let outcome = extract_image(extractor, image).and_then(|features| {
                    table.push(FeatureRow {
                        identifier: image.identifier.clone(),
                        label: image.label,
                        features,
                    })
                });

                match outcome {
                    Ok(()) => progress.record_success(),
                    Err(error) => {
                        let failure = ImageFailure::new(image, &error);
                        tracing::debug!(
                            path = %image.display_path(),
                            stage = error.stage(),
                            "{}",
                            error.message()
                        );
                        output.error(&failure.display_line());
                        progress.record_failure(failure);
                    }
                }

                ui::progress::update_folder_progress(&pb, &progress, image.file_name());
            }

            ui::progress::finish_progress_with_summary(
                &pb,
                &format!("{} images", listing.images.len()),
                pb.elapsed(),
            );
        }

        table.write_csv(output_path)?;

        let report = ModalityReport {
            modality: modality.to_string(),
            model: extractor.name().to_string(),
            device: extractor.device().to_string(),
            input_root: input_root.to_path_buf(),
            output_path: output_path.to_path_buf(),
            rows_written: table.len(),
            feature_dimension: extractor.dimension(),
            label_counts: table.label_counts(),
            class_folders: scan.folders.iter().map(|f| f.name.clone()).collect(),
            malformed_folders: scan.malformed,
            skipped_files: progress.skipped_files,
            failures: progress.failures.clone(),
            duration: progress.elapsed(),
            extracted_at: Utc::now(),
        };

        if self.config.output.generate_report {
            let report_path = report.save_json()?;
            self.output_formatter
                .debug(&format!("Report written to {}", report_path.display()));
        }

        Ok(report)
    }

    /// Scans every modality without loading the model.
    pub fn plan(&self) -> Result<Vec<ModalityPlan>> {
        let scanner = DatasetScanner::new(&self.config.dataset);
        let mut plans = Vec::with_capacity(self.config.dataset.modalities.len());

        for modality in &self.config.dataset.modalities {
            let input_root = self.config.modality_dir(modality);
            let scan = scanner.class_folders(&input_root)?;

            let mut listings = Vec::with_capacity(scan.folders.len());
            for folder in scan.folders {
                let listing = scanner.images(&folder)?;
                listings.push((folder, listing));
            }

            plans.push(ModalityPlan {
                modality: modality.clone(),
                output_path: self.config.output_path(modality),
                statistics: scanner.get_statistics(&listings),
                malformed_folders: scan.malformed,
                input_root,
            });
        }

        Ok(plans)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &SpectroFeatError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn extract_image(
    extractor: &dyn FeatureExtractor,
    image: &ImageFile,
) -> std::result::Result<FeatureVector, ImageError> {
    let rgb = model::load_rgb_image(&image.path)?;
    extractor.extract(&rgb)
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SpectroFeat {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    /// Mean of each channel, repeated to fill the requested width.
    struct MeanColorExtractor {
        dimension: usize,
    }

    impl FeatureExtractor for MeanColorExtractor {
        fn name(&self) -> &str {
            "mean-color"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn extract(&self, image: &RgbImage) -> std::result::Result<FeatureVector, ImageError> {
            let pixels = (image.width() * image.height()).max(1) as f32;
            let mut sums = [0f32; 3];
            for pixel in image.pixels() {
                for c in 0..3 {
                    sums[c] += pixel[c] as f32;
                }
            }
            Ok((0..self.dimension).map(|i| sums[i % 3] / pixels).collect())
        }
    }

    struct ShortExtractor;

    impl FeatureExtractor for ShortExtractor {
        fn name(&self) -> &str {
            "short"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn extract(&self, _image: &RgbImage) -> std::result::Result<FeatureVector, ImageError> {
            Ok(vec![0.0; 2])
        }
    }

    fn write_png(path: &Path, color: [u8; 3]) {
        RgbImage::from_pixel(6, 4, Rgb(color)).save(path).unwrap();
    }

    fn build_modality(root: &Path) {
        let c0 = root.join("C0_sample");
        let c1 = root.join("C1_sample");
        fs::create_dir_all(&c0).unwrap();
        fs::create_dir_all(&c1).unwrap();

        write_png(&c0.join("p01.png"), [10, 20, 30]);
        write_png(&c0.join("p02.png"), [40, 50, 60]);
        fs::write(c0.join("broken.png"), b"").unwrap();
        fs::write(c0.join("notes.txt"), b"not an image").unwrap();
        write_png(&c1.join("p03.png"), [200, 100, 0]);
    }

    fn test_app(root: &Path) -> SpectroFeat {
        let mut config = Config::default();
        config.dataset.spectrogram_dir = root.join("Spectrograms");
        config.output.directory = root.join("Deep_Features");
        SpectroFeat::new_for_test(config, OutputMode::Plain, 0, true)
    }

    #[test]
    fn test_process_modality_skips_failures() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(temp_dir.path());
        let input = app.config().modality_dir("speech");
        build_modality(&input);
        let output = app.config().output_path("speech");

        let extractor = MeanColorExtractor { dimension: 6 };
        let report = app
            .process_modality(&extractor, "speech", &input, &output)
            .unwrap();

        assert_eq!(report.rows_written, 3);
        assert_eq!(report.label_counts.get(&0), Some(&2));
        assert_eq!(report.label_counts.get(&1), Some(&1));
        assert_eq!(report.skipped_files, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, "decode");
        assert!(report.failures[0].path.ends_with("broken.png"));
        assert!(report.has_warnings());
        assert_eq!(report.device, "cpu");

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("patient_id,label,resnet_feat_1,"));
        assert!(lines[0].ends_with("resnet_feat_6"));
        // Class folders are visited in name order
        assert!(lines[3].starts_with("p03,1,200,100,0,"));

        assert!(report.report_path().exists());
    }

    #[test]
    fn test_run_processes_modalities_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(temp_dir.path());
        build_modality(&app.config().modality_dir("speech"));
        build_modality(&app.config().modality_dir("egg"));

        let reports = app.run(&MeanColorExtractor { dimension: 3 }).unwrap();
        let modalities: Vec<_> = reports.iter().map(|r| r.modality.as_str()).collect();
        assert_eq!(modalities, vec!["speech", "egg"]);
        assert!(app.config().output_path("egg").exists());
    }

    #[test]
    fn test_missing_modality_root_stops_run() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(temp_dir.path());
        build_modality(&app.config().modality_dir("speech"));

        let result = app.run(&MeanColorExtractor { dimension: 3 });
        assert!(matches!(result, Err(SpectroFeatError::InvalidPath { .. })));
        // The first modality completed before the second failed
        assert!(app.config().output_path("speech").exists());
        assert!(!app.config().output_path("egg").exists());
    }

    #[test]
    fn test_malformed_folder_is_fatal_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(temp_dir.path());
        let input = app.config().modality_dir("speech");
        build_modality(&input);
        fs::create_dir(input.join("unlabelled")).unwrap();
        let output = app.config().output_path("speech");

        let result =
            app.process_modality(&MeanColorExtractor { dimension: 3 }, "speech", &input, &output);
        assert!(matches!(
            result,
            Err(SpectroFeatError::InvalidClassFolder { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_malformed_folder_skipped_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path());
        app.config.dataset.skip_malformed_folders = true;
        let input = app.config().modality_dir("speech");
        build_modality(&input);
        fs::create_dir(input.join("unlabelled")).unwrap();
        let output = app.config().output_path("speech");

        let report = app
            .process_modality(&MeanColorExtractor { dimension: 3 }, "speech", &input, &output)
            .unwrap();
        assert_eq!(report.rows_written, 3);
        assert_eq!(report.malformed_folders, vec!["unlabelled"]);
    }

    #[test]
    fn test_wrong_vector_length_is_inference_failure() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(temp_dir.path());
        let input = app.config().modality_dir("egg");
        build_modality(&input);
        let output = app.config().output_path("egg");

        let report = app
            .process_modality(&ShortExtractor, "egg", &input, &output)
            .unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.failures.len(), 4);
        assert!(report.failures.iter().any(|f| f.stage == "inference"));

        // Empty table still carries its header
        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_shutdown_cancels_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(temp_dir.path());
        let input = app.config().modality_dir("speech");
        build_modality(&input);
        let output = app.config().output_path("speech");

        app.request_shutdown();
        assert!(!app.is_running());

        let result =
            app.process_modality(&MeanColorExtractor { dimension: 3 }, "speech", &input, &output);
        assert!(matches!(result, Err(SpectroFeatError::Cancelled)));
        assert!(!output.exists());
    }

    #[test]
    fn test_plan_counts_images() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path());
        app.config.dataset.modalities = vec!["speech".to_string()];
        build_modality(&app.config().modality_dir("speech"));

        let plans = app.plan().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].statistics.class_folders, 2);
        assert_eq!(plans[0].statistics.total_images, 4);
        assert_eq!(plans[0].statistics.skipped_files, 1);
        assert!(plans[0].output_path.ends_with("resnet18_speech_features.csv"));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        SpectroFeat::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[dataset]"));
        assert!(content.contains("[model]"));
        assert!(content.contains("[output]"));
    }

    #[test]
    fn test_build_info_display() {
        assert!(!version_info().is_empty());
        let build_info = build_info();
        let display_string = build_info.to_string();
        assert!(display_string.contains("SpectroFeat"));
        assert!(display_string.contains(build_info.version));
    }
}
