use crate::config::{CliOverrides, Config, DevicePreference};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spectrofeat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract pretrained ResNet-18 features from spectrogram image folders")]
#[command(
    long_about = "SpectroFeat walks class-labelled spectrogram folders (C0_*, C1_*, ...) for each \
                  modality, runs every image through a headless ResNet-18 and writes one CSV \
                  feature table per modality."
)]
#[command(after_help = "EXAMPLES:\n  \
    spectrofeat\n  \
    spectrofeat --spectrogram-dir data/Spectrograms --output-dir features\n  \
    spectrofeat --modalities egg --device cpu --weights models/resnet18.safetensors\n  \
    spectrofeat --config spectrofeat.toml --dry-run\n  \
    spectrofeat --generate-config --config spectrofeat.toml")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Root holding one directory per modality
    #[arg(short, long)]
    pub spectrogram_dir: Option<PathBuf>,

    /// Directory the feature tables are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Modalities to process, in order (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub modalities: Option<Vec<String>>,

    /// ResNet-18 weights in safetensors format
    #[arg(short, long)]
    pub weights: Option<PathBuf>,

    /// Compute device for the forward pass
    #[arg(long, value_enum)]
    pub device: Option<DevicePreference>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "List class folders and images without loading the model")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_spectrogram_dir(self.spectrogram_dir.clone())
            .with_modalities(self.modalities.clone())
            .with_output_dir(self.output_dir.clone())
            .with_weights(self.weights.clone())
            .with_device(self.device)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
