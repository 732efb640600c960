use crate::error::{Result, SpectroFeatError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Channel statistics the torchvision ImageNet weights were trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

const SAMPLE_CONFIG_HEADER: &str = "\
# spectrofeat configuration. Every key is optional; missing keys keep their defaults.
#
# model.weights must be torchvision's ImageNet ResNet-18 in safetensors form,
# e.g. resnet18.safetensors from https://huggingface.co/lmz/candle-resnet
";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub spectrogram_dir: PathBuf,
    pub modalities: Vec<String>,
    pub image_extension: String,
    pub skip_malformed_folders: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub architecture: String,
    pub weights: PathBuf,
    pub image_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub device: DevicePreference,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub id_column: String,
    pub feature_prefix: String,
    pub generate_report: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Accelerator when one is reported, host processor otherwise
    Auto,
    /// Always run on the host processor
    Cpu,
    /// Require a CUDA accelerator
    Cuda,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            model: ModelConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            spectrogram_dir: PathBuf::from("Extracted_Features").join("Spectrograms"),
            modalities: vec!["speech".to_string(), "egg".to_string()],
            image_extension: "png".to_string(),
            skip_malformed_folders: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: "resnet18".to_string(),
            weights: PathBuf::from("models").join("resnet18.safetensors"),
            image_size: 224,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            device: DevicePreference::Auto,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("Deep_Features"),
            file_prefix: "resnet18".to_string(),
            id_column: "patient_id".to_string(),
            feature_prefix: "resnet_feat_".to_string(),
            generate_report: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SpectroFeatError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SpectroFeatError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| SpectroFeatError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["spectrofeat.toml", ".spectrofeat.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref dir) = cli_args.spectrogram_dir {
            self.dataset.spectrogram_dir = dir.clone();
        }

        if let Some(ref modalities) = cli_args.modalities {
            self.dataset.modalities = modalities
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = output_dir.clone();
        }

        if let Some(ref weights) = cli_args.weights {
            self.model.weights = weights.clone();
        }

        if let Some(device) = cli_args.device {
            self.model.device = device;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| SpectroFeatError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| SpectroFeatError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dataset.modalities.is_empty() {
            return Err(SpectroFeatError::Config {
                message: "At least one modality must be specified".to_string(),
            });
        }

        let ext = &self.dataset.image_extension;
        if ext.is_empty() || ext.starts_with('.') {
            return Err(SpectroFeatError::Config {
                message: format!(
                    "Image extension must be non-empty and given without a leading dot (got '{}')",
                    ext
                ),
            });
        }

        if self.model.architecture != "resnet18" {
            return Err(SpectroFeatError::Config {
                message: format!(
                    "Unsupported architecture '{}' (supported: resnet18)",
                    self.model.architecture
                ),
            });
        }

        if self.model.image_size == 0 {
            return Err(SpectroFeatError::Config {
                message: "Model input size must be greater than 0".to_string(),
            });
        }

        if self.model.std.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
            return Err(SpectroFeatError::Config {
                message: "Normalization std values must be positive".to_string(),
            });
        }

        if self.output.id_column.trim().is_empty() || self.output.feature_prefix.trim().is_empty()
        {
            return Err(SpectroFeatError::Config {
                message: "Output column names must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Input root for one modality, e.g. `Extracted_Features/Spectrograms/speech`.
    pub fn modality_dir(&self, modality: &str) -> PathBuf {
        self.dataset.spectrogram_dir.join(modality)
    }

    /// Destination table for one modality, e.g. `Deep_Features/resnet18_speech_features.csv`.
    pub fn output_path(&self, modality: &str) -> PathBuf {
        self.output.directory.join(format!(
            "{}_{}_features.csv",
            self.output.file_prefix, modality
        ))
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        let body = toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new());
        format!("{}\n{}", SAMPLE_CONFIG_HEADER, body)
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub spectrogram_dir: Option<PathBuf>,
    pub modalities: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub weights: Option<PathBuf>,
    pub device: Option<DevicePreference>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spectrogram_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.spectrogram_dir = dir;
        self
    }

    pub fn with_modalities(mut self, modalities: Option<Vec<String>>) -> Self {
        self.modalities = modalities;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_weights(mut self, weights: Option<PathBuf>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_device(mut self, device: Option<DevicePreference>) -> Self {
        self.device = device;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset.modalities, vec!["speech", "egg"]);
        assert_eq!(config.dataset.image_extension, "png");
        assert_eq!(config.model.image_size, 224);
        assert_eq!(config.model.mean, IMAGENET_MEAN);
        assert_eq!(config.model.device, DevicePreference::Auto);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.dataset.modalities.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dataset.image_extension = ".png".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.std = [0.2, 0.0, 0.2];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.architecture = "vgg16".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.dataset.skip_malformed_folders = true;
        config.model.device = DevicePreference::Cpu;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert!(loaded_config.dataset.skip_malformed_folders);
        assert_eq!(loaded_config.model.device, DevicePreference::Cpu);
        assert_eq!(loaded_config.output.id_column, "patient_id");
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("definitely/not/here.toml");
        assert!(matches!(result, Err(SpectroFeatError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_modalities(Some(vec![" egg ".to_string(), "".to_string()]))
            .with_output_dir(Some(PathBuf::from("out")))
            .with_device(Some(DevicePreference::Cpu));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.dataset.modalities, vec!["egg"]);
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.model.device, DevicePreference::Cpu);
        assert_eq!(
            config.model.weights,
            PathBuf::from("models").join("resnet18.safetensors")
        );
    }

    #[test]
    fn test_modality_paths() {
        let config = Config::default();
        assert_eq!(
            config.modality_dir("speech"),
            PathBuf::from("Extracted_Features/Spectrograms/speech")
        );
        assert_eq!(
            config.output_path("egg"),
            PathBuf::from("Deep_Features/resnet18_egg_features.csv")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "[dataset]\nspectrogram_dir = \"data/specs\"\n\n[model]\ndevice = \"cpu\"\n",
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.dataset.spectrogram_dir, PathBuf::from("data/specs"));
        assert_eq!(config.dataset.modalities, vec!["speech", "egg"]);
        assert_eq!(config.model.device, DevicePreference::Cpu);
        assert_eq!(config.model.image_size, 224);
        assert_eq!(config.output.id_column, "patient_id");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("lmz/candle-resnet"));
        assert!(toml::from_str::<Config>(&sample).is_ok());
        assert!(sample.contains("[dataset]"));
        assert!(sample.contains("[model]"));
        assert!(sample.contains("[output]"));
        assert!(sample.contains("device = \"auto\""));
    }
}
