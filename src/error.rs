use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectroFeatError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write feature table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to load {model} weights from {path}: {message}")]
    ModelLoad {
        model: String,
        path: String,
        message: String,
    },

    #[error("Compute device unavailable: {message}")]
    Device { message: String },

    #[error("Cannot parse class label from folder name: {folder}")]
    InvalidClassFolder { folder: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

/// Failure while turning a single image into a feature vector.
///
/// These never abort a modality pass: the walker records them and moves on
/// to the next file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ImageError {
    pub fn stage(&self) -> &'static str {
        match self {
            ImageError::Decode(_) => "decode",
            ImageError::Transform(_) => "transform",
            ImageError::Inference(_) => "inference",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ImageError::Decode(m) | ImageError::Transform(m) | ImageError::Inference(m) => m,
        }
    }
}

impl From<image::ImageError> for ImageError {
    fn from(error: image::ImageError) -> Self {
        ImageError::Decode(error.to_string())
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for SpectroFeatError {
    fn user_message(&self) -> String {
        match self {
            SpectroFeatError::ModelLoad { model, path, message } => {
                format!("Could not load {} weights from {}: {}", model, path, message)
            }
            SpectroFeatError::Device { message } => {
                format!("Compute device unavailable: {}", message)
            }
            SpectroFeatError::InvalidClassFolder { folder } => {
                format!(
                    "Folder '{}' does not carry a class digit after its marker character",
                    folder
                )
            }
            SpectroFeatError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            SpectroFeatError::InvalidPath { path } => {
                format!("Invalid input path: {}", path)
            }
            SpectroFeatError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            SpectroFeatError::ModelLoad { .. } => Some(
                "Point --weights (or model.weights) at torchvision's ImageNet ResNet-18 in safetensors form, e.g. resnet18.safetensors from https://huggingface.co/lmz/candle-resnet.".to_string()
            ),
            SpectroFeatError::Device { .. } => Some(
                "Use --device cpu, or rebuild with the `cuda` feature on a machine with an NVIDIA GPU.".to_string()
            ),
            SpectroFeatError::InvalidClassFolder { .. } => Some(
                "Rename class folders like C0_name, C1_name, or set dataset.skip_malformed_folders = true.".to_string()
            ),
            SpectroFeatError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            SpectroFeatError::InvalidPath { .. } => Some(
                "Check --spectrogram-dir and --modalities; each modality must be a directory under the spectrogram root.".to_string()
            ),
            SpectroFeatError::Csv(_) | SpectroFeatError::Io(_) => Some(
                "Ensure you have the necessary read/write permissions for the input and output directories.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for SpectroFeatError {
    fn from(error: toml::de::Error) -> Self {
        SpectroFeatError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectroFeatError>;
