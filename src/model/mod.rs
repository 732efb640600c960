//! Pretrained-network feature extraction.
//!
//! A [`FeatureExtractor`] turns one decoded RGB image into a fixed-length
//! embedding. The production implementation is [`ResNetExtractor`], a
//! ResNet-18 whose classification head has been dropped so the forward pass
//! ends at global average pooling.

pub mod device;
pub mod preprocess;
pub mod resnet;

pub use device::ComputeDevice;
pub use preprocess::{load_rgb_image, ImagePreprocessor};
pub use resnet::{ResNetExtractor, RESNET18_FEATURE_DIM};

use crate::error::ImageError;
use image::RgbImage;

/// Embedding produced for exactly one image.
pub type FeatureVector = Vec<f32>;

pub trait FeatureExtractor {
    /// Short architecture name used in logs and reports, e.g. `resnet18`.
    fn name(&self) -> &str;

    /// Length of every vector returned by [`FeatureExtractor::extract`].
    fn dimension(&self) -> usize;

    fn extract(&self, image: &RgbImage) -> Result<FeatureVector, ImageError>;

    /// Where the forward pass runs.
    fn device(&self) -> ComputeDevice {
        ComputeDevice::HostProcessor
    }
}
