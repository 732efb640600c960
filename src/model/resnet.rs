use crate::config::ModelConfig;
use crate::error::{ImageError, Result, SpectroFeatError};
use crate::model::device::ComputeDevice;
use crate::model::preprocess::ImagePreprocessor;
use crate::model::{FeatureExtractor, FeatureVector};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Func, VarBuilder};
use candle_transformers::models::resnet;
use image::RgbImage;

/// Width of the pooled ResNet-18 embedding (input width of the dropped `fc`).
pub const RESNET18_FEATURE_DIM: usize = 512;

/// ResNet-18 used as a frozen embedding producer.
///
/// The network is built without its final linear layer, so a forward pass
/// returns the 512-D global-average-pooled activations instead of class
/// scores. Batch norm always runs on its stored statistics and no gradient
/// graph is kept, so the model is in inference mode for its whole lifetime.
pub struct ResNetExtractor {
    network: Func<'static>,
    device: Device,
    compute_device: ComputeDevice,
    preprocessor: ImagePreprocessor,
    name: String,
}

impl ResNetExtractor {
    /// Loads torchvision-layout ResNet-18 weights from a safetensors file.
    pub fn load(config: &ModelConfig, compute_device: ComputeDevice) -> Result<Self> {
        let weights = &config.weights;

        if !weights.is_file() {
            return Err(SpectroFeatError::ModelLoad {
                model: config.architecture.clone(),
                path: weights.display().to_string(),
                message: "weights file not found".to_string(),
            });
        }

        let device = compute_device.to_candle()?;

        // SAFETY: the weights file is only read, and must not be modified
        // while it is mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device).map_err(|e| {
                SpectroFeatError::ModelLoad {
                    model: config.architecture.clone(),
                    path: weights.display().to_string(),
                    message: e.to_string(),
                }
            })?
        };

        let extractor = Self::from_var_builder(vb, config, compute_device)?;

        tracing::info!(
            model = %extractor.name,
            device = %compute_device,
            weights = %weights.display(),
            "feature extractor ready"
        );

        Ok(extractor)
    }

    /// Builds the headless network from an already prepared variable source.
    pub fn from_var_builder(
        vb: VarBuilder<'static>,
        config: &ModelConfig,
        compute_device: ComputeDevice,
    ) -> Result<Self> {
        let device = vb.device().clone();

        let network =
            resnet::resnet18_no_final_layer(vb).map_err(|e| SpectroFeatError::ModelLoad {
                model: config.architecture.clone(),
                path: config.weights.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            network,
            device,
            compute_device,
            preprocessor: ImagePreprocessor::new(config),
            name: config.architecture.clone(),
        })
    }

    pub fn compute_device(&self) -> ComputeDevice {
        self.compute_device
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Vec<f32>> {
        let output = self.network.forward(input)?;
        // (1, D) on the compute device -> (D) in host memory
        output.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()
    }
}

impl FeatureExtractor for ResNetExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        RESNET18_FEATURE_DIM
    }

    fn device(&self) -> ComputeDevice {
        self.compute_device
    }

    fn extract(&self, image: &RgbImage) -> std::result::Result<FeatureVector, ImageError> {
        let pixels = self.preprocessor.preprocess(image)?;
        let (channels, height, width) = self.preprocessor.input_shape();

        let input = Tensor::from_vec(pixels, (1, channels, height, width), &self.device)
            .map_err(|e| ImageError::Transform(e.to_string()))?;

        let features = self
            .forward(&input)
            .map_err(|e| ImageError::Inference(e.to_string()))?;

        if features.len() != self.dimension() {
            return Err(ImageError::Inference(format!(
                "expected {} features, network produced {}",
                self.dimension(),
                features.len()
            )));
        }

        Ok(features)
    }
}
