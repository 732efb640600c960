use crate::config::ModelConfig;
use crate::error::ImageError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;

/// Decodes an image file into 8-bit RGB, dropping alpha and expanding
/// grayscale.
pub fn load_rgb_image(path: &Path) -> Result<RgbImage, ImageError> {
    let image = image::open(path)?;
    Ok(image.to_rgb8())
}

/// Resize + scale + per-channel standardization matching the statistics the
/// pretrained weights were trained with.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImagePreprocessor {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            size: config.image_size,
            mean: config.mean,
            std: config.std,
        }
    }

    /// `(channels, height, width)` of the produced tensor.
    pub fn input_shape(&self) -> (usize, usize, usize) {
        (3, self.size as usize, self.size as usize)
    }

    /// Returns the image as a channel-major (CHW) buffer of normalized values.
    ///
    /// The image is stretched to a square, aspect ratio is not preserved.
    pub fn preprocess(&self, image: &RgbImage) -> Result<Vec<f32>, ImageError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ImageError::Transform(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let resized = imageops::resize(image, self.size, self.size, FilterType::Triangle);

        let plane = (self.size as usize) * (self.size as usize);
        let mut data = vec![0f32; 3 * plane];

        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                let value = pixel.0[c] as f32 / 255.0;
                data[c * plane + i] = (value - self.mean[c]) / self.std[c];
            }
        }

        Ok(data)
    }
}
