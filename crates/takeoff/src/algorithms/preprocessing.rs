use image::GrayImage;
use crate::{error::{Result, TakeoffError}, traits::ImagePreprocessor};

/// Binarizes a decoded mask: pixels strictly above `threshold` become 255, the rest 0.
#[derive(Debug, Clone)]
pub struct ThresholdPreprocessor {
    pub threshold: u8,
}

impl ThresholdPreprocessor {
    /// Cut-off given as a mask probability in `[0, 1]`, as segmentation models report it.
    pub fn from_probability(probability: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(TakeoffError::InvalidThreshold(probability as f64));
        }
        Ok(Self { threshold: (probability * 255.0).round() as u8 })
    }
}

impl Default for ThresholdPreprocessor {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl ImagePreprocessor for ThresholdPreprocessor {
    fn preprocess(&self, mask: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::contrast::threshold(mask, self.threshold))
    }
}

/// Smooths soft-edged probability masks before thresholding so ragged
/// borders do not trace into sawtooth contours.
#[derive(Debug, Clone)]
pub struct GaussianBlurPreprocessor {
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

impl ImagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, mask: &GrayImage) -> Result<GrayImage> {
        // imageproc asserts on a non-positive sigma
        if !(self.sigma > 0.0) {
            return Ok(mask.clone());
        }
        Ok(imageproc::filter::gaussian_blur_f32(mask, self.sigma))
    }
}
