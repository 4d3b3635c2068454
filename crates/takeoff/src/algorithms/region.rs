use crate::{
    algorithms::{normalize_prediction, point_in_rect},
    config::RegionConfig,
    detector::RawPrediction,
    error::{Result, TakeoffError},
    types::{Detection, DetectionSource, Region},
};

/// Selects predictions whose center falls inside a user-drawn region.
#[derive(Debug, Clone, Default)]
pub struct RegionFilter {
    config: RegionConfig,
}

impl RegionFilter {
    pub fn new(config: RegionConfig) -> Self {
        Self { config }
    }

    /// Reject selections below the minimum size instead of clamping them
    pub fn validate(&self, region: &Region) -> Result<()> {
        let too_small = region.width.is_nan()
            || region.height.is_nan()
            || region.width < self.config.min_width
            || region.height < self.config.min_height;

        if too_small {
            return Err(TakeoffError::RegionTooSmall {
                width: region.width,
                height: region.height,
                min_width: self.config.min_width,
                min_height: self.config.min_height,
            });
        }
        Ok(())
    }

    /// Filter raw predictions by confidence and region membership.
    ///
    /// A prediction passes when `confidence >= threshold` and its rounded
    /// center point lies inside the region (edges inclusive). Partially overlapping boxes
    /// whose center is outside are dropped. Every output gets a fresh
    /// `region-` id.
    pub fn filter(
        &self,
        predictions: &[RawPrediction],
        region: &Region,
        confidence_threshold: f64,
    ) -> Result<Vec<Detection>> {
        self.validate(region)?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(TakeoffError::InvalidThreshold(confidence_threshold));
        }

        let detections: Vec<Detection> = predictions
            .iter()
            .filter(|prediction| prediction.confidence >= confidence_threshold)
            .map(|prediction| normalize_prediction(prediction, DetectionSource::Region))
            .filter(|detection| point_in_rect(detection.center(), region))
            .collect();

        tracing::debug!(
            input = predictions.len(),
            kept = detections.len(),
            threshold = confidence_threshold,
            "filtered predictions by region"
        );
        Ok(detections)
    }
}

/// Region filter with the default 50x50 minimum selection size.
pub fn filter_by_region(
    predictions: &[RawPrediction],
    region: &Region,
    confidence_threshold: f64,
) -> Result<Vec<Detection>> {
    RegionFilter::default().filter(predictions, region, confidence_threshold)
}
