use tracing::debug;

use super::config::{AnalysisStrategy, PipelineConfig};
use super::core::ColorSignature;
use super::{histogram, kmeans, perceptual};
use crate::error::AppError;
use crate::pipeline::services::image::sampler::PixelBuffer;

/// Reduces a sampled image to a single [`ColorSignature`] using the
/// configured strategy. Extraction itself never fails; invalid parameters are
/// rejected once, at construction.
#[derive(Debug, Clone)]
pub struct DominantColorExtractor {
    config: PipelineConfig,
}

impl DominantColorExtractor {
    pub fn new(config: PipelineConfig) -> Result<Self, AppError> {
        config.validate()?;
        debug!(
            "Dominant color extractor using {} ({} hue bins, min chroma {})",
            config.strategy.name(),
            config.hue_bins,
            config.min_chroma
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn extract(&self, pixels: &PixelBuffer) -> ColorSignature {
        dispatch(pixels, &self.config)
    }
}

/// One-off extraction with an unchecked config.
pub fn extract(pixels: &PixelBuffer, config: &PipelineConfig) -> Result<ColorSignature, AppError> {
    config.validate()?;
    Ok(dispatch(pixels, config))
}

fn dispatch(pixels: &PixelBuffer, config: &PipelineConfig) -> ColorSignature {
    match &config.strategy {
        AnalysisStrategy::HistogramMath(_) => {
            histogram::analyze(pixels, config.min_chroma, config.hue_bins)
        }
        AnalysisStrategy::PerceptualWeighted(params) => {
            perceptual::analyze(pixels, params, config.hue_bins)
        }
        AnalysisStrategy::ClusterKMeans(params) => {
            kmeans::analyze(pixels, params, config.min_chroma)
        }
    }
}
