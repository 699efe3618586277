use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::pipeline::services::image::sampler::SamplingConfig;

/// Configuration for color analysis with tunable parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: AnalysisStrategy,
    pub filename_template: String,
    /// Minimum LCh chroma for a pixel to count as colored
    pub min_chroma: f64,
    /// Number of equal-width hue bins around the color wheel
    pub hue_bins: usize,
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisStrategy {
    HistogramMath(HistogramParams),
    PerceptualWeighted(PerceptualParams),
    #[serde(rename = "cluster_kmeans")]
    ClusterKMeans(KMeansParams),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptualParams {
    /// Chroma at which the neutrality mask starts to rise from 0
    pub mask_low: f64,
    /// Chroma at which the neutrality mask reaches 1
    pub mask_high: f64,
    /// Pixels whose mask falls below this count as neutral
    pub mask_floor: f64,
    /// Variance of the center falloff, in normalized [-1, 1] coordinates
    pub center_sigma_sq: f64,
    /// Share of neutral pixels above which the image is classified neutral
    pub neutral_ratio: f64,
    /// Weight share the dominant bin needs for a pop-color override
    pub pop_share: f64,
    /// Average chroma the dominant bin needs for a pop-color override
    pub pop_chroma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    pub k: usize,
    pub iterations: usize,
    /// Fixed seed for reproducible clustering; `None` seeds from the OS
    pub seed: Option<u64>,
    pub output_space: OutputSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpace {
    /// Perceptual: hue angle, chroma and lightness from CIE LCh
    Lch,
    /// Fast: hue, saturation and value from HSV
    Hsv,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: AnalysisStrategy::default(),
            filename_template: "{index}_{basename}".to_string(),
            min_chroma: 8.0,
            hue_bins: 18,
            sampling: SamplingConfig::default(),
        }
    }
}

impl Default for AnalysisStrategy {
    fn default() -> Self {
        AnalysisStrategy::HistogramMath(HistogramParams::default())
    }
}

impl Default for PerceptualParams {
    fn default() -> Self {
        Self {
            mask_low: 7.0,
            mask_high: 15.0,
            mask_floor: 0.1,
            center_sigma_sq: 0.5,
            neutral_ratio: 0.8,
            pop_share: 0.12,
            pop_chroma: 28.0,
        }
    }
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 5,
            iterations: 10,
            seed: None,
            output_space: OutputSpace::Lch,
        }
    }
}

impl AnalysisStrategy {
    pub fn perceptual() -> Self {
        AnalysisStrategy::PerceptualWeighted(PerceptualParams::default())
    }

    pub fn kmeans(seed: Option<u64>) -> Self {
        AnalysisStrategy::ClusterKMeans(KMeansParams {
            seed,
            ..KMeansParams::default()
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisStrategy::HistogramMath(_) => "histogram_math",
            AnalysisStrategy::PerceptualWeighted(_) => "perceptual_weighted",
            AnalysisStrategy::ClusterKMeans(_) => "cluster_kmeans",
        }
    }
}

impl PipelineConfig {
    pub fn with_strategy(mut self, strategy: AnalysisStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.filename_template = template.into();
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: &str| Err(AppError::InvalidConfig(msg.to_string()));

        if self.hue_bins == 0 || self.hue_bins > 360 {
            return invalid("hue_bins must be between 1 and 360");
        }
        if !(self.min_chroma >= 0.0) {
            return invalid("min_chroma must be a non-negative number");
        }
        if self.sampling.max_dimension == 0 {
            return invalid("sampling.max_dimension must be greater than 0");
        }

        match &self.strategy {
            AnalysisStrategy::HistogramMath(_) => {}
            AnalysisStrategy::PerceptualWeighted(p) => {
                if !(p.mask_high > p.mask_low) {
                    return invalid("mask_high must be greater than mask_low");
                }
                if !(p.center_sigma_sq > 0.0) {
                    return invalid("center_sigma_sq must be greater than 0");
                }
                for (value, name) in [
                    (p.mask_floor, "mask_floor"),
                    (p.neutral_ratio, "neutral_ratio"),
                    (p.pop_share, "pop_share"),
                ] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(AppError::InvalidConfig(format!(
                            "{} must be between 0.0 and 1.0",
                            name
                        )));
                    }
                }
            }
            AnalysisStrategy::ClusterKMeans(p) => {
                if p.k == 0 {
                    return invalid("k must be greater than 0");
                }
                if p.iterations == 0 {
                    return invalid("iterations must be greater than 0");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(PipelineConfig::default()
            .with_strategy(AnalysisStrategy::perceptual())
            .validate()
            .is_ok());
        assert!(PipelineConfig::default()
            .with_strategy(AnalysisStrategy::kmeans(Some(7)))
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_zero_bins_and_clusters() {
        let config = PipelineConfig {
            hue_bins: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::InvalidConfig(_))));

        let config = PipelineConfig::default().with_strategy(AnalysisStrategy::ClusterKMeans(
            KMeansParams {
                k: 0,
                ..KMeansParams::default()
            },
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_mask_ramp() {
        let config = PipelineConfig::default().with_strategy(AnalysisStrategy::PerceptualWeighted(
            PerceptualParams {
                mask_low: 15.0,
                mask_high: 7.0,
                ..PerceptualParams::default()
            },
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn strategy_deserializes_from_tagged_map() {
        let strategy: AnalysisStrategy =
            serde_json::from_str(r#"{"kind":"cluster_kmeans","k":3,"seed":42}"#).unwrap();
        assert_eq!(
            strategy,
            AnalysisStrategy::ClusterKMeans(KMeansParams {
                k: 3,
                seed: Some(42),
                ..KMeansParams::default()
            })
        );

        let strategy: AnalysisStrategy =
            serde_json::from_str(r#"{"kind":"perceptual_weighted"}"#).unwrap();
        assert_eq!(strategy, AnalysisStrategy::perceptual());
    }

    #[test]
    fn serialized_kind_matches_strategy_name() {
        for strategy in [
            AnalysisStrategy::default(),
            AnalysisStrategy::perceptual(),
            AnalysisStrategy::kmeans(Some(1)),
        ] {
            let value = serde_json::to_value(&strategy).unwrap();
            assert_eq!(value["kind"], strategy.name());
            let back: AnalysisStrategy = serde_json::from_value(value).unwrap();
            assert_eq!(back, strategy);
        }
    }
}
