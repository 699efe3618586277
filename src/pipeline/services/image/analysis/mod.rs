pub mod config;
pub mod core;
pub mod extractor;
pub mod histogram;
pub mod kmeans;
pub mod perceptual;

pub use config::{
    AnalysisStrategy, HistogramParams, KMeansParams, OutputSpace, PerceptualParams, PipelineConfig,
};
pub use core::{ColorSignature, NEUTRAL_HUE};
pub use extractor::{extract, DominantColorExtractor};
