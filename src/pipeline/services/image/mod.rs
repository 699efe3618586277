pub mod analysis;
pub mod color_analysis_service;
pub mod sampler;

pub use analysis::{AnalysisStrategy, ColorSignature, DominantColorExtractor, PipelineConfig};
pub use color_analysis_service::{AnalysisRequest, ColorAnalysisService};
pub use sampler::{PixelBuffer, PixelSampler, SamplingConfig};
