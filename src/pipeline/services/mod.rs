pub mod image;

pub use image::{AnalysisRequest, ColorAnalysisService};
