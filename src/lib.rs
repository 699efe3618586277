pub mod common;
pub mod config;
pub mod error;
pub mod export;
pub mod intake;
pub mod pipeline;
pub mod report;

pub use common::{ImageRecord, ImageSource, PreviewHandle, RecordId};
pub use config::Configuration;
pub use error::AppError;
pub use pipeline::{
    AnalysisStrategy, BatchOrderer, ColorSignature, FilenameTemplate, PipelineConfig,
    ProcessingSupervisor, Progress, SortedBatch,
};
