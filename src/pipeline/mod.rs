pub mod color;
pub mod orchestration;
pub mod ordering;
pub mod services;

pub use orchestration::{Progress, ProgressTracker, ProcessingSupervisor};
pub use ordering::{BatchOrderer, FilenameTemplate, SortedBatch};
pub use services::image::{AnalysisStrategy, ColorSignature, PipelineConfig};
