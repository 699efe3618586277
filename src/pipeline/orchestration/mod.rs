pub mod progress;
pub mod supervisor;

pub use progress::{Progress, ProgressTracker};
pub use supervisor::{ProcessingSupervisor, DEFAULT_MAX_CONCURRENCY};
