pub mod orderer;
pub mod template;

pub use orderer::{BatchOrderer, SortedBatch};
pub use template::{split_extension, FilenameTemplate, DEFAULT_TEMPLATE};
