pub mod record;

#[cfg(test)]
pub mod fixtures;

pub use record::{ImageRecord, ImageSource, PreviewHandle, RecordId};
