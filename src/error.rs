use thiserror::Error;

// Main application error type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Image could not be decoded: {0}")]
    Decode(String),
    #[error("Could not allocate a {width}x{height} sampling surface")]
    UnsupportedContext { width: u32, height: u32 },
    #[error("There are no successfully processed images to export")]
    EmptyBatch,
    #[error("Reorder index {index} is out of range for a batch of {len}")]
    ReorderOutOfRange { index: usize, len: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
    #[error("Failed to write zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Failed to build animation: {0}")]
    Animation(#[source] image::ImageError),
}

impl AppError {
    /// Failures that are recovered at the record level instead of aborting a batch.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            AppError::Decode(_) | AppError::UnsupportedContext { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_and_context_errors_are_per_image() {
        assert!(AppError::Decode("bad header".to_string()).is_per_image());
        assert!(AppError::UnsupportedContext {
            width: 0,
            height: 10
        }
        .is_per_image());
        assert!(!AppError::EmptyBatch.is_per_image());
    }

    #[test]
    fn empty_batch_message_is_user_facing() {
        assert_eq!(
            AppError::EmptyBatch.to_string(),
            "There are no successfully processed images to export"
        );
    }
}
