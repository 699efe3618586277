use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::pipeline::services::image::analysis::ColorSignature;

/// Identity of a file within a batch, derived from name, size and modification time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(name: &str, size: u64, modified: DateTime<Utc>) -> Self {
        Self(format!("{}-{}-{}", name, size, modified.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synthetic handle a UI layer can use to key thumbnails for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PreviewHandle(Uuid);

impl PreviewHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PreviewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview-{}", self.0)
    }
}

/// A file handed to the pipeline by the file-selection surface.
#[derive(Clone)]
pub struct ImageSource {
    bytes: Arc<[u8]>,
    name: String,
    size: u64,
    modified: DateTime<Utc>,
}

impl ImageSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>, name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        let bytes = bytes.into();
        Self {
            size: bytes.len() as u64,
            bytes,
            name: name.into(),
            modified,
        }
    }

    pub fn id(&self) -> RecordId {
        RecordId::new(&self.name, self.size, self.modified)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("modified", &self.modified)
            .finish()
    }
}

/// One image moving through the pipeline.
///
/// A record carries either a signature or an error. Once a record has been
/// handed out it is only ever replaced whole, never edited in place.
#[derive(Clone)]
pub struct ImageRecord {
    id: RecordId,
    position: usize,
    preview: PreviewHandle,
    source: ImageSource,
    signature: Option<ColorSignature>,
    assigned_name: Option<String>,
    error: Option<String>,
}

impl ImageRecord {
    pub fn analyzed(
        position: usize,
        source: ImageSource,
        preview: PreviewHandle,
        signature: ColorSignature,
    ) -> Self {
        Self {
            id: source.id(),
            position,
            preview,
            source,
            signature: Some(signature),
            assigned_name: None,
            error: None,
        }
    }

    pub fn failed(
        position: usize,
        source: ImageSource,
        preview: PreviewHandle,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: source.id(),
            position,
            preview,
            source,
            signature: None,
            assigned_name: None,
            error: Some(error.into()),
        }
    }

    pub fn with_assigned_name(self, assigned_name: impl Into<String>) -> Self {
        Self {
            assigned_name: Some(assigned_name.into()),
            ..self
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn preview(&self) -> PreviewHandle {
        self.preview
    }

    pub fn original_name(&self) -> &str {
        self.source.name()
    }

    pub fn bytes(&self) -> &[u8] {
        self.source.bytes()
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn signature(&self) -> Option<&ColorSignature> {
        self.signature.as_ref()
    }

    pub fn assigned_name(&self) -> Option<&str> {
        self.assigned_name.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.signature.is_none()
    }
}

impl fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRecord")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("signature", &self.signature)
            .field("assigned_name", &self.assigned_name)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(name: &str, bytes: &[u8]) -> ImageSource {
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ImageSource::new(bytes.to_vec(), name, modified)
    }

    #[test]
    fn record_id_combines_name_size_and_mtime() {
        let src = source("photo.jpg", &[1, 2, 3]);
        assert_eq!(src.id().as_str(), "photo.jpg-3-1714564800000");
    }

    #[test]
    fn identical_files_collide_on_identity() {
        assert_eq!(source("a.png", &[9; 4]).id(), source("a.png", &[7; 4]).id());
        assert_ne!(source("a.png", &[9; 4]).id(), source("a.png", &[9; 5]).id());
    }

    #[test]
    fn failed_record_has_no_signature() {
        let record = ImageRecord::failed(3, source("x.gif", &[0]), PreviewHandle::new(), "boom");
        assert!(record.is_failed());
        assert_eq!(record.error(), Some("boom"));
        assert_eq!(record.position(), 3);
        assert!(record.assigned_name().is_none());
    }

    #[test]
    fn assigning_a_name_keeps_the_same_bytes() {
        let record = ImageRecord::failed(0, source("x.gif", &[4, 5]), PreviewHandle::new(), "e");
        let bytes_before = Arc::clone(record.source().bytes());
        let renamed = record.with_assigned_name("1_x.gif");
        assert_eq!(renamed.assigned_name(), Some("1_x.gif"));
        assert!(Arc::ptr_eq(&bytes_before, renamed.source().bytes()));
    }
}
