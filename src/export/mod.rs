pub mod animation;
pub mod archive;

pub use animation::{build_animation, AnimationSettings};
pub use archive::{
    archive_entries, export_records, ArchiveEntry, ArchiveSink, DirectorySink,
    ZipSink, DEFAULT_ZIP_NAME,
};
