use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::common::ImageRecord;
use crate::error::AppError;
use crate::pipeline::ordering::split_extension;

pub const DEFAULT_ZIP_NAME: &str = "HueSorted_Images.zip";

/// A renamed file ready to be written out.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

/// Map every successful, named record to an archive entry in display order.
pub fn archive_entries<'a>(
    records: impl IntoIterator<Item = &'a ImageRecord>,
) -> Result<Vec<ArchiveEntry>, AppError> {
    let entries: Vec<ArchiveEntry> = records
        .into_iter()
        .filter(|record| !record.is_failed())
        .filter_map(|record| {
            record.assigned_name().map(|name| ArchiveEntry {
                name: name.to_string(),
                bytes: Arc::clone(record.source().bytes()),
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(AppError::EmptyBatch);
    }
    Ok(entries)
}

/// Destination for exported entries.
#[async_trait]
pub trait ArchiveSink: Send {
    async fn write_entry(&mut self, entry: &ArchiveEntry) -> Result<(), AppError>;
}

/// Writes each entry as a file inside one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Entry names are flat; path separators would escape the output directory.
fn file_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[async_trait]
impl ArchiveSink for DirectorySink {
    async fn write_entry(&mut self, entry: &ArchiveEntry) -> Result<(), AppError> {
        let path = self.root.join(file_name(&entry.name));
        tokio::fs::write(&path, &entry.bytes[..]).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Collects entries into an in-memory zip archive.
///
/// Images are already compressed, so entries are stored as-is. A name that is
/// already taken gets a ` (2)`, ` (3)`, ... suffix before its extension.
pub struct ZipSink {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
}

impl ZipSink {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
        }
    }

    fn unique_name(&mut self, name: &str) -> String {
        let flat = file_name(name);
        if self.names.insert(flat.clone()) {
            return flat;
        }

        let (base, extension) = split_extension(&flat);
        let mut n = 2;
        loop {
            let candidate = format!("{} ({}){}", base, n, extension);
            if self.names.insert(candidate.clone()) {
                warn!("Duplicate archive name {}, stored as {}", flat, candidate);
                return candidate;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Close the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        Ok(self.writer.finish()?.into_inner())
    }

    pub async fn persist(self, path: &Path) -> Result<(), AppError> {
        let bytes = self.finish()?;
        tokio::fs::write(path, &bytes).await?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

impl Default for ZipSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveSink for ZipSink {
    async fn write_entry(&mut self, entry: &ArchiveEntry) -> Result<(), AppError> {
        let name = self.unique_name(&entry.name);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.writer.start_file(name.as_str(), options)?;
        self.writer.write_all(&entry.bytes)?;
        debug!("Added {} to archive", name);
        Ok(())
    }
}

/// Write every exportable record of a batch into `sink`, returning the count.
pub async fn export_records<'a, S>(
    records: impl IntoIterator<Item = &'a ImageRecord>,
    sink: &mut S,
) -> Result<usize, AppError>
where
    S: ArchiveSink + ?Sized,
{
    let entries = archive_entries(records)?;
    for entry in &entries {
        sink.write_entry(entry).await?;
    }
    info!("Exported {} files", entries.len());
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::{corrupt_source, solid_source};
    use crate::common::PreviewHandle;
    use crate::pipeline::ordering::BatchOrderer;
    use crate::pipeline::services::image::analysis::ColorSignature;
    use std::io::Read;
    use zip::ZipArchive;

    fn red() -> ColorSignature {
        ColorSignature {
            hue: Some(40.0),
            chroma: 1.0,
            lightness: 0.53,
            confidence: 1.0,
        }
    }

    #[test]
    fn batch_without_successes_is_empty() {
        let records = vec![ImageRecord::failed(
            0,
            corrupt_source("x.png"),
            PreviewHandle::new(),
            "bad",
        )];
        assert!(matches!(archive_entries(&records), Err(AppError::EmptyBatch)));
        assert!(matches!(
            archive_entries(std::iter::empty()),
            Err(AppError::EmptyBatch)
        ));
    }

    #[test]
    fn unnamed_records_are_skipped() {
        let source = solid_source("red.png", [255, 0, 0]);
        let unnamed = ImageRecord::analyzed(0, source.clone(), PreviewHandle::new(), red());
        let named = ImageRecord::analyzed(1, source, PreviewHandle::new(), red())
            .with_assigned_name("1_red.png");

        let entries = archive_entries([&unnamed, &named]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "1_red.png");
    }

    #[test]
    fn separators_are_flattened() {
        assert_eq!(file_name("../a/b\\c.png"), ".._a_b_c.png");
    }

    #[tokio::test]
    async fn directory_sink_writes_renamed_copies() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sorted");
        let batch = BatchOrderer::default().order(vec![
            ImageRecord::analyzed(
                0,
                solid_source("a.png", [0, 0, 255]),
                PreviewHandle::new(),
                ColorSignature { hue: Some(306.0), ..red() },
            ),
            ImageRecord::failed(1, corrupt_source("b.png"), PreviewHandle::new(), "bad"),
            ImageRecord::analyzed(2, solid_source("c.png", [255, 0, 0]), PreviewHandle::new(), red()),
        ]);

        let mut sink = DirectorySink::create(&out).await.unwrap();
        let written = export_records(&batch, &mut sink).await.unwrap();

        assert_eq!(written, 2);
        let first = tokio::fs::read(out.join("1_c.png")).await.unwrap();
        assert_eq!(&first[..], batch.records()[0].bytes());
        assert!(out.join("2_a.png").exists());
        assert!(!out.join("b.png").exists());
    }

    #[tokio::test]
    async fn zip_sink_stores_entries_in_display_order() {
        let batch = BatchOrderer::default().order(vec![
            ImageRecord::analyzed(
                0,
                solid_source("a.png", [0, 0, 255]),
                PreviewHandle::new(),
                ColorSignature { hue: Some(306.0), ..red() },
            ),
            ImageRecord::failed(1, corrupt_source("b.png"), PreviewHandle::new(), "bad"),
            ImageRecord::analyzed(2, solid_source("c.png", [255, 0, 0]), PreviewHandle::new(), red()),
        ]);

        let mut sink = ZipSink::new();
        assert_eq!(export_records(&batch, &mut sink).await.unwrap(), 2);
        let bytes = sink.finish().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["1_c.png", "2_a.png"]);

        let mut first = Vec::new();
        archive.by_index(0).unwrap().read_to_end(&mut first).unwrap();
        assert_eq!(&first[..], batch.records()[0].bytes());
    }

    #[tokio::test]
    async fn zip_sink_renames_clashing_entries() {
        let bytes: Arc<[u8]> = Arc::from(vec![1u8, 2, 3]);
        let mut sink = ZipSink::default();
        for name in ["gray.png", "gray.png", "dir/gray.png", "gray.png"] {
            let entry = ArchiveEntry {
                name: name.to_string(),
                bytes: Arc::clone(&bytes),
            };
            sink.write_entry(&entry).await.unwrap();
        }
        assert_eq!(sink.len(), 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_ZIP_NAME);
        sink.persist(&path).await.unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["dir_gray.png", "gray (2).png", "gray (3).png", "gray.png"]);
        let mut contents = Vec::new();
        archive
            .by_name("gray (3).png")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, vec![1, 2, 3]);
    }
}
