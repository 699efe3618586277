//! Turns paths on disk into the `ImageSource` list the pipeline consumes.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::common::{ImageSource, RecordId};
use crate::error::AppError;

/// Extensions picked up when scanning a directory.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "ico", "tga", "pnm",
];

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

async fn read_source(path: &Path) -> Result<ImageSource, AppError> {
    let metadata = tokio::fs::metadata(path).await?;
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ImageSource::new(bytes, name, modified))
}

/// Image files directly inside `dir`, sorted by name.
async fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read every input path into memory.
///
/// Files are taken as given; directories contribute their image files one
/// level deep. Duplicates by record identity are dropped, first one wins.
pub async fn load_sources(paths: &[PathBuf]) -> Result<Vec<ImageSource>, AppError> {
    let mut sources = Vec::new();
    for path in paths {
        if tokio::fs::metadata(path).await?.is_dir() {
            let files = scan_directory(path).await?;
            debug!("{} image files in {}", files.len(), path.display());
            for file in files {
                sources.push(read_source(&file).await?);
            }
        } else {
            sources.push(read_source(path).await?);
        }
    }

    let unique = dedupe(sources);
    info!("Loaded {} images", unique.len());
    Ok(unique)
}

pub fn dedupe(sources: Vec<ImageSource>) -> Vec<ImageSource> {
    let mut unique: IndexMap<RecordId, ImageSource> = IndexMap::with_capacity(sources.len());
    for source in sources {
        let id = source.id();
        if unique.contains_key(&id) {
            debug!("Skipping duplicate {}", id);
            continue;
        }
        unique.insert(id, source);
    }
    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::{fixed_time, solid_png};

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_image_extension(Path::new("a/B.JPG")));
        assert!(has_image_extension(Path::new("c.webp")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("png")));
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let first = ImageSource::new(vec![1u8, 2], "a.png", fixed_time());
        let again = ImageSource::new(vec![3u8, 4], "a.png", fixed_time());
        let other = ImageSource::new(vec![5u8], "b.png", fixed_time());

        let unique = dedupe(vec![first, other, again]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name(), "a.png");
        assert_eq!(&unique[0].bytes()[..], &[1, 2]);
        assert_eq!(unique[1].name(), "b.png");
    }

    #[tokio::test]
    async fn loads_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let photos = dir.path().join("photos");
        tokio::fs::create_dir(&photos).await.unwrap();
        tokio::fs::write(photos.join("b.png"), solid_png(2, 2, [0, 0, 255, 255]))
            .await
            .unwrap();
        tokio::fs::write(photos.join("a.PNG"), solid_png(2, 2, [255, 0, 0, 255]))
            .await
            .unwrap();
        tokio::fs::write(photos.join("readme.txt"), b"skip me").await.unwrap();
        tokio::fs::create_dir(photos.join("nested.png")).await.unwrap();

        let single = dir.path().join("single.jpg");
        tokio::fs::write(&single, b"not really a jpeg").await.unwrap();

        let sources = load_sources(&[photos.clone(), single.clone(), photos.join("b.png")])
            .await
            .unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a.PNG", "b.png", "single.jpg"]);
        assert_eq!(sources[2].size(), 17);
    }

    #[tokio::test]
    async fn missing_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_sources(&[dir.path().join("absent.png")]).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
