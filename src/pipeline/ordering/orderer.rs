use tracing::{debug, info};

use super::template::FilenameTemplate;
use crate::common::ImageRecord;
use crate::error::AppError;

/// Sorts analyzed records by hue and names them from a template.
#[derive(Debug, Clone, Default)]
pub struct BatchOrderer {
    template: FilenameTemplate,
}

impl BatchOrderer {
    pub fn new(template: FilenameTemplate) -> Self {
        Self { template }
    }

    pub fn from_template(template: &str) -> Self {
        Self::new(FilenameTemplate::parse(template))
    }

    pub fn template(&self) -> &FilenameTemplate {
        &self.template
    }

    /// Order a batch: hue ascending, then chroma and lightness descending.
    ///
    /// Chromatic records are named from the template by their 1-based
    /// position, neutral records follow under their original file name, and
    /// failed records are appended last in input order without a name.
    pub fn order(&self, records: Vec<ImageRecord>) -> SortedBatch {
        let (mut signed, mut failed): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|record| !record.is_failed());

        signed.sort_by(|a, b| match (a.signature(), b.signature()) {
            (Some(a), Some(b)) => a.sort_cmp(b),
            _ => std::cmp::Ordering::Equal,
        });
        failed.sort_by_key(ImageRecord::position);

        let mut chromatic = 0;
        let mut neutral = 0;
        let mut ordered: Vec<ImageRecord> = signed
            .into_iter()
            .map(|record| match record.signature().and_then(|s| s.hue) {
                Some(hue) => {
                    chromatic += 1;
                    let name = self
                        .template
                        .render(chromatic, Some(hue), record.original_name());
                    record.with_assigned_name(name)
                }
                None => {
                    neutral += 1;
                    let name = record.original_name().to_string();
                    record.with_assigned_name(name)
                }
            })
            .collect();

        info!(
            "Ordered {} images: {} chromatic, {} neutral, {} failed",
            ordered.len() + failed.len(),
            chromatic,
            neutral,
            failed.len()
        );

        ordered.extend(failed);
        SortedBatch { records: ordered }
    }
}

/// A batch in display order.
#[derive(Debug, Clone, Default)]
pub struct SortedBatch {
    records: Vec<ImageRecord>,
}

impl SortedBatch {
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRecord> {
        self.records.iter()
    }

    /// Move the record at `from` to `to`, shifting the ones in between.
    ///
    /// A real move renames every successful record to `{index}_{basename}`
    /// by its new position; signatures are left as they are.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), AppError> {
        let len = self.records.len();
        for index in [from, to] {
            if index >= len {
                return Err(AppError::ReorderOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let moved = self.records.remove(from);
        self.records.insert(to, moved);
        debug!("Moved record {} to {}", from, to);

        let template = FilenameTemplate::default();
        let mut index = 0;
        self.records = std::mem::take(&mut self.records)
            .into_iter()
            .map(|record| {
                if record.is_failed() {
                    return record;
                }
                index += 1;
                let name = template.render(index, None, record.original_name());
                record.with_assigned_name(name)
            })
            .collect();

        Ok(())
    }
}

impl IntoIterator for SortedBatch {
    type Item = ImageRecord;
    type IntoIter = std::vec::IntoIter<ImageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a SortedBatch {
    type Item = &'a ImageRecord;
    type IntoIter = std::slice::Iter<'a, ImageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
