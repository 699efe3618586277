//! Batch summaries for display surfaces: hue histogram, swatches and a JSON report.
use serde::Serialize;

use crate::common::{ImageRecord, PreviewHandle, RecordId};
use crate::error::AppError;
use crate::pipeline::color::{lab_to_rgb, lch_to_lab, Lch};
use crate::pipeline::orchestration::Progress;
use crate::pipeline::ordering::SortedBatch;
use crate::pipeline::services::image::analysis::ColorSignature;

pub const HISTOGRAM_BUCKETS: usize = 24;
pub const BUCKET_DEGREES: f64 = 360.0 / HISTOGRAM_BUCKETS as f64;

/// Count of chromatic signatures per 15 degree hue bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HueHistogram {
    buckets: [usize; HISTOGRAM_BUCKETS],
}

impl HueHistogram {
    pub fn from_signatures<'a>(signatures: impl IntoIterator<Item = &'a ColorSignature>) -> Self {
        let mut buckets = [0; HISTOGRAM_BUCKETS];
        for hue in signatures.into_iter().filter_map(|s| s.hue) {
            let bucket = ((hue / BUCKET_DEGREES).floor() as usize).min(HISTOGRAM_BUCKETS - 1);
            buckets[bucket] += 1;
        }
        Self { buckets }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ImageRecord>) -> Self {
        Self::from_signatures(records.into_iter().filter_map(ImageRecord::signature))
    }

    pub fn buckets(&self) -> &[usize; HISTOGRAM_BUCKETS] {
        &self.buckets
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().sum()
    }

    /// The fullest bucket, as `(start_degree, count)`; `None` when empty.
    pub fn peak(&self) -> Option<(f64, usize)> {
        let (index, count) = self
            .buckets
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
        (count > 0).then_some((index as f64 * BUCKET_DEGREES, count))
    }
}

/// Display color for a signature as `#rrggbb`.
pub fn swatch_hex(signature: &ColorSignature) -> String {
    let lch = Lch {
        l: signature.lightness * 100.0,
        c: signature.chroma * 100.0,
        h: signature.hue.unwrap_or(0.0),
    };
    let [r, g, b] = lab_to_rgb(lch_to_lab(lch));
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub id: RecordId,
    pub position: usize,
    pub preview: PreviewHandle,
    pub original_name: String,
    pub assigned_name: Option<String>,
    pub signature: Option<ColorSignature>,
    pub swatch: Option<String>,
    pub error: Option<String>,
}

impl From<&ImageRecord> for RecordReport {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id().clone(),
            position: record.position(),
            preview: record.preview(),
            original_name: record.original_name().to_string(),
            assigned_name: record.assigned_name().map(str::to_string),
            signature: record.signature().copied(),
            swatch: record.signature().map(swatch_hex),
            error: record.error().map(str::to_string),
        }
    }
}

/// Everything a front end needs to draw a processed batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub strategy: String,
    pub progress: Progress,
    pub histogram: HueHistogram,
    pub records: Vec<RecordReport>,
}

impl BatchReport {
    pub fn new(strategy: &str, batch: &SortedBatch, progress: Progress) -> Self {
        Self {
            strategy: strategy.to_string(),
            progress,
            histogram: HueHistogram::from_records(batch),
            records: batch.iter().map(RecordReport::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
