use std::time::Instant;

use futures::{stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower::{ServiceBuilder, ServiceExt};
use tracing::{debug, info, warn};

use super::progress::{Progress, ProgressTracker};
use crate::common::{ImageRecord, ImageSource};
use crate::error::AppError;
use crate::pipeline::ordering::{BatchOrderer, SortedBatch};
use crate::pipeline::services::image::{AnalysisRequest, ColorAnalysisService, PipelineConfig};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Fans a batch of files out to the analysis service and orders the results.
///
/// At most `max_concurrency` files are decoded at once. Failures stay on
/// their own record, and cancelling the token stops new files from starting
/// while keeping the ones that already finished.
pub struct ProcessingSupervisor {
    service: ColorAnalysisService,
    orderer: BatchOrderer,
    max_concurrency: usize,
    progress: ProgressTracker,
    cancel_token: CancellationToken,
}

impl ProcessingSupervisor {
    pub fn new(config: PipelineConfig, max_concurrency: usize) -> Result<Self, AppError> {
        if max_concurrency == 0 {
            return Err(AppError::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        let orderer = BatchOrderer::from_template(&config.filename_template);
        let service = ColorAnalysisService::new(config)?;

        Ok(Self {
            service,
            orderer,
            max_concurrency,
            progress: ProgressTracker::new(),
            cancel_token: CancellationToken::new(),
        })
    }

    /// Use an externally owned token, e.g. one shared with a signal handler.
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn orderer(&self) -> &BatchOrderer {
        &self.orderer
    }

    /// Analyze every source and return the ordered batch.
    ///
    /// Results are collected in completion order and put back into input
    /// order before sorting, so the outcome does not depend on scheduling.
    pub async fn process(&self, sources: Vec<ImageSource>) -> SortedBatch {
        let total = sources.len();
        self.progress.reset(total);
        info!(
            "Processing {} images, up to {} at a time",
            total, self.max_concurrency
        );
        let started = Instant::now();

        let requests = stream::iter(
            sources
                .into_iter()
                .enumerate()
                .map(|(position, source)| AnalysisRequest::new(position, source)),
        )
        .take_until(self.cancel_token.cancelled());

        let service = ServiceBuilder::new()
            .concurrency_limit(self.max_concurrency)
            .service(self.service.clone());
        let responses = service.call_all(requests).unordered();
        tokio::pin!(responses);

        let mut records: Vec<ImageRecord> = Vec::with_capacity(total);
        while let Some(result) = responses.next().await {
            let record = match result {
                Ok(record) => record,
                Err(never) => match never {},
            };
            let progress = self.progress.increment();
            debug!(
                "Finished {} ({}/{})",
                record.original_name(),
                progress.current,
                progress.total
            );
            records.push(record);
        }

        if self.cancel_token.is_cancelled() && records.len() < total {
            warn!(
                "Cancelled after {} of {} images; ordering the partial batch",
                records.len(),
                total
            );
        }

        let failed = records.iter().filter(|r| r.is_failed()).count();
        info!(
            "Analyzed {} images in {:?} ({} failed)",
            records.len(),
            started.elapsed(),
            failed
        );

        records.sort_by_key(ImageRecord::position);
        self.orderer.order(records)
    }
}
