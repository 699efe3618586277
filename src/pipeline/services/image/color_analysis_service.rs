use std::{
    convert::Infallible,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};

use tower::Service;
use tracing::{debug, error, warn};

use super::analysis::{ColorSignature, DominantColorExtractor, PipelineConfig};
use super::sampler::PixelSampler;
use crate::common::{ImageRecord, ImageSource, PreviewHandle};
use crate::error::AppError;

/// One file to analyze, tagged with its place in the input order.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub position: usize,
    pub source: ImageSource,
}

impl AnalysisRequest {
    pub fn new(position: usize, source: ImageSource) -> Self {
        Self { position, source }
    }
}

/// Runs sampling and extraction for one file on the blocking pool.
///
/// Per-file failures, including a panicking worker, come back as failed
/// records, so the service itself never errors.
#[derive(Debug, Clone)]
pub struct ColorAnalysisService {
    sampler: Arc<PixelSampler>,
    extractor: Arc<DominantColorExtractor>,
}

impl ColorAnalysisService {
    pub fn new(config: PipelineConfig) -> Result<Self, AppError> {
        let sampler = PixelSampler::new(config.sampling.clone());
        let extractor = DominantColorExtractor::new(config)?;
        Ok(Self {
            sampler: Arc::new(sampler),
            extractor: Arc::new(extractor),
        })
    }

    /// Synchronous sample + extract, for callers already off the async runtime.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<ColorSignature, AppError> {
        analyze_bytes(&self.sampler, &self.extractor, bytes)
    }
}

fn analyze_bytes(
    sampler: &PixelSampler,
    extractor: &DominantColorExtractor,
    bytes: &[u8],
) -> Result<ColorSignature, AppError> {
    let pixels = sampler.sample(bytes)?;
    Ok(extractor.extract(&pixels))
}

impl Service<AnalysisRequest> for ColorAnalysisService {
    type Response = ImageRecord;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: AnalysisRequest) -> Self::Future {
        let sampler = Arc::clone(&self.sampler);
        let extractor = Arc::clone(&self.extractor);

        Box::pin(async move {
            let AnalysisRequest { position, source } = request;
            let preview = PreviewHandle::new();
            let started = Instant::now();

            let bytes = Arc::clone(source.bytes());
            let outcome =
                tokio::task::spawn_blocking(move || analyze_bytes(&sampler, &extractor, &bytes))
                    .await;

            let record = match outcome {
                Ok(Ok(signature)) => {
                    debug!(
                        "Analyzed {} in {:?}: hue {:?}, chroma {:.2}, confidence {:.2}",
                        source.name(),
                        started.elapsed(),
                        signature.hue,
                        signature.chroma,
                        signature.confidence
                    );
                    ImageRecord::analyzed(position, source, preview, signature)
                }
                Ok(Err(e)) => {
                    warn!("Skipping {}: {}", source.name(), e);
                    ImageRecord::failed(position, source, preview, e.to_string())
                }
                Err(join_error) => {
                    error!("Analysis worker for {} failed: {}", source.name(), join_error);
                    ImageRecord::failed(
                        position,
                        source,
                        preview,
                        format!("Analysis worker failed: {}", join_error),
                    )
                }
            };

            Ok(record)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::{corrupt_source, solid_source};
    use tower::ServiceExt;

    #[tokio::test]
    async fn analyzes_a_decodable_file() {
        let service = ColorAnalysisService::new(PipelineConfig::default()).unwrap();
        let record = service
            .oneshot(AnalysisRequest::new(4, solid_source("red.png", [255, 0, 0])))
            .await
            .unwrap();

        assert_eq!(record.position(), 4);
        assert!(record.error().is_none());
        let hue = record.signature().unwrap().hue.unwrap();
        assert!((hue - 40.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn corrupt_bytes_become_a_failed_record() {
        let service = ColorAnalysisService::new(PipelineConfig::default()).unwrap();
        let record = service
            .oneshot(AnalysisRequest::new(0, corrupt_source("broken.png")))
            .await
            .unwrap();

        assert!(record.is_failed());
        assert!(record.error().unwrap().starts_with("Image could not be decoded"));
        assert_eq!(record.original_name(), "broken.png");
    }

    #[test]
    fn synchronous_analysis_matches_the_service() {
        let service = ColorAnalysisService::new(PipelineConfig::default()).unwrap();
        let source = solid_source("blue.png", [0, 0, 255]);
        let signature = service.analyze_bytes(source.bytes()).unwrap();
        assert!((signature.hue.unwrap() - 306.29).abs() < 0.05);
    }
}
