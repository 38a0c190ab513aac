//! The extraction pipeline: PDF bytes in, validated [`StatementData`] out.
//!
//! One run renders every page, encodes the pages, sends them to the model
//! in a single request, and parses the answer. Document problems stop the
//! run before the model is called. Nothing is retried.

use crate::backend::VisionBackend;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::output::{ExtractionReport, StatementData};
use crate::pipeline::render::{self, PageRasterizer};
use crate::pipeline::{encode, llm};
use crate::progress::ProgressCallback;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs the pipeline against one rasterizer and one backend.
///
/// The backend is borrowed: it is built once at startup, holding the
/// credential, and outlives every extractor that uses it.
pub struct StatementExtractor<'a, R: PageRasterizer, B: VisionBackend> {
    rasterizer: Arc<R>,
    backend: &'a B,
    jpeg_quality: u8,
    instruction: Option<String>,
    progress: Option<ProgressCallback>,
}

impl<'a, R: PageRasterizer, B: VisionBackend> StatementExtractor<'a, R, B> {
    pub fn new(rasterizer: R, backend: &'a B, config: &ScanConfig) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            backend,
            jpeg_quality: config.jpeg_quality,
            instruction: config.instruction.clone(),
            progress: None,
        }
    }

    /// Report milestones to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Extract a statement, discarding the run statistics.
    pub async fn extract(&self, pdf: Vec<u8>) -> Result<StatementData, ScanError> {
        self.extract_with_report(pdf).await.map(|r| r.data)
    }

    /// Extract a statement and report page count and timings.
    pub async fn extract_with_report(&self, pdf: Vec<u8>) -> Result<ExtractionReport, ScanError> {
        if let Some(ref cb) = self.progress {
            cb.on_extraction_start(pdf.len());
        }
        let result = self.run(pdf).await;
        if let Some(ref cb) = self.progress {
            cb.on_extraction_complete(result.is_ok());
        }
        if let Err(ref e) = result {
            warn!("Extraction failed: {}", e);
        }
        result
    }

    async fn run(&self, pdf: Vec<u8>) -> Result<ExtractionReport, ScanError> {
        let total_start = Instant::now();

        // ── Step 1: Rasterise pages ──────────────────────────────────────
        let render_start = Instant::now();
        let images = render::render_pages(Arc::clone(&self.rasterizer), Arc::new(pdf)).await?;
        if images.is_empty() {
            return Err(ScanError::EmptyDocument);
        }

        // ── Step 2: Encode images to base64 ──────────────────────────────
        let encoded = images
            .iter()
            .enumerate()
            .map(|(idx, img)| {
                encode::encode_page(idx + 1, img, self.jpeg_quality).map_err(|e| {
                    ScanError::Document {
                        detail: format!("page {} could not be encoded: {}", idx + 1, e),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        drop(images);
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        let page_count = encoded.len();
        if let Some(ref cb) = self.progress {
            cb.on_pages_rendered(page_count);
        }

        // ── Step 3: One model call for all pages ─────────────────────────
        let request = llm::build_request(encoded, self.instruction.as_deref());
        let image_bytes = request.image_bytes();
        if let Some(ref cb) = self.progress {
            cb.on_request_sent(page_count, image_bytes);
        }
        let model_start = Instant::now();
        let text = self.backend.generate(&request).await?;
        let model_duration_ms = model_start.elapsed().as_millis() as u64;

        // ── Step 4: Validate and convert ─────────────────────────────────
        let data = llm::parse_statement(&text)?;

        let report = ExtractionReport {
            data,
            page_count,
            image_bytes,
            render_duration_ms,
            model_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Extraction complete via {}: {} pages, {} transactions, {}ms total",
            self.backend.name(),
            report.page_count,
            report.data.transactions.len(),
            report.total_duration_ms
        );
        Ok(report)
    }
}
