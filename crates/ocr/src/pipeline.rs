use image::GrayImage;
use std::path::Path;
use thiserror::Error;

use crate::config::{LayoutPolicy, PipelineConfig};
use crate::extract::ProcedureCostPairer;
use crate::hash;
use crate::layout::{LayoutBackend, LayoutClassifier, LayoutError};
use crate::preprocess;
use crate::reading_order::sort_reading_order;
use crate::recognizer::{OcrBackend, OcrError, TextExtractor};
use crate::types::{BillAnalysisResult, LayoutOutcome, Token};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Layout classification failed: {0}")]
    Layout(#[from] LayoutError),
}

/// Orchestrates: hash → decode → preprocess → OCR → (reading order) → layout → pairing.
///
/// Collaborators are built once by the caller and reused across bills.
pub struct BillPipeline<R: OcrBackend> {
    recognizer: R,
    layout: Option<Box<dyn LayoutBackend>>,
    config: PipelineConfig,
}

impl<R: OcrBackend> BillPipeline<R> {
    pub fn new(recognizer: R, config: PipelineConfig) -> Self {
        Self { recognizer, layout: None, config }
    }

    pub fn with_layout(mut self, backend: Box<dyn LayoutBackend>) -> Self {
        self.layout = Some(backend);
        self
    }

    /// Process a bill image on disk.
    pub fn process(&self, path: &Path) -> Result<BillAnalysisResult, PipelineError> {
        let bytes = std::fs::read(path)?;
        tracing::info!(path = %path.display(), "processing bill");
        self.process_bytes(&bytes)
    }

    /// Process raw image bytes.
    pub fn process_bytes(&self, data: &[u8]) -> Result<BillAnalysisResult, PipelineError> {
        // 1. Identify the source.
        let source_sha256 = hash::to_hex(&hash::sha256_bytes(data));

        // 2. Decode and preprocess.
        let image = preprocess::load_image_from_bytes(data)?;
        let preprocessed = preprocess::preprocess(&image);

        // 3. Run OCR.
        let mut tokens = TextExtractor::new(&self.recognizer).extract(&preprocessed)?;
        if self.config.reading_order {
            tokens = sort_reading_order(tokens, self.config.band_tolerance);
        }

        // 4. Layout (result is kept, never interpreted).
        let layout = self.classify_layout(&preprocessed, &tokens)?;

        // 5. Pair procedures with costs.
        let procedures_costs = ProcedureCostPairer::pair(&tokens);
        if procedures_costs.is_empty() {
            tracing::info!(bill = %source_sha256, "no procedures found");
        }

        tracing::info!(
            bill = %source_sha256,
            tokens = tokens.len(),
            pairs = procedures_costs.len(),
            "bill processed"
        );

        Ok(BillAnalysisResult {
            source_sha256,
            text_blocks: tokens,
            procedures_costs,
            layout,
        })
    }

    fn classify_layout(
        &self,
        image: &GrayImage,
        tokens: &[Token],
    ) -> Result<LayoutOutcome, PipelineError> {
        let Some(backend) = self.layout.as_deref() else {
            return Ok(LayoutOutcome::Skipped);
        };
        match self.config.layout_policy {
            LayoutPolicy::Skip => Ok(LayoutOutcome::Skipped),
            LayoutPolicy::BestEffort if tokens.is_empty() => Ok(LayoutOutcome::Skipped),
            LayoutPolicy::BestEffort => match LayoutClassifier::new(backend).classify(image, tokens) {
                Ok(result) => Ok(LayoutOutcome::Classified(result)),
                Err(e) => {
                    tracing::warn!("Layout classification failed, continuing: {e}");
                    Ok(LayoutOutcome::Failed(e.to_string()))
                }
            },
            LayoutPolicy::Strict => {
                let result = LayoutClassifier::new(backend).classify(image, tokens)?;
                Ok(LayoutOutcome::Classified(result))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
