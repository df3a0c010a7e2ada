use image::GrayImage;
use medbill_core::{Point, Quad};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

use crate::preprocess;
use crate::types::Token;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unreadable OCR output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// One recognized word or phrase, as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub quad: Quad,
    pub text: String,
    pub confidence: f32,
}

/// Words the engine grouped into one detected line.
pub type OcrLine = Vec<OcrWord>;

/// Abstraction over an OCR backend.
/// Implementations accept the preprocessed raster and return detections grouped by line.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrLine>, OcrError>;
}

impl<B: OcrBackend + ?Sized> OcrBackend for Box<B> {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrLine>, OcrError> {
        (**self).recognize(image)
    }
}

/// Flattens backend output into positioned tokens.
pub struct TextExtractor<'a, R: OcrBackend + ?Sized> {
    backend: &'a R,
}

impl<'a, R: OcrBackend + ?Sized> TextExtractor<'a, R> {
    pub fn new(backend: &'a R) -> Self {
        Self { backend }
    }

    /// Line-major, then word-major within a line; engine order is kept as-is.
    pub fn extract(&self, image: &GrayImage) -> Result<Vec<Token>, OcrError> {
        let lines = self.backend.recognize(image)?;
        let tokens: Vec<Token> = lines
            .into_iter()
            .flatten()
            .map(|w| Token::new(w.text, w.quad, w.confidence))
            .collect();
        tracing::debug!(count = tokens.len(), "text tokens extracted");
        Ok(tokens)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns preset lines — useful for exercising the pipeline without an OCR engine.
pub struct MockRecognizer {
    pub lines: Vec<OcrLine>,
}

impl MockRecognizer {
    pub fn new(lines: Vec<OcrLine>) -> Self {
        Self { lines }
    }

    /// One line per text, stacked 20 px apart, confidence 0.99.
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        let lines = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                vec![OcrWord {
                    quad: Quad::from_rect(10.0, 10.0 + 20.0 * i as f32, 100.0, 16.0),
                    text: t.as_ref().to_string(),
                    confidence: 0.99,
                }]
            })
            .collect();
        Self { lines }
    }

    pub fn empty() -> Self {
        Self { lines: vec![] }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &GrayImage) -> Result<Vec<OcrLine>, OcrError> {
        Ok(self.lines.clone())
    }
}

// ── External command backend ──────────────────────────────────────────────────

/// Runs an external OCR program (e.g. a PaddleOCR wrapper script) on the
/// preprocessed image and reads its JSON result from stdout.
///
/// Invocation: `<program> <args…> [--use-angle-cls] --image <png> --lang <lang>`.
/// Angle classification is on unless turned off with [`Self::with_angle_cls`].
/// Expected stdout: one entry per detected line, each a list of
/// `[[[x, y] ×4], [text, confidence]]`; a `null` line means no detections.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: PathBuf,
    args: Vec<String>,
    lang: String,
    use_angle_cls: bool,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, lang: &str) -> Self {
        Self { program: program.into(), args, lang: lang.to_string(), use_angle_cls: true }
    }

    pub fn with_angle_cls(mut self, enabled: bool) -> Self {
        self.use_angle_cls = enabled;
        self
    }
}

impl OcrBackend for CommandRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrLine>, OcrError> {
        let png = preprocess::encode_png(image).map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        let input = tempfile::Builder::new().suffix(".png").tempfile()?;
        std::fs::write(input.path(), &png)?;

        tracing::debug!(program = %self.program.display(), "invoking OCR command");
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.use_angle_cls {
            command.arg("--use-angle-cls");
        }
        let output = command
            .arg("--image")
            .arg(input.path())
            .arg("--lang")
            .arg(&self.lang)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        parse_line_json(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Deserialize)]
struct RawDetection(Vec<[f32; 2]>, (String, f32));

/// Parse the nested `[line][word] = [quad, [text, confidence]]` shape.
pub fn parse_line_json(json: &str) -> Result<Vec<OcrLine>, OcrError> {
    if json.trim().is_empty() {
        return Ok(vec![]);
    }
    let raw: Vec<Option<Vec<RawDetection>>> = serde_json::from_str(json)?;
    raw.into_iter()
        .flatten()
        .map(|line| line.into_iter().map(word_from_raw).collect::<Result<OcrLine, _>>())
        .collect()
}

fn word_from_raw(RawDetection(points, (text, confidence)): RawDetection) -> Result<OcrWord, OcrError> {
    let corners: [[f32; 2]; 4] = points.try_into().map_err(|p: Vec<[f32; 2]>| {
        OcrError::Engine(format!("expected 4 corner points for '{text}', got {}", p.len()))
    })?;
    let quad = Quad::new(corners.map(|[x, y]| Point::new(x, y)));
    Ok(OcrWord { quad, text, confidence })
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

/// A single word-level row of Tesseract TSV output.
#[derive(Debug, Clone)]
pub struct TsvWord {
    pub block_num: i32,
    pub par_num: i32,
    pub line_num: i32,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// Percent, as Tesseract reports it.
    pub conf: f32,
    pub text: String,
}

/// Group consecutive TSV rows into lines keyed by (block, paragraph, line).
/// Blank and non-positive-confidence rows are dropped.
pub fn group_tsv_lines(rows: Vec<TsvWord>) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key = None;
    for row in rows.into_iter().filter(|r| !r.text.trim().is_empty() && r.conf > 0.0) {
        let key = (row.block_num, row.par_num, row.line_num);
        let word = OcrWord {
            quad: Quad::from_rect(
                row.left as f32,
                row.top as f32,
                row.width as f32,
                row.height as f32,
            ),
            text: row.text.trim().to_string(),
            confidence: row.conf / 100.0,
        };
        match lines.last_mut() {
            Some(line) if current_key == Some(key) => line.push(word),
            _ => {
                lines.push(vec![word]);
                current_key = Some(key);
            }
        }
    }
    lines
}

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{group_tsv_lines, OcrBackend, OcrError, OcrLine, TsvWord};
    use image::{DynamicImage, GrayImage};
    use rusty_tesseract::{Args, Image};
    use std::collections::HashMap;

    pub struct TesseractRecognizer {
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(lang: &str) -> Self {
            Self { lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrLine>, OcrError> {
            let dynamic = DynamicImage::ImageLuma8(image.clone());
            let tess_img = Image::from_dynamic_image(&dynamic)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let args = Args {
                lang: self.lang.clone(),
                config_variables: HashMap::new(),
                dpi: Some(300),
                psm: Some(3),
                oem: Some(3),
            };
            let data = rusty_tesseract::image_to_data(&tess_img, &args)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            let rows = data
                .data
                .into_iter()
                .map(|d| TsvWord {
                    block_num: d.block_num,
                    par_num: d.par_num,
                    line_num: d.line_num,
                    left: d.left,
                    top: d.top,
                    width: d.width,
                    height: d.height,
                    conf: d.conf,
                    text: d.text,
                })
                .collect();
            Ok(group_tsv_lines(rows))
        }
    }
}
