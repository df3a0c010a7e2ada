use image::GrayImage;
use medbill_core::NormalizedBox;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

use crate::preprocess;
use crate::types::{LayoutResult, Token};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Layout classification needs at least one text token")]
    NoTokens,
    #[error("Layout engine error: {0}")]
    Engine(String),
    #[error("Layout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unreadable layout output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A token's text and integer box, as layout models take them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayoutWord {
    pub text: String,
    pub bbox: NormalizedBox,
}

/// Abstraction over a document-layout model.
pub trait LayoutBackend: Send + Sync {
    fn name(&self) -> &str;
    fn classify(&self, image: &GrayImage, words: &[LayoutWord]) -> Result<serde_json::Value, LayoutError>;
}

impl<B: LayoutBackend + ?Sized> LayoutBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn classify(&self, image: &GrayImage, words: &[LayoutWord]) -> Result<serde_json::Value, LayoutError> {
        (**self).classify(image, words)
    }
}

pub struct LayoutClassifier<'a, L: LayoutBackend + ?Sized> {
    backend: &'a L,
}

impl<'a, L: LayoutBackend + ?Sized> LayoutClassifier<'a, L> {
    pub fn new(backend: &'a L) -> Self {
        Self { backend }
    }

    pub fn classify(&self, image: &GrayImage, tokens: &[Token]) -> Result<LayoutResult, LayoutError> {
        if tokens.is_empty() {
            return Err(LayoutError::NoTokens);
        }
        let words = layout_words(tokens);
        let output = self.backend.classify(image, &words)?;
        tracing::debug!(backend = self.backend.name(), words = words.len(), "layout classified");
        Ok(LayoutResult { backend: self.backend.name().to_string(), output })
    }
}

pub fn layout_words(tokens: &[Token]) -> Vec<LayoutWord> {
    tokens
        .iter()
        .map(|t| LayoutWord { text: t.text.clone(), bbox: t.position.normalized() })
        .collect()
}

// ── Mock backend ──────────────────────────────────────────────────────────────

pub struct MockLayoutBackend {
    response: Result<serde_json::Value, String>,
}

impl MockLayoutBackend {
    pub fn returning(value: serde_json::Value) -> Self {
        Self { response: Ok(value) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { response: Err(message.into()) }
    }
}

impl LayoutBackend for MockLayoutBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn classify(&self, _image: &GrayImage, _words: &[LayoutWord]) -> Result<serde_json::Value, LayoutError> {
        self.response.clone().map_err(LayoutError::Engine)
    }
}

// ── External command backend ──────────────────────────────────────────────────

#[derive(Serialize)]
struct LayoutRequest<'a> {
    image: &'a std::path::Path,
    words: Vec<&'a str>,
    boxes: Vec<NormalizedBox>,
}

/// Runs an external layout model (e.g. a LayoutLMv2 wrapper script).
///
/// Invocation: `<program> <args…> --request <json>` where the request file holds
/// `{"image": <png path>, "words": [...], "boxes": [[8 ints], ...]}`.
/// Whatever JSON the program prints is kept verbatim.
#[derive(Debug, Clone)]
pub struct CommandLayoutBackend {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLayoutBackend {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

impl LayoutBackend for CommandLayoutBackend {
    fn name(&self) -> &str {
        "command"
    }

    fn classify(&self, image: &GrayImage, words: &[LayoutWord]) -> Result<serde_json::Value, LayoutError> {
        let png = preprocess::encode_png(image).map_err(|e| LayoutError::Engine(e.to_string()))?;
        let image_file = tempfile::Builder::new().suffix(".png").tempfile()?;
        std::fs::write(image_file.path(), &png)?;

        let request = LayoutRequest {
            image: image_file.path(),
            words: words.iter().map(|w| w.text.as_str()).collect(),
            boxes: words.iter().map(|w| w.bbox).collect(),
        };
        let request_file = tempfile::Builder::new().suffix(".json").tempfile()?;
        std::fs::write(request_file.path(), serde_json::to_vec(&request)?)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--request")
            .arg(request_file.path())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LayoutError::Engine(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbill_core::{Point, Quad};

    fn token(text: &str, quad: Quad) -> Token {
        Token::new(text, quad, 0.9)
    }

    #[test]
    fn words_carry_truncated_boxes() {
        let quad = Quad::new([
            Point::new(1.9, 2.9),
            Point::new(50.5, 3.1),
            Point::new(50.2, 20.8),
            Point::new(1.1, 20.0),
        ]);
        let words = layout_words(&[token("X-Ray", quad)]);
        assert_eq!(words, vec![LayoutWord { text: "X-Ray".into(), bbox: [1, 2, 50, 3, 50, 20, 1, 20] }]);
    }

    #[test]
    fn empty_tokens_is_an_error() {
        let backend = MockLayoutBackend::returning(serde_json::json!({}));
        let err = LayoutClassifier::new(&backend).classify(&GrayImage::new(2, 2), &[]).unwrap_err();
        assert!(matches!(err, LayoutError::NoTokens));
    }

    #[test]
    fn backend_output_is_returned_unchanged() {
        let logits = serde_json::json!({"logits": [[0.1, -2.3]]});
        let backend = MockLayoutBackend::returning(logits.clone());
        let tokens = [token("Bill", Quad::from_rect(0.0, 0.0, 10.0, 5.0))];
        let result = LayoutClassifier::new(&backend).classify(&GrayImage::new(2, 2), &tokens).unwrap();
        assert_eq!(result.output, logits);
        assert_eq!(result.backend, "mock");
    }

    #[test]
    fn backend_failure_surfaces() {
        let backend = MockLayoutBackend::failing("model not loaded");
        let tokens = [token("Bill", Quad::from_rect(0.0, 0.0, 10.0, 5.0))];
        let err = LayoutClassifier::new(&backend).classify(&GrayImage::new(2, 2), &tokens).unwrap_err();
        assert_eq!(err.to_string(), "Layout engine error: model not loaded");
    }

    #[test]
    fn missing_command_is_io_error() {
        let backend = CommandLayoutBackend::new("/nonexistent/medbill-layout", vec![]);
        let words = [LayoutWord { text: "a".into(), bbox: [0; 8] }];
        let err = backend.classify(&GrayImage::new(2, 2), &words).unwrap_err();
        assert!(matches!(err, LayoutError::Io(_)));
    }
}
