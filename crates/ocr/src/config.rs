use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// What happens to the layout stage of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPolicy {
    /// Never run the layout model.
    Skip,
    /// Run it, but a failure only gets logged.
    #[default]
    BestEffort,
    /// Any layout failure aborts the run.
    Strict,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackendKind {
    #[default]
    Command,
    Tesseract,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    pub program: String,
    pub args: Vec<String>,
    pub lang: String,
    /// Let the engine detect and correct rotated text.
    pub use_angle_cls: bool,
}

/// Wrapper scripts shipped with the workspace, relative to its root.
pub const PADDLE_OCR_SCRIPT: &str = "scripts/paddle_ocr.py";
pub const LAYOUTLM_SCRIPT: &str = "scripts/layoutlm.py";

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Command,
            program: "python3".into(),
            args: vec![PADDLE_OCR_SCRIPT.into()],
            lang: "en".into(),
            use_angle_cls: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rebuild top-to-bottom, left-to-right order before pairing.
    pub reading_order: bool,
    /// Band height for reading order, as a fraction of the median token height.
    pub band_tolerance: f32,
    pub layout_policy: LayoutPolicy,
    pub ocr: OcrConfig,
    /// No table means no layout model is configured.
    pub layout: Option<LayoutConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reading_order: false,
            band_tolerance: 0.5,
            layout_policy: LayoutPolicy::default(),
            ocr: OcrConfig::default(),
            layout: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = PipelineConfig::from_toml("").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert!(!cfg.reading_order);
        assert_eq!(cfg.layout_policy, LayoutPolicy::BestEffort);
        assert!(cfg.layout.is_none());
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
            reading_order = true
            layout_policy = "strict"
            band_tolerance = 0.75

            [ocr]
            backend = "tesseract"
            lang = "eng"

            [layout]
            program = "python3"
            args = ["scripts/layoutlm.py", "--model", "base"]
        "#;
        let cfg = PipelineConfig::from_toml(toml).unwrap();
        assert!(cfg.reading_order);
        assert_eq!(cfg.layout_policy, LayoutPolicy::Strict);
        assert_eq!(cfg.band_tolerance, 0.75);
        assert_eq!(cfg.ocr.backend, OcrBackendKind::Tesseract);
        assert_eq!(cfg.ocr.lang, "eng");
        // Unset fields in a present table still default.
        assert_eq!(cfg.ocr.program, "python3");
        let layout = cfg.layout.unwrap();
        assert_eq!(layout.args, ["scripts/layoutlm.py", "--model", "base"]);
    }

    #[test]
    fn default_ocr_runs_bundled_paddle_script_with_angle_cls() {
        let cfg = OcrConfig::default();
        assert_eq!(cfg.program, "python3");
        assert_eq!(cfg.args, [PADDLE_OCR_SCRIPT]);
        assert!(cfg.use_angle_cls);
        assert!(!PipelineConfig::from_toml("[ocr]\nuse_angle_cls = false").unwrap().ocr.use_angle_cls);
    }

    #[test]
    fn bundled_scripts_exist() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        for script in [PADDLE_OCR_SCRIPT, LAYOUTLM_SCRIPT] {
            let path = root.join(script);
            assert!(path.is_file(), "missing {}", path.display());
            let body = std::fs::read_to_string(&path).unwrap();
            assert!(body.starts_with("#!/usr/bin/env python3"));
        }
        let paddle = std::fs::read_to_string(root.join(PADDLE_OCR_SCRIPT)).unwrap();
        for flag in ["--image", "--lang", "--use-angle-cls"] {
            assert!(paddle.contains(flag), "paddle wrapper lacks {flag}");
        }
        let layout = std::fs::read_to_string(root.join(LAYOUTLM_SCRIPT)).unwrap();
        assert!(layout.contains("--request"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = PipelineConfig::from_toml(r#"layout_policy = "sometimes""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medbill.toml");
        std::fs::write(&path, "layout_policy = \"skip\"\n").unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap().layout_policy, LayoutPolicy::Skip);
        assert!(matches!(
            PipelineConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
