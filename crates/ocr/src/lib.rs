pub mod config;
pub mod extract;
pub mod hash;
pub mod layout;
pub mod pipeline;
pub mod preprocess;
pub mod reading_order;
pub mod recognizer;
pub mod types;

pub use config::{
    ConfigError, LayoutConfig, LayoutPolicy, OcrBackendKind, OcrConfig, PipelineConfig, LAYOUTLM_SCRIPT,
    PADDLE_OCR_SCRIPT,
};
pub use extract::{find_cost, ProcedureCostPairer};
pub use layout::{CommandLayoutBackend, LayoutBackend, LayoutClassifier, LayoutError, LayoutWord, MockLayoutBackend};
pub use pipeline::{BillPipeline, PipelineError};
pub use preprocess::{load_image_from_bytes, preprocess, PreprocessError};
pub use reading_order::sort_reading_order;
pub use recognizer::{CommandRecognizer, MockRecognizer, OcrBackend, OcrError, OcrLine, OcrWord, TextExtractor};
pub use types::{BillAnalysisResult, LayoutOutcome, LayoutResult, ProcedureCostPair, Token};
