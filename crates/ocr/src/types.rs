use medbill_core::{Money, Quad};
use serde::{Deserialize, Serialize};

/// One OCR-detected text span with its position and recognition confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub text: String,
    pub position: Quad,
    /// Recognition confidence (0.0–1.0).
    pub confidence: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, position: Quad, confidence: f32) -> Self {
        Self {
            text: text.into(),
            position,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A line item: the text block preceding a cost, and the cost as printed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcedureCostPair {
    pub procedure: String,
    /// Matched substring with its original formatting (`$1,234.56`).
    pub cost: String,
    pub amount: Option<Money>,
}

/// Raw output of a layout collaborator. Nothing in the pipeline reads `output`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutResult {
    pub backend: String,
    pub output: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LayoutOutcome {
    Skipped,
    Classified(LayoutResult),
    Failed(String),
}

impl LayoutOutcome {
    pub fn result(&self) -> Option<&LayoutResult> {
        match self {
            LayoutOutcome::Classified(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillAnalysisResult {
    /// SHA-256 hex digest of the source image bytes.
    pub source_sha256: String,
    pub text_blocks: Vec<Token>,
    pub procedures_costs: Vec<ProcedureCostPair>,
    pub layout: LayoutOutcome,
}

impl BillAnalysisResult {
    /// Sum of every parsed line-item amount.
    pub fn total(&self) -> Money {
        self.procedures_costs
            .iter()
            .filter_map(|p| p.amount)
            .fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, confidence: f32) -> Token {
        Token::new(text, Quad::from_rect(0.0, 0.0, 10.0, 10.0), confidence)
    }

    #[test]
    fn token_clamps_confidence() {
        assert_eq!(token("a", 1.5).confidence, 1.0);
        assert_eq!(token("a", -0.1).confidence, 0.0);
        assert_eq!(token("a", 0.42).confidence, 0.42);
    }

    #[test]
    fn layout_outcome_serializes_tagged() {
        let json = serde_json::to_value(LayoutOutcome::Failed("boom".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "detail": "boom"}));
        let json = serde_json::to_value(LayoutOutcome::Skipped).unwrap();
        assert_eq!(json, serde_json::json!({"status": "skipped"}));
    }

    #[test]
    fn total_sums_parsed_amounts() {
        let result = BillAnalysisResult {
            source_sha256: String::new(),
            text_blocks: vec![],
            procedures_costs: vec![
                ProcedureCostPair {
                    procedure: "X-Ray".into(),
                    cost: "$150.00".into(),
                    amount: Some(Money::from_cents(15000)),
                },
                ProcedureCostPair {
                    procedure: "Consultation".into(),
                    cost: "$75".into(),
                    amount: Some(Money::from_cents(7500)),
                },
                ProcedureCostPair { procedure: "?".into(), cost: "?".into(), amount: None },
            ],
            layout: LayoutOutcome::Skipped,
        };
        assert_eq!(result.total(), Money::from_cents(22500));
    }
}
