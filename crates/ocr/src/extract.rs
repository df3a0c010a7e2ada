use std::sync::OnceLock;

use medbill_core::Money;
use regex::Regex;

use crate::types::{ProcedureCostPair, Token};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Optional `$`, digits with optional `,ddd` groups, optional `.dd` cents.
re!(re_cost, r"\$?\d+(?:,\d{3})*(?:\.\d{2})?");

/// First cost-like substring in `text`, if any.
pub fn find_cost(text: &str) -> Option<&str> {
    re_cost().find(text).map(|m| m.as_str())
}

// ── Public pairing API ───────────────────────────────────────────────────────

pub struct ProcedureCostPairer;

impl ProcedureCostPairer {
    /// Pair every cost with the text of the token right before it.
    ///
    /// A cost on the first token has no predecessor and is dropped. A token can
    /// serve as the procedure for the next token's cost and still be scanned
    /// for a cost of its own.
    pub fn pair(tokens: &[Token]) -> Vec<ProcedureCostPair> {
        let mut pairs = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            let Some(cost) = find_cost(&token.text) else {
                continue;
            };
            if i == 0 {
                tracing::debug!(cost, "cost on first token has no procedure; skipped");
                continue;
            }
            pairs.push(ProcedureCostPair {
                procedure: tokens[i - 1].text.clone(),
                cost: cost.to_string(),
                amount: Money::parse_cost(cost).ok(),
            });
        }
        tracing::debug!(count = pairs.len(), "procedure/cost pairs found");
        pairs
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
