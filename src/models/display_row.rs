use serde::{Deserialize, Serialize};
use std::fmt;

use super::QuoteSource;

/// How targets in a foreign currency are compared with home-currency prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurrencyPolicy {
    /// Only targets in the exchange currency are compared; others are never reached
    #[default]
    MatchOnly,
    /// Every target is assumed to be already expressed in the exchange currency
    AssumeConverted,
}

impl CurrencyPolicy {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "match-only" | "match" => Ok(CurrencyPolicy::MatchOnly),
            "assume-converted" | "converted" => Ok(CurrencyPolicy::AssumeConverted),
            _ => Err(format!(
                "Invalid currency policy: '{}'. Valid values: match-only, assume-converted",
                s
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyPolicy::MatchOnly => "match-only",
            CurrencyPolicy::AssumeConverted => "assume-converted",
        }
    }
}

impl fmt::Display for CurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One (target, reached) cell of a display row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCell {
    pub label: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
    /// False when the currency policy forbids comparing this target with the price
    pub comparable: bool,
    pub reached: bool,
}

impl TargetCell {
    /// Build a cell; `reached` holds only when price and value are finite,
    /// the cell is comparable and price >= value
    pub fn evaluate(
        label: impl Into<String>,
        value: Option<f64>,
        currency: Option<String>,
        comparable: bool,
        price: Option<f64>,
    ) -> Self {
        let reached = comparable && is_reached(price, value);
        Self {
            label: label.into(),
            value,
            currency,
            comparable,
            reached,
        }
    }
}

/// Missing or non-finite operands never count as reached
pub fn is_reached(price: Option<f64>, target: Option<f64>) -> bool {
    match (price, target) {
        (Some(p), Some(t)) if p.is_finite() && t.is_finite() => p >= t,
        _ => false,
    }
}

/// A rendered table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub ticker: String,
    pub price: Option<f64>,
    pub price_source: Option<QuoteSource>,
    /// Derived cell first (when configured), then the sheet targets in schema order
    pub cells: Vec<TargetCell>,
}

impl DisplayRow {
    pub fn cell(&self, label: &str) -> Option<&TargetCell> {
        self.cells.iter().find(|c| c.label == label)
    }

    pub fn reached_count(&self) -> usize {
        self.cells.iter().filter(|c| c.reached).count()
    }
}
