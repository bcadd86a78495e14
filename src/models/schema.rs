//! Declarative sheet schema
//!
//! Shared by the sheet loader (which columns must exist) and the target
//! evaluator (which columns become target cells and how the derived target
//! is computed). Column names are compared after header normalization, so
//! `"AVWAP ( TRY )"` in the sheet matches `"AVWAP (TRY)"` here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{labels, DEFAULT_DERIVED_DIVISOR};
use crate::error::{AppError, Result};
use crate::services::sheet_loader::normalize_header;

/// One target column of the sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetColumn {
    /// Header in the sheet
    pub column: String,
    /// Label in the rendered table
    pub label: String,
    /// Currency the target is denominated in
    pub currency: String,
}

/// Target computed from another column: `source / divisor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTarget {
    pub source_column: String,
    pub label: String,
    #[serde(default = "default_divisor")]
    pub divisor: f64,
}

fn default_divisor() -> f64 {
    DEFAULT_DERIVED_DIVISOR
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSchema {
    pub ticker_column: String,
    #[serde(default = "default_ticker_label")]
    pub ticker_label: String,
    #[serde(default = "default_price_label")]
    pub price_label: String,
    pub targets: Vec<TargetColumn>,
    pub derived: Option<DerivedTarget>,
}

fn default_ticker_label() -> String {
    labels::NAME.to_string()
}

fn default_price_label() -> String {
    labels::PRICE.to_string()
}

impl Default for SheetSchema {
    fn default() -> Self {
        Self::avwap()
    }
}

impl SheetSchema {
    /// `Ticker`, `AVWAP (TRY)`, `AVWAP (EUR)`
    pub fn avwap() -> Self {
        Self::with_target_columns("AVWAP (TRY)", "AVWAP (EUR)")
    }

    /// `Ticker`, `AVWAP HEDEF+4 (TRY)`, `AVWAP HEDEF+4 (EUR)`
    pub fn hedef4() -> Self {
        Self::with_target_columns("AVWAP HEDEF+4 (TRY)", "AVWAP HEDEF+4 (EUR)")
    }

    fn with_target_columns(try_column: &str, eur_column: &str) -> Self {
        Self {
            ticker_column: "Ticker".to_string(),
            ticker_label: default_ticker_label(),
            price_label: default_price_label(),
            targets: vec![
                TargetColumn {
                    column: try_column.to_string(),
                    label: labels::TARGET_TRY.to_string(),
                    currency: "TRY".to_string(),
                },
                TargetColumn {
                    column: eur_column.to_string(),
                    label: labels::TARGET_EUR.to_string(),
                    currency: "EUR".to_string(),
                },
            ],
            derived: Some(DerivedTarget {
                source_column: try_column.to_string(),
                label: labels::DERIVED.to_string(),
                divisor: DEFAULT_DERIVED_DIVISOR,
            }),
        }
    }

    /// Look up a built-in schema by name
    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "avwap" | "default" => Ok(Self::avwap()),
            "hedef4" | "hedef+4" => Ok(Self::hedef4()),
            other => Err(AppError::Config(format!(
                "Unknown schema preset '{}'. Valid presets: avwap, hedef4",
                other
            ))),
        }
    }

    /// Load a schema from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read schema {}: {}", path.display(), e)))?;
        let schema: SheetSchema = serde_json::from_str(&content)?;
        schema.validated()
    }

    /// Normalize every column name and check the schema is usable
    pub fn validated(mut self) -> Result<Self> {
        self.ticker_column = normalize_header(&self.ticker_column);
        if self.ticker_column.is_empty() {
            return Err(AppError::Config("ticker_column must not be empty".to_string()));
        }

        if self.targets.is_empty() {
            return Err(AppError::Config("schema needs at least one target column".to_string()));
        }

        for target in &mut self.targets {
            target.column = normalize_header(&target.column);
            target.currency = target.currency.trim().to_uppercase();
            if target.column.is_empty() {
                return Err(AppError::Config("target column names must not be empty".to_string()));
            }
            if target.label.trim().is_empty() {
                target.label = target.column.clone();
            }
        }

        {
            let mut seen = std::collections::HashSet::new();
            for target in &self.targets {
                if !seen.insert(target.column.as_str()) {
                    return Err(AppError::Config(format!("duplicate target column '{}'", target.column)));
                }
            }
        }

        if let Some(derived) = &mut self.derived {
            derived.source_column = normalize_header(&derived.source_column);
            if derived.source_column.is_empty() {
                return Err(AppError::Config("derived source_column must not be empty".to_string()));
            }
            if !derived.divisor.is_finite() || derived.divisor == 0.0 {
                return Err(AppError::Config(format!(
                    "derived divisor must be a finite non-zero number, got {}",
                    derived.divisor
                )));
            }
        }

        Ok(self)
    }

    /// Every column the sheet must contain, ticker first, without duplicates
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = vec![self.ticker_column.as_str()];
        for target in &self.targets {
            if !columns.contains(&target.column.as_str()) {
                columns.push(target.column.as_str());
            }
        }
        if let Some(derived) = &self.derived {
            if !columns.contains(&derived.source_column.as_str()) {
                columns.push(derived.source_column.as_str());
            }
        }
        columns
    }

    /// Currency of the derived target (inherits the source column's currency when it is a target)
    pub fn derived_currency(&self) -> Option<&str> {
        let derived = self.derived.as_ref()?;
        self.targets
            .iter()
            .find(|t| t.column == derived.source_column)
            .map(|t| t.currency.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_schema_columns() {
        let schema = SheetSchema::default();
        assert_eq!(schema.required_columns(), vec!["Ticker", "AVWAP (TRY)", "AVWAP (EUR)"]);
        assert_eq!(schema.derived_currency(), Some("TRY"));
    }

    #[test]
    fn test_hedef4_preset() {
        let schema = SheetSchema::preset("hedef4").unwrap();
        assert_eq!(
            schema.required_columns(),
            vec!["Ticker", "AVWAP HEDEF+4 (TRY)", "AVWAP HEDEF+4 (EUR)"]
        );
        assert!(SheetSchema::preset("nope").is_err());
    }

    #[test]
    fn test_validated_normalizes_names() {
        let mut schema = SheetSchema::avwap();
        schema.targets[0].column = "AVWAP ( TRY )".to_string();
        schema.targets[1].currency = " eur ".to_string();

        let schema = schema.validated().unwrap();
        assert_eq!(schema.targets[0].column, "AVWAP (TRY)");
        assert_eq!(schema.targets[1].currency, "EUR");
    }

    #[test]
    fn test_validated_rejects_zero_divisor() {
        let mut schema = SheetSchema::avwap();
        if let Some(derived) = schema.derived.as_mut() {
            derived.divisor = 0.0;
        }
        assert!(matches!(schema.validated(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validated_rejects_duplicate_targets() {
        let mut schema = SheetSchema::avwap();
        schema.targets[1].column = "AVWAP  (TRY)".to_string();
        assert!(schema.validated().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "ticker_column": "Kod",
                "targets": [{{"column": "Hedef (TRY)", "label": "Hedef", "currency": "TRY"}}],
                "derived": {{"source_column": "Hedef (TRY)", "label": "Yarı"}}
            }}"#
        )
        .unwrap();

        let schema = SheetSchema::from_file(file.path()).unwrap();
        assert_eq!(schema.ticker_column, "Kod");
        assert_eq!(schema.ticker_label, labels::NAME);
        assert_eq!(schema.derived.as_ref().map(|d| d.divisor), Some(2.0));
        assert_eq!(schema.required_columns(), vec!["Kod", "Hedef (TRY)"]);
    }
}
