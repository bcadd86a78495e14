//! Output formats for display rows
//!
//! Table output aligns by character count (labels contain Turkish letters)
//! and pads before colouring so escape codes never disturb the layout.

use std::fmt::Write as _;

use crate::error::{AppError, Result};
use crate::models::{DisplayRow, SheetSchema, TargetCell};
use crate::utils::format_price;

/// Light green (#d9f7e3) background with dark text
const HIGHLIGHT_ON: &str = "\x1b[48;2;217;247;227m\x1b[30m";
const HIGHLIGHT_OFF: &str = "\x1b[0m";

const REACHED_MARK: &str = " ✓";
const INCOMPARABLE_MARK: &str = " *";
const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Invalid format: '{}'. Valid values: table, json, csv", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableStyle {
    /// ANSI background on reached cells; a check mark is used otherwise
    pub color: bool,
    /// Append the price source ("1m", "bulk-1d") after the price
    pub show_source: bool,
}

/// Table headers: name, price, then one label per target cell
pub fn column_labels(schema: &SheetSchema) -> Vec<String> {
    let mut labels = vec![schema.ticker_label.clone(), schema.price_label.clone()];
    if let Some(derived) = &schema.derived {
        labels.push(derived.label.clone());
    }
    labels.extend(schema.targets.iter().map(|t| t.label.clone()));
    labels
}

fn cell_text(cell: &TargetCell, color: bool) -> String {
    let mut text = cell.value.map(format_price).unwrap_or_else(|| MISSING.to_string());
    if cell.reached && !color {
        text.push_str(REACHED_MARK);
    }
    if !cell.comparable && cell.value.is_some() {
        text.push_str(INCOMPARABLE_MARK);
    }
    text
}

fn pad_left(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", " ".repeat(width.saturating_sub(len)), text)
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

/// Plain-text table, one line per row
pub fn render_table(rows: &[DisplayRow], schema: &SheetSchema, style: TableStyle) -> String {
    let headers = column_labels(schema);

    // (text, reached) per cell; the first two columns are never highlighted
    let body: Vec<Vec<(String, bool)>> = rows
        .iter()
        .map(|row| {
            let mut price = row.price.map(format_price).unwrap_or_else(|| MISSING.to_string());
            if style.show_source {
                if let Some(source) = row.price_source {
                    price = format!("{} ({})", price, source);
                }
            }
            let mut line = vec![(row.ticker.clone(), false), (price, false)];
            line.extend(row.cells.iter().map(|c| (cell_text(c, style.color), c.reached)));
            line
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (i, (text, _)) in line.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(text.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| if i == 0 { pad_right(h, widths[i]) } else { pad_left(h, widths[i]) })
        .collect();
    let _ = writeln!(out, "{}", header_line.join("  "));
    let total_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "─".repeat(total_width));

    for line in &body {
        let cells: Vec<String> = line
            .iter()
            .take(widths.len())
            .enumerate()
            .map(|(i, (text, reached))| {
                let padded = if i == 0 { pad_right(text, widths[i]) } else { pad_left(text, widths[i]) };
                if *reached && style.color {
                    format!("{}{}{}", HIGHLIGHT_ON, padded, HIGHLIGHT_OFF)
                } else {
                    padded
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  "));
    }

    out
}

/// One-line explanation of the table markers
pub fn legend(style: TableStyle) -> String {
    let reached = if style.color {
        format!("{}  {} reached", HIGHLIGHT_ON, HIGHLIGHT_OFF)
    } else {
        format!("{} reached", REACHED_MARK.trim())
    };
    format!(
        "{} (price ≥ target)   {} other currency, not compared   {} no data",
        reached,
        INCOMPARABLE_MARK.trim(),
        MISSING
    )
}

pub fn render_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// CSV with raw two-decimal numbers and one `reached` column per target
pub fn render_csv(rows: &[DisplayRow], schema: &SheetSchema) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let labels = column_labels(schema);
    let mut header: Vec<String> = labels[..2].to_vec();
    header.push("source".to_string());
    for label in &labels[2..] {
        header.push(label.clone());
        header.push(format!("{} reached", label));
    }
    writer.write_record(&header)?;

    let number = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();
    for row in rows {
        let mut record = vec![
            row.ticker.clone(),
            number(row.price),
            row.price_source.map(|s| s.to_string()).unwrap_or_default(),
        ];
        for cell in &row.cells {
            record.push(number(cell.value));
            record.push(cell.reached.to_string());
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Io(format!("Failed to flush CSV output: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Parse(format!("CSV output is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::labels;
    use crate::models::QuoteSource;

    fn sample_rows() -> Vec<DisplayRow> {
        let price = Some(55.0);
        vec![
            DisplayRow {
                ticker: "ABC".to_string(),
                price,
                price_source: Some(QuoteSource::Snapshot),
                cells: vec![
                    TargetCell::evaluate(labels::DERIVED, Some(50.0), Some("TRY".into()), true, price),
                    TargetCell::evaluate(labels::TARGET_TRY, Some(1234.5), Some("TRY".into()), true, price),
                    TargetCell::evaluate(labels::TARGET_EUR, Some(5.0), Some("EUR".into()), false, price),
                ],
            },
            DisplayRow {
                ticker: "XYZ".to_string(),
                price: None,
                price_source: None,
                cells: vec![
                    TargetCell::evaluate(labels::DERIVED, None, Some("TRY".into()), true, None),
                    TargetCell::evaluate(labels::TARGET_TRY, None, Some("TRY".into()), true, None),
                    TargetCell::evaluate(labels::TARGET_EUR, None, Some("EUR".into()), false, None),
                ],
            },
        ]
    }

    #[test]
    fn test_table_without_color_marks_reached() {
        let table = render_table(&sample_rows(), &SheetSchema::default(), TableStyle::default());
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with(labels::NAME));
        assert!(lines[0].contains(labels::TARGET_EUR));
        assert!(lines[2].contains("50.00 ✓"));
        assert!(lines[2].contains("1,234.50"));
        assert!(!lines[2].contains("1,234.50 ✓"));
        assert!(lines[2].contains("5.00 *"));
        assert!(!lines[2].contains('\x1b'));
        assert!(lines[3].starts_with("XYZ"));
    }

    #[test]
    fn test_table_rows_align() {
        let table = render_table(&sample_rows(), &SheetSchema::default(), TableStyle::default());
        let widths: Vec<usize> = table
            .lines()
            .filter(|l| !l.starts_with('─'))
            .map(|l| l.chars().count())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "widths {:?}", widths);
    }

    #[test]
    fn test_table_with_color_highlights_only_reached() {
        let style = TableStyle { color: true, show_source: false };
        let table = render_table(&sample_rows(), &SheetSchema::default(), style);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[2].matches(HIGHLIGHT_ON).count(), 1);
        assert!(!lines[3].contains(HIGHLIGHT_ON));
    }

    #[test]
    fn test_csv_output() {
        let csv = render_csv(&sample_rows(), &SheetSchema::default()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Hisse Adı,Hisse Fiyatı,source,VWAP Yüzde 30 Hedef,VWAP Yüzde 30 Hedef reached"));
        assert_eq!(lines[1], "ABC,55.00,snapshot,50.00,true,1234.50,false,5.00,false");
        assert_eq!(lines[2], "XYZ,,,,false,,false,,false");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("xml").is_err());
    }
}
