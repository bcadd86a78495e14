use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{finite, CurrencyPolicy, DisplayRow, Exchange, PriceMap, SheetSchema, TargetCell};
use crate::services::sheet_loader::SheetTable;

/// Fail with every required column the table lacks
pub fn check_schema(table: &SheetTable, schema: &SheetSchema) -> Result<()> {
    let missing = table.missing_columns(&schema.required_columns());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Schema { missing })
    }
}

/// Build one display row per sheet row with a non-empty ticker
///
/// Cell order is the derived target (when configured) followed by the sheet
/// targets in schema order.
pub fn evaluate(
    table: &SheetTable,
    prices: &PriceMap,
    schema: &SheetSchema,
    exchange: &Exchange,
    policy: CurrencyPolicy,
) -> Result<Vec<DisplayRow>> {
    check_schema(table, schema)?;

    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| AppError::Schema { missing: vec![name.to_string()] })
    };

    let ticker_idx = column(&schema.ticker_column)?;
    let target_idx: Vec<usize> = schema
        .targets
        .iter()
        .map(|t| column(&t.column))
        .collect::<Result<_>>()?;
    let derived_idx = match &schema.derived {
        Some(derived) => Some((derived, column(&derived.source_column)?)),
        None => None,
    };

    let comparable = |currency: &str| policy == CurrencyPolicy::AssumeConverted || exchange.quotes_in(currency);
    let derived_currency = schema
        .derived_currency()
        .unwrap_or(exchange.currency.as_str())
        .to_string();

    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let ticker = table.cell(row, ticker_idx).map(str::trim).unwrap_or("");
        if ticker.is_empty() {
            continue;
        }

        let quote = prices.quote(ticker);
        let price = quote.map(|q| q.price);
        let mut cells = Vec::with_capacity(schema.targets.len() + 1);

        if let Some((derived, idx)) = derived_idx {
            let value = table
                .number(row, idx)
                .and_then(|base| finite(base / derived.divisor));
            cells.push(TargetCell::evaluate(
                derived.label.clone(),
                value,
                Some(derived_currency.clone()),
                comparable(&derived_currency),
                price,
            ));
        }

        for (target, idx) in schema.targets.iter().zip(&target_idx) {
            cells.push(TargetCell::evaluate(
                target.label.clone(),
                table.number(row, *idx),
                Some(target.currency.clone()),
                comparable(&target.currency),
                price,
            ));
        }

        rows.push(DisplayRow {
            ticker: ticker.to_string(),
            price,
            price_source: quote.map(|q| q.source),
            cells,
        });
    }

    debug!(rows = rows.len(), policy = %policy, "Targets evaluated");
    Ok(rows)
}
