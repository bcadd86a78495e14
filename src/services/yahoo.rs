use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration as StdDuration;
use tokio::time::sleep;

use crate::models::{finite, Interval};
use crate::services::quote_provider::{Bar, ProviderError, QuoteProvider};

const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance chart/spark client
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    user_agents: Vec<String>,
    random_agent: bool,
}

impl YahooClient {
    pub fn new(timeout: StdDuration, max_retries: u32) -> Result<Self, ProviderError> {
        Self::with_base_url(BASE_URL, timeout, max_retries, true)
    }

    /// Client against a custom host (proxies, mirrors)
    pub fn with_base_url(
        base_url: &str,
        timeout: StdDuration,
        max_retries: u32,
        random_agent: bool,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
        ];

        Ok(YahooClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            user_agents,
            random_agent,
        })
    }

    fn get_user_agent(&self) -> String {
        if self.random_agent {
            use rand::seq::SliceRandom;
            self.user_agents
                .choose(&mut rand::thread_rng())
                .unwrap_or(&self.user_agents[0])
                .clone()
        } else {
            self.user_agents[0].clone()
        }
    }

    /// GET a JSON document, retrying network errors, 429 and 5xx with exponential backoff
    async fn make_request(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ProviderError> {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                let reason = last_error.as_ref().map(|e| e.to_string()).unwrap_or_default();
                tracing::info!(
                    "Yahoo retry backoff: attempt {}/{} - reason: {}, waiting {:.1}s",
                    attempt + 1,
                    self.max_retries + 1,
                    reason,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            tracing::debug!(url = url, attempt = attempt + 1, "YAHOO_REQUEST");

            let response = self
                .client
                .get(url)
                .query(query)
                .header("Accept", "application/json, text/plain, */*")
                .header("User-Agent", self.get_user_agent())
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let text = resp.text().await?;
                        return Ok(serde_json::from_str::<Value>(&text)?);
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ProviderError::RateLimit);
                    } else if status.is_server_error() {
                        last_error = Some(ProviderError::InvalidResponse(format!("Server error ({})", status.as_u16())));
                    } else if status == StatusCode::NOT_FOUND {
                        // Unknown or delisted symbol
                        return Err(ProviderError::NoData);
                    } else {
                        return Err(ProviderError::InvalidResponse(format!(
                            "Client error ({}) - not retryable",
                            status.as_u16()
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(ProviderError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::InvalidResponse("Max retries exceeded".to_string())))
    }

    fn period_bounds(lookback_days: i64) -> (i64, i64) {
        let now = Utc::now();
        let start = now - ChronoDuration::days(lookback_days.max(1));
        (start.timestamp(), now.timestamp())
    }
}

/// Spark accepts only named ranges
fn spark_range(lookback_days: i64) -> &'static str {
    match lookback_days {
        i64::MIN..=1 => "1d",
        2..=5 => "5d",
        6..=31 => "1mo",
        _ => "3mo",
    }
}

/// Error object of a chart response, if any
fn chart_error(data: &Value) -> Option<String> {
    let error = data.get("chart")?.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(
        error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown chart error")
            .to_string(),
    )
}

fn chart_result(data: &Value) -> Result<&Value, ProviderError> {
    if let Some(message) = chart_error(data) {
        tracing::debug!(error = %message, "Chart error");
        return Err(ProviderError::NoData);
    }
    data.get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .ok_or(ProviderError::NoData)
}

/// `regularMarketPrice` from a chart response
pub fn parse_snapshot(data: &Value) -> Result<Option<f64>, ProviderError> {
    let result = chart_result(data)?;
    Ok(result
        .get("meta")
        .and_then(|m| m.get("regularMarketPrice"))
        .and_then(|p| p.as_f64())
        .and_then(finite))
}

/// Zip `timestamp` with a close array; null closes become gaps
fn zip_bars(timestamps: &[Value], closes: &[Value]) -> Vec<Bar> {
    let length = timestamps.len().min(closes.len());
    let mut bars = Vec::with_capacity(length);

    for i in 0..length {
        let Some(ts) = timestamps[i].as_i64() else {
            continue;
        };
        let Some(time) = DateTime::<Utc>::from_timestamp(ts, 0) else {
            continue;
        };
        bars.push(Bar {
            time,
            close: closes[i].as_f64().and_then(finite),
        });
    }

    bars.sort_by(|a, b| a.time.cmp(&b.time));
    bars
}

/// Bars from a chart response (`result[0].timestamp` + `indicators.quote[0].close`)
pub fn parse_chart_bars(data: &Value) -> Result<Vec<Bar>, ProviderError> {
    let result = chart_result(data)?;
    bars_from_chart_item(result)
}

fn bars_from_chart_item(item: &Value) -> Result<Vec<Bar>, ProviderError> {
    let timestamps = match item.get("timestamp").and_then(|t| t.as_array()) {
        Some(t) => t,
        // Yahoo omits "timestamp" entirely when the window holds no bars
        None => return Ok(Vec::new()),
    };
    let closes = item
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.as_array())
        .and_then(|q| q.first())
        .and_then(|q| q.get("close"))
        .and_then(|c| c.as_array())
        .ok_or_else(|| ProviderError::InvalidResponse("Missing key: indicators.quote[0].close".to_string()))?;

    if timestamps.len() != closes.len() {
        tracing::debug!(
            timestamps = timestamps.len(),
            closes = closes.len(),
            "Inconsistent array lengths, truncating"
        );
    }

    Ok(zip_bars(timestamps, closes))
}

/// Bars per symbol from a spark response
///
/// Handles both the flat `{"SYM": {"timestamp": [...], "close": [...]}}`
/// layout and the nested `{"spark": {"result": [{"symbol", "response"}]}}` one.
pub fn parse_spark(data: &Value) -> HashMap<String, Vec<Bar>> {
    let mut results = HashMap::new();

    if let Some(items) = data
        .get("spark")
        .and_then(|s| s.get("result"))
        .and_then(|r| r.as_array())
    {
        for item in items {
            let Some(symbol) = item.get("symbol").and_then(|s| s.as_str()) else {
                continue;
            };
            let chart_item = item
                .get("response")
                .and_then(|r| r.as_array())
                .and_then(|r| r.first());
            if let Some(chart_item) = chart_item {
                match bars_from_chart_item(chart_item) {
                    Ok(bars) => {
                        results.insert(symbol.to_uppercase(), bars);
                    }
                    Err(e) => tracing::debug!(symbol = symbol, error = %e, "Skipping spark item"),
                }
            }
        }
        return results;
    }

    if let Some(obj) = data.as_object() {
        for (key, item) in obj {
            let symbol_fields = ["symbol", "ticker", "s"];
            let symbol = symbol_fields
                .iter()
                .find_map(|field| item.get(*field).and_then(|v| v.as_str()))
                .unwrap_or(key);

            let (Some(timestamps), Some(closes)) = (
                item.get("timestamp").and_then(|t| t.as_array()),
                item.get("close").and_then(|c| c.as_array()),
            ) else {
                continue;
            };
            results.insert(symbol.to_uppercase(), zip_bars(timestamps, closes));
        }
    }

    results
}

#[async_trait]
impl QuoteProvider for YahooClient {
    async fn snapshot(&self, symbol: &str) -> Result<Option<f64>, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let query = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        let data = self.make_request(&url, &query).await?;
        parse_snapshot(&data)
    }

    async fn history(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: i64,
    ) -> Result<Vec<Bar>, ProviderError> {
        let (period1, period2) = Self::period_bounds(lookback_days);
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", interval.to_yahoo_format().to_string()),
            ("includePrePost", "false".to_string()),
        ];

        tracing::debug!(
            symbol = symbol,
            interval = %interval,
            lookback_days = lookback_days,
            "YAHOO_GET_HISTORY"
        );

        let data = self.make_request(&url, &query).await?;
        parse_chart_bars(&data)
    }

    async fn bulk_history(
        &self,
        symbols: &[String],
        interval: Interval,
        lookback_days: i64,
    ) -> Result<HashMap<String, Vec<Bar>>, ProviderError> {
        if symbols.is_empty() {
            return Err(ProviderError::InvalidResponse("Symbols list cannot be empty".to_string()));
        }

        let url = format!("{}/v8/finance/spark", self.base_url);
        let query = [
            ("symbols", symbols.join(",")),
            ("range", spark_range(lookback_days).to_string()),
            ("interval", interval.to_yahoo_format().to_string()),
        ];

        tracing::debug!(
            symbols_count = symbols.len(),
            first_symbols = ?&symbols[..symbols.len().min(5)],
            interval = %interval,
            "YAHOO_GET_BULK_HISTORY"
        );

        let data = self.make_request(&url, &query).await?;
        let results = parse_spark(&data);
        tracing::debug!(returned = results.len(), requested = symbols.len(), "Spark response parsed");
        Ok(results)
    }
}

/// 0.5s doubling per retry plus up to 0.5s jitter, capped at 10s
fn backoff_delay(attempt: u32) -> StdDuration {
    let exponent = attempt.saturating_sub(1).min(16) as i32;
    let secs = 0.5 * 2.0_f64.powi(exponent) + rand::random::<f64>() * 0.5;
    StdDuration::from_secs_f64(secs.min(10.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_server::TestServer;
    use serde_json::json;

    const CHART_OK: &str = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":312.25}}],"error":null}}"#;

    fn local_client(server: &TestServer) -> YahooClient {
        YahooClient::with_base_url(&server.url, StdDuration::from_secs(5), 2, false).unwrap()
    }

    #[test]
    fn test_parse_snapshot() {
        let data = json!({"chart": {"result": [{"meta": {"symbol": "THYAO.IS", "regularMarketPrice": 312.25}}], "error": null}});
        assert_eq!(parse_snapshot(&data).unwrap(), Some(312.25));

        let no_price = json!({"chart": {"result": [{"meta": {"symbol": "THYAO.IS"}}], "error": null}});
        assert_eq!(parse_snapshot(&no_price).unwrap(), None);
    }

    #[test]
    fn test_parse_chart_error_is_no_data() {
        let data = json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}});
        assert!(matches!(parse_snapshot(&data), Err(ProviderError::NoData)));
        assert!(matches!(parse_chart_bars(&data), Err(ProviderError::NoData)));
    }

    #[test]
    fn test_parse_chart_bars_keeps_gaps() {
        let data = json!({"chart": {"result": [{
            "meta": {},
            "timestamp": [1710400000, 1710400060, 1710400120],
            "indicators": {"quote": [{"close": [10.0, 10.25, null]}]}
        }], "error": null}});

        let bars = parse_chart_bars(&data).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].close, Some(10.25));
        assert_eq!(bars[2].close, None);
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let data = json!({"chart": {"result": [{"meta": {}, "indicators": {"quote": [{}]}}], "error": null}});
        assert!(parse_chart_bars(&data).unwrap().is_empty());
    }

    #[test]
    fn test_parse_spark_flat_layout() {
        let data = json!({
            "THYAO.IS": {"symbol": "THYAO.IS", "timestamp": [1710400000, 1710400060], "close": [300.0, 301.5]},
            "ASELS.IS": {"symbol": "ASELS.IS", "timestamp": [], "close": []}
        });
        let results = parse_spark(&data);
        assert_eq!(results.len(), 2);
        assert_eq!(results["THYAO.IS"][1].close, Some(301.5));
        assert!(results["ASELS.IS"].is_empty());
    }

    #[test]
    fn test_parse_spark_nested_layout() {
        let data = json!({"spark": {"result": [
            {"symbol": "thyao.is", "response": [{
                "timestamp": [1710400000],
                "indicators": {"quote": [{"close": [299.5]}]}
            }]}
        ], "error": null}});
        let results = parse_spark(&data);
        assert_eq!(results["THYAO.IS"][0].close, Some(299.5));
    }

    #[test]
    fn test_spark_range() {
        assert_eq!(spark_range(1), "1d");
        assert_eq!(spark_range(5), "5d");
        assert_eq!(spark_range(10), "1mo");
        assert_eq!(spark_range(90), "3mo");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = YahooClient::new(StdDuration::from_secs(5), 1);
        assert!(client.is_ok());
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        assert!(backoff_delay(1) <= StdDuration::from_secs(1));
        assert!(backoff_delay(3) >= StdDuration::from_secs(2));
        assert!(backoff_delay(70) <= StdDuration::from_secs(10));
        assert!(backoff_delay(u32::MAX) <= StdDuration::from_secs(10));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = TestServer::start(vec![(503, String::new()), (200, CHART_OK.to_string())]).await;
        let client = local_client(&server);

        assert_eq!(client.snapshot("THYAO.IS").await.unwrap(), Some(312.25));
        assert_eq!(server.hits(), 2);
        assert!(server.requests()[0].starts_with("/v8/finance/chart/THYAO.IS?"));
    }

    #[tokio::test]
    async fn test_not_found_is_no_data_without_retry() {
        let server = TestServer::start(vec![(404, String::new())]).await;
        let client = local_client(&server);

        assert!(matches!(client.snapshot("XXXX.IS").await, Err(ProviderError::NoData)));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = TestServer::start(vec![(400, String::new())]).await;
        let client = local_client(&server);

        assert!(matches!(client.snapshot("THYAO.IS").await, Err(ProviderError::InvalidResponse(_))));
        assert_eq!(server.hits(), 1);
    }
}
