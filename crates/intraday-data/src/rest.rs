//! Historical and intraday candles over the brokerage REST API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use intraday_core::error::DataError;
use intraday_core::{Candle, HistoricalSource, Instrument};

/// One candle row as the API returns it:
/// `[timestamp, open, high, low, close, volume, open_interest]`.
#[derive(Debug, Deserialize)]
struct CandleRow(String, f64, f64, f64, f64, u64, #[allow(dead_code)] u64);

#[derive(Debug, Deserialize)]
struct CandleData {
    candles: Vec<CandleRow>,
}

#[derive(Debug, Deserialize)]
struct CandleEnvelope {
    status: String,
    data: Option<CandleData>,
    message: Option<String>,
}

/// Upstox-style candle source implementing [`HistoricalSource`].
///
/// The candle endpoints are public; no bearer token is needed.
pub struct UpstoxMarketData {
    http: Client,
    api_base: String,
}

impl UpstoxMarketData {
    /// Create a source against the given API host.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into(),
        }
    }

    async fn fetch_candles(&self, url: &str) -> Result<Vec<Candle>, DataError> {
        debug!(url, "fetching candles");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DataError::Api(format!("{status}: {text}")));
        }

        let envelope: CandleEnvelope = resp
            .json()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?;

        if envelope.status != "success" {
            return Err(DataError::Api(
                envelope.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let rows = envelope.data.map(|d| d.candles).unwrap_or_default();
        let mut candles = rows
            .into_iter()
            .map(decode_row)
            .collect::<Result<Vec<Candle>, DataError>>()?;

        // The API returns newest-first; callers expect oldest-first.
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

fn decode_row(row: CandleRow) -> Result<Candle, DataError> {
    let timestamp = DateTime::parse_from_rfc3339(&row.0)
        .map_err(|e| DataError::Parse(format!("bad candle timestamp {}: {e}", row.0)))?
        .with_timezone(&Utc);
    Ok(Candle::new(timestamp, row.1, row.2, row.3, row.4, row.5))
}

fn encode_token(instrument: &Instrument) -> String {
    instrument.token().replace('|', "%7C")
}

#[async_trait]
impl HistoricalSource for UpstoxMarketData {
    async fn historical_candles(
        &self,
        instrument: &Instrument,
        date: NaiveDate,
    ) -> Result<Vec<Candle>, DataError> {
        let url = format!(
            "{}/v2/historical-candle/{}/1minute/{}",
            self.api_base,
            encode_token(instrument),
            date.format("%Y-%m-%d"),
        );
        self.fetch_candles(&url).await
    }

    async fn intraday_candles(&self, instrument: &Instrument) -> Result<Vec<Candle>, DataError> {
        let url = format!(
            "{}/v2/historical-candle/intraday/{}/1minute/",
            self.api_base,
            encode_token(instrument),
        );
        self.fetch_candles(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_row() {
        let row: CandleRow = serde_json::from_str(
            r#"["2025-04-07T09:15:00+05:30", 101.5, 102.0, 101.0, 101.8, 4500, 0]"#,
        )
        .unwrap();

        let candle = decode_row(row).unwrap();
        assert_eq!(candle.open, 101.5);
        assert_eq!(candle.high, 102.0);
        assert_eq!(candle.low, 101.0);
        assert_eq!(candle.close, 101.8);
        assert_eq!(candle.volume, 4500);
        // 09:15 IST == 03:45 UTC
        assert_eq!(candle.timestamp.to_rfc3339(), "2025-04-07T03:45:00+00:00");
    }

    #[test]
    fn test_decode_row_bad_timestamp() {
        let row = CandleRow("not-a-date".to_string(), 1.0, 2.0, 0.5, 1.5, 10, 0);
        assert!(matches!(decode_row(row), Err(DataError::Parse(_))));
    }

    #[test]
    fn test_envelope_decode() {
        let body = r#"{
            "status": "success",
            "data": {
                "candles": [
                    ["2025-04-07T09:16:00+05:30", 102.0, 102.5, 101.5, 102.2, 3000, 0],
                    ["2025-04-07T09:15:00+05:30", 101.5, 102.0, 101.0, 101.8, 4500, 0]
                ]
            }
        }"#;

        let envelope: CandleEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.status, "success");
        assert_eq!(envelope.data.unwrap().candles.len(), 2);
    }

    #[test]
    fn test_token_encoding() {
        let instrument = Instrument::nse_eq("INE121J01017");
        assert_eq!(encode_token(&instrument), "NSE_EQ%7CINE121J01017");
    }
}
