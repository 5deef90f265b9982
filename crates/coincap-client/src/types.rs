//! Response types for the CoinCap asset API.

use crate::error::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};


/// Decimal number as the upstream sends it: a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecimalText(String);

impl DecimalText {
    /// Wraps raw upstream text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Raw text as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the text as a floating point number.
    ///
    /// # Errors
    /// Returns [`ParseError::Decimal`] if the text is not a finite number.
    pub fn value(&self) -> Result<f64, ParseError> {
        self.0
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseError::Decimal(self.0.clone()))
    }
}

impl From<&str> for DecimalText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl std::fmt::Display for DecimalText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Current market snapshot of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    /// Asset identifier (e.g. "bitcoin").
    pub id: String,
    /// Rank by market capitalization.
    pub rank: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Circulating supply.
    pub supply: DecimalText,
    /// Maximum supply, absent when the asset has no cap.
    #[serde(default)]
    pub max_supply: Option<DecimalText>,
    /// Market capitalization in USD.
    pub market_cap_usd: DecimalText,
    /// Trading volume over the last 24 hours in USD.
    #[serde(rename = "volumeUsd24Hr")]
    pub volume_usd_24hr: DecimalText,
    /// Price in USD.
    pub price_usd: DecimalText,
    /// Price change over the last 24 hours, in percent.
    #[serde(rename = "changePercent24Hr")]
    pub change_percent_24hr: DecimalText,
    /// Volume-weighted average price over the last 24 hours.
    #[serde(rename = "vwap24Hr", default)]
    pub vwap_24hr: Option<DecimalText>,
    /// Capture time in epoch milliseconds, taken from the response envelope.
    #[serde(skip)]
    pub timestamp: i64,
}

/// Body of `GET {base}/{id}`.
#[derive(Debug, Deserialize)]
pub(crate) struct AssetEnvelope {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

// ============================================================================
// History
// ============================================================================

/// One point of an asset's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    /// Price in USD.
    pub price_usd: DecimalText,
    /// Point in time, epoch milliseconds.
    pub time: i64,
    /// Point in time.
    pub date: DateTime<Utc>,
}

/// The two most recent points of a history series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    /// Last point of the series.
    pub current: HistoryPoint,
    /// Second-to-last point of the series.
    pub previous: HistoryPoint,
}

impl HistoryWindow {
    /// Takes the last two points of a chronological series.
    ///
    /// Returns `None` when the series has fewer than two points.
    #[must_use]
    pub fn from_series(mut points: Vec<HistoryPoint>) -> Option<Self> {
        let current = points.pop()?;
        let previous = points.pop()?;
        Some(Self { current, previous })
    }
}

/// Body of `GET {base}/{id}/history?interval=...`.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub data: Vec<HistoryPoint>,
    #[serde(default)]
    pub error: Option<String>,
}
