//! HTTP client for the CoinCap asset API.

use crate::error::Error;
use crate::market::MarketData;
use crate::types::{AssetEnvelope, AssetSnapshot, HistoryEnvelope, HistoryWindow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

#[cfg(test)]
mod tests;

/// Public CoinCap assets endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.coincap.io/v2/assets";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Assets endpoint (e.g., "https://api.coincap.io/v2/assets").
    pub base_url: String,
    /// Bearer token for CoinCap's authenticated tier.
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

/// HTTP client for the CoinCap asset API.
///
/// Every call is a fresh round trip: no retries, no caching.
#[derive(Debug, Clone)]
pub struct CoinCapClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl CoinCapClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.filter(|key| !key.is_empty()),
        })
    }

    /// Creates a new client without an API key.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// URL of an asset's current snapshot: `{base}/{id}`.
    ///
    /// # Errors
    /// Returns error if the base URL cannot take path segments.
    pub fn asset_url(&self, asset_id: &str) -> Result<Url, Error> {
        self.url_with_segments(&[asset_id])
    }

    /// URL of an asset's history: `{base}/{id}/history?interval={interval}`.
    ///
    /// # Errors
    /// Returns error if the base URL cannot take path segments.
    pub fn history_url(&self, asset_id: &str, interval: &str) -> Result<Url, Error> {
        let mut url = self.url_with_segments(&[asset_id, "history"])?;
        url.query_pairs_mut().append_pair("interval", interval);
        Ok(url)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, asset_id: &str) -> Result<Vec<u8>, Error> {
        debug!(%url, "requesting CoinCap");

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::UnknownAsset(asset_id.to_string()));
        }

        let body = resp.error_for_status()?.bytes().await?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl MarketData for CoinCapClient {
    async fn fetch_current(&self, asset_id: &str) -> Result<AssetSnapshot, Error> {
        let url = self.asset_url(asset_id)?;
        let body = self.get(url, asset_id).await?;
        let envelope: AssetEnvelope = serde_json::from_slice(&body)?;

        // The upstream answers unknown ids with an error member or an empty data object.
        let data = match envelope.data {
            Some(data) if envelope.error.is_none() && !is_empty_object(&data) => data,
            _ => return Err(Error::UnknownAsset(asset_id.to_string())),
        };

        let timestamp = envelope
            .timestamp
            .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("timestamp"))?;
        let mut snapshot: AssetSnapshot = serde_json::from_value(data)?;
        snapshot.timestamp = timestamp;
        Ok(snapshot)
    }

    async fn fetch_history(&self, asset_id: &str, interval: &str) -> Result<HistoryWindow, Error> {
        let url = self.history_url(asset_id, interval)?;
        let body = self.get(url, asset_id).await?;
        let envelope: HistoryEnvelope = serde_json::from_slice(&body)?;

        if envelope.error.is_some() {
            return Err(Error::UnknownAsset(asset_id.to_string()));
        }

        let points = envelope.data.len();
        HistoryWindow::from_series(envelope.data).ok_or_else(|| Error::InsufficientHistory {
            asset_id: asset_id.to_string(),
            points,
        })
    }
}

fn is_empty_object(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
