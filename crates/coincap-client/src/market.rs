//! Market-data capability.

use crate::error::Error;
use crate::types::{AssetSnapshot, HistoryWindow};
use async_trait::async_trait;

/// Source of current and historical asset prices.
///
/// [`CoinCapClient`](crate::CoinCapClient) is the production implementation.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetches the current snapshot of an asset.
    ///
    /// # Errors
    /// Returns [`Error::UnknownAsset`] when the upstream does not know `asset_id`.
    async fn fetch_current(&self, asset_id: &str) -> Result<AssetSnapshot, Error>;

    /// Fetches the two most recent points of an asset's history at `interval`.
    ///
    /// `interval` is passed through to the upstream unchecked.
    ///
    /// # Errors
    /// Returns [`Error::InsufficientHistory`] when fewer than two points exist.
    async fn fetch_history(&self, asset_id: &str, interval: &str) -> Result<HistoryWindow, Error>;
}
