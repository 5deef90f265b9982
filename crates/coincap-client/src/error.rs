//! Error types for the CoinCap client.

use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Upstream unreachable or answered with a non-success status.
    #[error("CoinCap request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream payload is not JSON or does not have the expected shape.
    #[error("unexpected CoinCap payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Upstream does not know the requested asset.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// Upstream returned fewer than two history points.
    #[error("not enough price history for {asset_id}: got {points} point(s), need 2")]
    InsufficientHistory {
        /// Requested asset.
        asset_id: String,
        /// Number of points the upstream returned.
        points: usize,
    },

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A text-encoded upstream field that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not a valid decimal number.
    #[error("invalid decimal number: {0:?}")]
    Decimal(String),

    /// Epoch milliseconds outside the representable date range.
    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
}
