//! Error types for the webhook.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coincap_client::ParseError;


/// Webhook error types.
///
/// Every variant ends the request with `500 Internal Server Error` and the
/// error message as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body is not a valid webhook request.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Required intent parameter absent or empty.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Intent name has no handler.
    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    /// Market-data service unreachable or failing.
    #[error("Network error: {0}")]
    Network(String),

    /// Market-data payload not valid JSON or of unexpected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A numeric text field could not be converted.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Market-data service does not know the asset.
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Fewer than two history points.
    #[error("Insufficient history for {asset_id}: got {points} point(s), need 2")]
    InsufficientHistory {
        /// Requested asset.
        asset_id: String,
        /// Number of points returned.
        points: usize,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

impl From<coincap_client::Error> for ApiError {
    fn from(err: coincap_client::Error) -> Self {
        use coincap_client::Error;

        match err {
            Error::Network(source) => ApiError::Network(source.to_string()),
            Error::InvalidUrl(source) => ApiError::Network(source.to_string()),
            Error::Decode(source) => ApiError::Decode(source.to_string()),
            Error::UnknownAsset(asset_id) => ApiError::UnknownAsset(asset_id),
            Error::InsufficientHistory { asset_id, points } => {
                ApiError::InsufficientHistory { asset_id, points }
            }
        }
    }
}
