//! Intent dispatch.
//!
//! A [`QueryResult`] is turned into an [`IntentCommand`] before any upstream
//! call is made, so an unknown intent or a missing parameter never reaches
//! the market-data service.

use crate::error::ApiError;
use crate::formatter;
use crate::models::QueryResult;
use coincap_client::MarketData;
use tracing::debug;

/// Parameter holding the asset identifier.
pub const CURRENCY_PARAM: &str = "currency";

/// Parameter holding the history interval.
pub const INTERVAL_PARAM: &str = "history";

/// A validated intent, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentCommand {
    /// Current price of an asset.
    Price {
        /// Asset identifier.
        currency: String,
    },
    /// Full market summary of an asset.
    Info {
        /// Asset identifier.
        currency: String,
    },
    /// Price change over the last history interval.
    History {
        /// Asset identifier.
        currency: String,
        /// Upstream interval name (e.g. "h1", "d1").
        interval: String,
    },
}

impl IntentCommand {
    /// Resolves the intent by display name and extracts its parameters.
    ///
    /// # Errors
    /// Returns [`ApiError::UnknownIntent`] or [`ApiError::MissingParameter`].
    pub fn from_query(query: &QueryResult) -> Result<Self, ApiError> {
        match query.intent.display_name.as_str() {
            "price" => Ok(Self::Price {
                currency: required(query, CURRENCY_PARAM)?,
            }),
            "info" => Ok(Self::Info {
                currency: required(query, CURRENCY_PARAM)?,
            }),
            "history" => Ok(Self::History {
                currency: required(query, CURRENCY_PARAM)?,
                interval: required(query, INTERVAL_PARAM)?,
            }),
            other => Err(ApiError::UnknownIntent(other.to_string())),
        }
    }

    /// Intent display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Price { .. } => "price",
            Self::Info { .. } => "info",
            Self::History { .. } => "history",
        }
    }

    /// Fetches the market data for this intent and renders the reply.
    ///
    /// # Errors
    /// Returns the upstream failure or a [`ApiError::Parse`] from the formatter.
    pub async fn execute(&self, market: &dyn MarketData) -> Result<String, ApiError> {
        debug!(intent = self.name(), "executing intent");

        let reply = match self {
            Self::Price { currency } => {
                let asset = market.fetch_current(currency).await?;
                formatter::price_reply(&asset)?
            }
            Self::Info { currency } => {
                let asset = market.fetch_current(currency).await?;
                formatter::info_reply(&asset)?
            }
            Self::History { currency, interval } => {
                let window = market.fetch_history(currency, interval).await?;
                formatter::history_reply(currency, &window)?
            }
        };

        Ok(reply)
    }
}

/// Reads a parameter; the platform sends unfilled slots as empty strings.
fn required(query: &QueryResult, name: &'static str) -> Result<String, ApiError> {
    query
        .parameters
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingParameter(name))
}
