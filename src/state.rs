//! Application state management.

use coincap_client::MarketData;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// Immutable after startup; requests share nothing else.
#[derive(Clone)]
pub struct AppState {
    /// Market-data source used by every intent.
    pub market: Arc<dyn MarketData>,
}

impl AppState {
    /// Creates a new application state over a market-data source.
    #[must_use]
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}
