//! Typed client for the CoinCap asset API.
//!
//! CoinCap reports every numeric field as a JSON string. The types in this
//! crate keep that text as [`DecimalText`] and convert it in one place,
//! [`DecimalText::value`], when a number is actually needed.
//!
//! # Example
//!
//! ```no_run
//! use coincap_client::{CoinCapClient, ClientConfig, MarketData};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CoinCapClient::new(ClientConfig::default())?;
//!
//!     let bitcoin = client.fetch_current("bitcoin").await?;
//!     println!("{}: {} USD", bitcoin.name, bitcoin.price_usd.value()?);
//!
//!     let window = client.fetch_history("bitcoin", "d1").await?;
//!     println!("{} -> {}", window.previous.price_usd, window.current.price_usd);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod market;
mod types;

pub use client::{ClientConfig, CoinCapClient, DEFAULT_BASE_URL};
pub use error::{Error, ParseError};
pub use market::MarketData;
pub use types::{AssetSnapshot, DecimalText, HistoryPoint, HistoryWindow};
