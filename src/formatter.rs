//! Reply text for each intent.
//!
//! Amounts are printed with four decimals, percentages with two. Times are
//! shown in Kyiv local time as `DD.MM.YYYY HH:MM:SS`.

use chrono::{DateTime, Utc};
use chrono_tz::Europe::Kyiv;
use coincap_client::{AssetSnapshot, HistoryWindow, ParseError};

/// Shown in place of a maximum supply when the asset has no cap.
pub const UNBOUNDED: &str = "∞";

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Renders a UTC instant in Kyiv local time.
#[must_use]
pub fn kyiv_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Kyiv).format(DATE_FORMAT).to_string()
}

/// Renders epoch milliseconds in Kyiv local time, to the second.
///
/// # Errors
/// Returns [`ParseError::Timestamp`] if `millis` is out of range.
pub fn kyiv_time_from_millis(millis: i64) -> Result<String, ParseError> {
    DateTime::from_timestamp(millis.div_euclid(1000), 0)
        .map(kyiv_time)
        .ok_or(ParseError::Timestamp(millis))
}

/// Percent change between two prices.
///
/// The difference is divided by the *current* price, not the previous one.
#[must_use]
pub fn change_percent(current: f64, previous: f64) -> f64 {
    (current - previous) / current * 100.0
}

/// Reply for the `price` intent.
///
/// # Errors
/// Returns [`ParseError`] if the price or capture time cannot be converted.
pub fn price_reply(asset: &AssetSnapshot) -> Result<String, ParseError> {
    let price = asset.price_usd.value()?;
    let captured_at = kyiv_time_from_millis(asset.timestamp)?;

    Ok(format!(
        "Price of {} at {}\n{:.4} USD",
        asset.name, captured_at, price
    ))
}

/// Reply for the `info` intent.
///
/// # Errors
/// Returns [`ParseError`] if any numeric field cannot be converted.
pub fn info_reply(asset: &AssetSnapshot) -> Result<String, ParseError> {
    let supply = asset.supply.value()?;
    let max_supply = match &asset.max_supply {
        Some(max_supply) => format!("{:.4}", max_supply.value()?),
        None => UNBOUNDED.to_string(),
    };
    let market_cap = asset.market_cap_usd.value()?;
    let volume = asset.volume_usd_24hr.value()?;
    let price = asset.price_usd.value()?;
    let change = asset.change_percent_24hr.value()?;

    Ok(format!(
        "Here is what I found about {}\n\n\
         Rank: {}\n\
         Symbol: {}\n\
         Total supply: {:.4}\n\
         Max supply: {}\n\
         Market cap: {:.4} USD\n\
         Volume (24h): {:.4} USD\n\
         Price: {:.4} USD\n\
         Price change (24h): {:.2}%\n",
        asset.name, asset.rank, asset.symbol, supply, max_supply, market_cap, volume, price, change
    ))
}

/// Reply for the `history` intent.
///
/// # Errors
/// Returns [`ParseError`] if either price cannot be converted.
pub fn history_reply(asset_id: &str, window: &HistoryWindow) -> Result<String, ParseError> {
    let current = window.current.price_usd.value()?;
    let previous = window.previous.price_usd.value()?;
    let change = change_percent(current, previous);

    Ok(format!(
        "Price of {id} at {}: {:.4}\nPrice of {id} at {}: {:.4}\nPrice change: {:.2}%",
        kyiv_time(window.previous.date),
        previous,
        kyiv_time(window.current.date),
        current,
        change,
        id = asset_id,
    ))
}
