//! End-to-end tests for the crypto webhook bot.
//!
//! Each test starts the bot in-process on an ephemeral port, wired to either
//! a [`FixtureMarket`] or a real [`coincap_client::CoinCapClient`] pointed at
//! a mock upstream, and talks to it over HTTP.

use async_trait::async_trait;
use chrono::DateTime;
use coincap_client::{AssetSnapshot, DecimalText, HistoryPoint, HistoryWindow, MarketData};
use crypto_webhook_bot::api::create_router;
use crypto_webhook_bot::config::ServerConfig;
use crypto_webhook_bot::server;
use crypto_webhook_bot::state::AppState;
use serde_json::{Map, Value, json};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// 01.01.2024 02:00:00 in Kyiv.
pub const NEW_YEAR_MILLIS: i64 = 1_704_067_200_000;

/// 01.07.2024 03:00:00 in Kyiv.
pub const MIDSUMMER_MILLIS: i64 = 1_719_792_000_000;

/// A bot instance listening on a loopback port.
pub struct TestBot {
    addr: SocketAddr,
    base_url: String,
    client: reqwest::Client,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<io::Result<()>>,
}

impl TestBot {
    /// Socket address the bot listens on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Root URL of the bot, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a path on the bot.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Posts a JSON body to `/webhook`.
    ///
    /// # Errors
    /// Returns error if the request cannot be sent.
    pub async fn post_webhook(&self, body: &Value) -> Result<reqwest::Response, reqwest::Error> {
        self.client.post(self.url("/webhook")).json(body).send().await
    }

    /// Posts raw bytes to `/webhook`.
    ///
    /// # Errors
    /// Returns error if the request cannot be sent.
    pub async fn post_webhook_raw(
        &self,
        body: &'static str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(self.url("/webhook"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
    }

    /// Signals shutdown and waits for the server to stop.
    ///
    /// # Errors
    /// Returns the server's shutdown error, or an error if its task panicked.
    pub async fn stop(self) -> io::Result<()> {
        // The server may already be gone; the join below reports why.
        let _ = self.shutdown.send(());
        self.handle.await.map_err(io::Error::other)?
    }
}

/// Server configuration for tests: loopback, ephemeral port, short grace period.
#[must_use]
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        shutdown_grace_secs: 5,
        ..ServerConfig::default()
    }
}

/// Starts the bot over `market` with [`test_server_config`].
///
/// # Errors
/// Returns error if the listener cannot be bound.
pub async fn spawn_bot(market: Arc<dyn MarketData>) -> io::Result<TestBot> {
    spawn_bot_with(market, test_server_config()).await
}

/// Starts the bot over `market` with a custom server configuration.
///
/// # Errors
/// Returns error if the listener cannot be bound.
pub async fn spawn_bot_with(
    market: Arc<dyn MarketData>,
    config: ServerConfig,
) -> io::Result<TestBot> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;

    let app = create_router(Arc::new(AppState::new(market)));
    let app = server::apply_layers(app, &config);

    let (shutdown, signal) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let signal = async move {
            // A dropped sender also stops the server.
            let _ = signal.await;
        };
        server::serve(listener, app, &config, signal).await
    });

    Ok(TestBot {
        addr,
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        shutdown,
        handle,
    })
}

/// Builds a fulfillment request body.
#[must_use]
pub fn webhook_body(intent: &str, parameters: &[(&str, &str)]) -> Value {
    let parameters: Map<String, Value> = parameters
        .iter()
        .map(|(name, value)| ((*name).to_string(), Value::from(*value)))
        .collect();

    json!({
        "responseId": "e2e-response",
        "session": "projects/e2e/agent/sessions/e2e-session",
        "queryResult": {
            "queryText": "how much is it",
            "parameters": parameters,
            "intent": {
                "name": "projects/e2e/agent/intents/e2e",
                "displayName": intent
            },
            "languageCode": "en"
        }
    })
}

/// First text line of a fulfillment response body.
#[must_use]
pub fn reply_text(body: &Value) -> Option<&str> {
    body["fulfillmentMessages"][0]["text"]["text"][0].as_str()
}

/// Hand-written `POST /webhook` request that leaves the connection open.
#[must_use]
pub fn raw_webhook_request(body: &str) -> String {
    format!(
        "POST /webhook HTTP/1.1\r\n\
         Host: localhost\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        body.len(),
        body
    )
}

/// Reads one HTTP/1.1 response with a `Content-Length` body.
///
/// Returns `None` if the peer closes the connection before sending anything.
///
/// # Errors
/// Returns error if the socket fails or closes mid-response.
pub async fn read_raw_response(stream: &mut TcpStream) -> io::Result<Option<String>> {
    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(head_end) = find_head_end(&received) {
            let head = String::from_utf8_lossy(&received[..head_end]);
            if received.len() >= head_end + 4 + content_length(&head) {
                return Ok(Some(String::from_utf8_lossy(&received).into_owned()));
            }
        }

        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            if received.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-response",
            ));
        }
        received.extend_from_slice(&chunk[..read]);
    }
}

fn find_head_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|window| window == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Bitcoin snapshot captured at [`NEW_YEAR_MILLIS`].
#[must_use]
pub fn bitcoin_snapshot() -> AssetSnapshot {
    AssetSnapshot {
        id: "bitcoin".to_string(),
        rank: "1".to_string(),
        symbol: "BTC".to_string(),
        name: "Bitcoin".to_string(),
        supply: "19600000".into(),
        max_supply: Some("21000000".into()),
        market_cap_usd: "847000000000".into(),
        volume_usd_24hr: "12345.6789".into(),
        price_usd: "43250.123456789".into(),
        change_percent_24hr: "-1.2".into(),
        vwap_24hr: Some("43100.5".into()),
        timestamp: NEW_YEAR_MILLIS,
    }
}

/// Ethereum snapshot without a supply cap.
#[must_use]
pub fn ethereum_snapshot() -> AssetSnapshot {
    AssetSnapshot {
        id: "ethereum".to_string(),
        rank: "2".to_string(),
        symbol: "ETH".to_string(),
        name: "Ethereum".to_string(),
        supply: "120000000".into(),
        max_supply: None,
        market_cap_usd: "270000000000".into(),
        volume_usd_24hr: "5000000".into(),
        price_usd: "2250.5".into(),
        change_percent_24hr: "3.5".into(),
        vwap_24hr: None,
        timestamp: MIDSUMMER_MILLIS,
    }
}

/// History point at `millis` with the given price.
#[must_use]
pub fn history_point(millis: i64, price: &str) -> HistoryPoint {
    HistoryPoint {
        price_usd: DecimalText::new(price),
        time: millis,
        date: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
    }
}

/// In-memory market with fixed answers and an optional response delay.
#[derive(Debug, Clone, Default)]
pub struct FixtureMarket {
    assets: Vec<AssetSnapshot>,
    history: Option<HistoryWindow>,
    delay: Duration,
}

impl FixtureMarket {
    /// Market knowing bitcoin and ethereum, with a two-point bitcoin history.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            assets: vec![bitcoin_snapshot(), ethereum_snapshot()],
            history: Some(HistoryWindow {
                previous: history_point(NEW_YEAR_MILLIS, "40000"),
                current: history_point(MIDSUMMER_MILLIS, "50000"),
            }),
            delay: Duration::ZERO,
        }
    }

    /// Delays every answer by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl MarketData for FixtureMarket {
    async fn fetch_current(&self, asset_id: &str) -> Result<AssetSnapshot, coincap_client::Error> {
        self.wait().await;
        self.assets
            .iter()
            .find(|asset| asset.id == asset_id)
            .cloned()
            .ok_or_else(|| coincap_client::Error::UnknownAsset(asset_id.to_string()))
    }

    async fn fetch_history(
        &self,
        asset_id: &str,
        _interval: &str,
    ) -> Result<HistoryWindow, coincap_client::Error> {
        self.wait().await;
        if !self.assets.iter().any(|asset| asset.id == asset_id) {
            return Err(coincap_client::Error::UnknownAsset(asset_id.to_string()));
        }
        self.history
            .clone()
            .ok_or_else(|| coincap_client::Error::InsufficientHistory {
                asset_id: asset_id.to_string(),
                points: 0,
            })
    }
}
