//! Unit tests for client module.

use super::*;
use mockito::Matcher;

const BITCOIN_BODY: &str = r#"{
    "data": {
        "id": "bitcoin",
        "rank": "1",
        "symbol": "BTC",
        "name": "Bitcoin",
        "supply": "19600000.0",
        "maxSupply": "21000000.0",
        "marketCapUsd": "847000000000.5",
        "volumeUsd24Hr": "12345.6789",
        "priceUsd": "43250.123456789",
        "changePercent24Hr": "-1.23456",
        "vwap24Hr": "43100.1"
    },
    "timestamp": 1704067200000
}"#;

const HISTORY_BODY: &str = r#"{
    "data": [
        {"priceUsd": "70", "time": 1703980800000, "date": "2023-12-31T00:00:00.000Z"},
        {"priceUsd": "80", "time": 1704067200000, "date": "2024-01-01T00:00:00.000Z"},
        {"priceUsd": "100", "time": 1704153600000, "date": "2024-01-02T00:00:00.000Z"}
    ],
    "timestamp": 1704160000000
}"#;

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.base_url, "https://api.coincap.io/v2/assets");
    assert!(config.api_key.is_none());
}

// ============================================================================
// URL Building Tests
// ============================================================================

#[test]
fn test_asset_url() {
    let client = CoinCapClient::with_base_url("https://api.coincap.io/v2/assets").unwrap();

    assert_eq!(
        client.asset_url("bitcoin").unwrap().as_str(),
        "https://api.coincap.io/v2/assets/bitcoin"
    );
}

#[test]
fn test_asset_url_base_trimmed() {
    let client = CoinCapClient::with_base_url("https://api.coincap.io/v2/assets/").unwrap();

    assert_eq!(
        client.asset_url("ethereum").unwrap().as_str(),
        "https://api.coincap.io/v2/assets/ethereum"
    );
}

#[test]
fn test_asset_url_escapes_id() {
    let client = CoinCapClient::with_base_url("https://api.coincap.io/v2/assets").unwrap();

    assert_eq!(
        client.asset_url("usd coin/markets").unwrap().as_str(),
        "https://api.coincap.io/v2/assets/usd%20coin%2Fmarkets"
    );
}

#[test]
fn test_history_url() {
    let client = CoinCapClient::with_base_url("https://api.coincap.io/v2/assets").unwrap();

    assert_eq!(
        client.history_url("bitcoin", "d1").unwrap().as_str(),
        "https://api.coincap.io/v2/assets/bitcoin/history?interval=d1"
    );
}

#[test]
fn test_invalid_base_url() {
    assert!(matches!(
        CoinCapClient::with_base_url("not a url"),
        Err(Error::InvalidUrl(_))
    ));
    assert!(matches!(
        CoinCapClient::with_base_url("mailto:prices@example.com"),
        Err(Error::InvalidUrl(_))
    ));
}

// ============================================================================
// fetch_current Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_current() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/bitcoin")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BITCOIN_BODY)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let asset = client.fetch_current("bitcoin").await.unwrap();

    mock.assert_async().await;
    assert_eq!(asset.name, "Bitcoin");
    assert_eq!(asset.price_usd.as_str(), "43250.123456789");
    assert_eq!(asset.timestamp, 1_704_067_200_000);
}

#[tokio::test]
async fn test_fetch_current_sends_api_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/bitcoin")
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_body(BITCOIN_BODY)
        .create_async()
        .await;

    let client = CoinCapClient::new(ClientConfig {
        base_url: server.url(),
        api_key: Some("secret".to_string()),
    })
    .unwrap();

    assert!(client.fetch_current("bitcoin").await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_current_empty_data_is_unknown_asset() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/nosuchcoin")
        .with_status(200)
        .with_body(r#"{"data": {}, "timestamp": 1704067200000}"#)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_current("nosuchcoin").await;

    assert!(matches!(result, Err(Error::UnknownAsset(id)) if id == "nosuchcoin"));
}

#[tokio::test]
async fn test_fetch_current_not_found_is_unknown_asset() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/nosuchcoin")
        .with_status(404)
        .with_body(r#"{"error": "nosuchcoin not found", "timestamp": 1704067200000}"#)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_current("nosuchcoin").await;

    assert!(matches!(result, Err(Error::UnknownAsset(_))));
}

#[tokio::test]
async fn test_fetch_current_malformed_body_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bitcoin")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_current("bitcoin").await;

    assert!(matches!(result, Err(Error::Decode(_))));
}

#[tokio::test]
async fn test_fetch_current_unexpected_shape_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bitcoin")
        .with_status(200)
        .with_body(r#"{"data": {"id": "bitcoin", "priceUsd": 43250.5}, "timestamp": 1}"#)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_current("bitcoin").await;

    assert!(matches!(result, Err(Error::Decode(_))));
}

#[tokio::test]
async fn test_fetch_current_missing_timestamp_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bitcoin")
        .with_status(200)
        .with_body(BITCOIN_BODY.replace(",\n    \"timestamp\": 1704067200000", ""))
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_current("bitcoin").await;

    assert!(matches!(result, Err(Error::Decode(ref err)) if err.to_string().contains("timestamp")));
}

#[tokio::test]
async fn test_fetch_current_server_error_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bitcoin")
        .with_status(503)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_current("bitcoin").await;

    assert!(matches!(result, Err(Error::Network(_))));
}

#[tokio::test]
async fn test_fetch_current_unreachable_is_network_error() {
    let client = CoinCapClient::with_base_url("http://127.0.0.1:1").unwrap();
    let result = client.fetch_current("bitcoin").await;

    assert!(matches!(result, Err(Error::Network(_))));
}

// ============================================================================
// fetch_history Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_history() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/bitcoin/history")
        .match_query(Matcher::UrlEncoded("interval".into(), "d1".into()))
        .with_status(200)
        .with_body(HISTORY_BODY)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let window = client.fetch_history("bitcoin", "d1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(window.current.price_usd.as_str(), "100");
    assert_eq!(window.previous.price_usd.as_str(), "80");
    assert_eq!(window.previous.time, 1_704_067_200_000);
}

#[tokio::test]
async fn test_fetch_history_single_point_is_insufficient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bitcoin/history")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"data": [{"priceUsd": "100", "time": 1704153600000, "date": "2024-01-02T00:00:00.000Z"}]}"#,
        )
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_history("bitcoin", "d1").await;

    assert!(matches!(
        result,
        Err(Error::InsufficientHistory { ref asset_id, points: 1 }) if asset_id == "bitcoin"
    ));
}

#[tokio::test]
async fn test_fetch_history_rejected_interval_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bitcoin/history")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error": "use valid interval: m1, m5, m15, m30, h1, h2, h6, h12, d1"}"#)
        .create_async()
        .await;

    let client = CoinCapClient::with_base_url(&server.url()).unwrap();
    let result = client.fetch_history("bitcoin", "weekly").await;

    assert!(matches!(result, Err(Error::Network(_))));
}
