//! Tests running the bot against a mocked CoinCap API.

use bot_tests::{reply_text, spawn_bot, webhook_body};
use coincap_client::{ClientConfig, CoinCapClient};
use mockito::Matcher;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;

const ASSETS_PATH: &str = "/v2/assets";

const BITCOIN_BODY: &str = r#"{
    "data": {
        "id": "bitcoin",
        "rank": "1",
        "symbol": "BTC",
        "name": "Bitcoin",
        "supply": "19600000.0000000000000000",
        "maxSupply": "21000000.0000000000000000",
        "marketCapUsd": "847000000000.0000000000000000",
        "volumeUsd24Hr": "12345.6789000000000000",
        "priceUsd": "43250.1234567890000000",
        "changePercent24Hr": "-1.2000000000000000",
        "vwap24Hr": "43100.5000000000000000",
        "explorer": "https://blockchain.info/"
    },
    "timestamp": 1704067200000
}"#;

fn coincap_client(server: &mockito::ServerGuard, api_key: Option<&str>) -> CoinCapClient {
    CoinCapClient::new(ClientConfig {
        base_url: format!("{}{}", server.url(), ASSETS_PATH),
        api_key: api_key.map(str::to_string),
    })
    .expect("Failed to create CoinCap client")
}

#[tokio::test]
async fn test_price_from_coincap() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/assets/bitcoin")
        .match_header("authorization", "Bearer e2e-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BITCOIN_BODY)
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, Some("e2e-key"))))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body("price", &[("currency", "bitcoin")]))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid reply body");
    assert_eq!(
        reply_text(&body),
        Some("Price of Bitcoin at 01.01.2024 02:00:00\n43250.1235 USD")
    );
    mock.assert_async().await;

    bot.stop().await.expect("Failed to stop bot");
}

#[tokio::test]
async fn test_info_from_coincap() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/assets/bitcoin")
        .with_status(200)
        .with_body(BITCOIN_BODY)
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, None)))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body("info", &[("currency", "bitcoin")]))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid reply body");
    let reply = reply_text(&body).expect("Missing reply text");
    assert!(reply.starts_with("Here is what I found about Bitcoin\n\nRank: 1\n"));
    assert!(reply.contains("Max supply: 21000000.0000\n"));
    assert!(reply.ends_with("Price change (24h): -1.20%\n"));

    bot.stop().await.expect("Failed to stop bot");
}

#[tokio::test]
async fn test_history_from_coincap() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/assets/bitcoin/history")
        .match_query(Matcher::UrlEncoded("interval".into(), "h1".into()))
        .with_status(200)
        .with_body(
            r#"{
                "data": [
                    {"priceUsd": "90.0", "time": 1719784800000, "date": "2024-06-30T22:00:00.000Z"},
                    {"priceUsd": "80.0", "time": 1719788400000, "date": "2024-06-30T23:00:00.000Z"},
                    {"priceUsd": "100.0", "time": 1719792000000, "date": "2024-07-01T00:00:00.000Z"}
                ],
                "timestamp": 1719792100000
            }"#,
        )
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, None)))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body(
            "history",
            &[("currency", "bitcoin"), ("history", "h1")],
        ))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid reply body");
    assert_eq!(
        reply_text(&body),
        Some(
            "Price of bitcoin at 01.07.2024 02:00:00: 80.0000\n\
             Price of bitcoin at 01.07.2024 03:00:00: 100.0000\n\
             Price change: 20.00%"
        )
    );
    mock.assert_async().await;

    bot.stop().await.expect("Failed to stop bot");
}

#[tokio::test]
async fn test_single_point_history_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/assets/bitcoin/history")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"data": [{"priceUsd": "100.0", "time": 1719792000000, "date": "2024-07-01T00:00:00.000Z"}], "timestamp": 1}"#,
        )
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, None)))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body(
            "history",
            &[("currency", "bitcoin"), ("history", "d1")],
        ))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "Insufficient history for bitcoin: got 1 point(s), need 2"
    );

    bot.stop().await.expect("Failed to stop bot");
}

#[tokio::test]
async fn test_unknown_asset_from_coincap() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/assets/nosuchcoin")
        .with_status(404)
        .with_body(r#"{"error": "nosuchcoin not found", "timestamp": 1}"#)
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, None)))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body("price", &[("currency", "nosuchcoin")]))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Unknown asset: nosuchcoin");

    bot.stop().await.expect("Failed to stop bot");
}

#[tokio::test]
async fn test_upstream_outage_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/assets/bitcoin")
        .with_status(503)
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, None)))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body("price", &[("currency", "bitcoin")]))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().starts_with("Network error: "));

    bot.stop().await.expect("Failed to stop bot");
}

#[tokio::test]
async fn test_unparseable_price_is_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/assets/bitcoin")
        .with_status(200)
        .with_body(BITCOIN_BODY.replace("43250.1234567890000000", "n/a"))
        .create_async()
        .await;

    let bot = spawn_bot(Arc::new(coincap_client(&server, None)))
        .await
        .expect("Failed to start bot");

    let response = bot
        .post_webhook(&webhook_body("price", &[("currency", "bitcoin")]))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "Parse error: invalid decimal number: \"n/a\""
    );

    bot.stop().await.expect("Failed to stop bot");
}
