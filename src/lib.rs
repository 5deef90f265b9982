//! # Crypto Webhook Bot - Dialogflow Fulfillment Server
//!
//! A fulfillment webhook for a Dialogflow agent that answers questions about
//! cryptocurrency prices. The agent classifies the user's utterance into an
//! intent and extracts its parameters; this server looks the asset up on
//! [CoinCap](https://docs.coincap.io/) and replies with a short text message.
//! Built with [Axum](https://crates.io/crates/axum).
//!
//! ## Intents
//!
//! | Intent | Parameters | Reply |
//! |--------|------------|-------|
//! | `price` | `currency` | Current price and capture time |
//! | `info` | `currency` | Rank, symbol, supply, market cap, volume, price, 24h change |
//! | `history` | `currency`, `history` (interval) | Last two prices of the series and the change between them |
//!
//! Any other intent, a missing parameter, or an upstream failure answers
//! `500 Internal Server Error` with the error message as plain text.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers and router configuration |
//! | [`config`] | TOML configuration and command-line overrides |
//! | [`error`] | Webhook error type with `IntoResponse` implementation |
//! | [`formatter`] | Reply text for each intent |
//! | [`intents`] | Intent resolution and execution |
//! | [`models`] | Webhook request/response DTOs with OpenAPI schemas |
//! | [`server`] | Connection handling, timeouts and graceful shutdown |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/webhook` | Dialogflow fulfillment |
//!
//! ## Example Usage
//!
//! ```bash
//! # Listen on :8080 against the public CoinCap API
//! cargo run
//!
//! # Custom address and upstream
//! cargo run -- --addr 127.0.0.1:7777 --base https://rest.coincap.io/v3/assets --api-key $KEY
//!
//! # Ask for a price
//! curl -X POST http://localhost:8080/webhook \
//!   -H "Content-Type: application/json" \
//!   -d '{"queryResult": {"intent": {"displayName": "price"}, "parameters": {"currency": "bitcoin"}}}'
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod formatter;
pub mod intents;
pub mod models;
pub mod server;
pub mod state;
