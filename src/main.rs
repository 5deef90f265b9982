//! Crypto Webhook Bot Server
//!
//! Dialogflow fulfillment webhook backed by the CoinCap API.

use anyhow::Context;
use clap::Parser;
use coincap_client::CoinCapClient;
use crypto_webhook_bot::api::create_router;
use crypto_webhook_bot::config::Config;
use crypto_webhook_bot::models::{
    FulfillmentMessage, HealthResponse, Intent, MessageText, QueryResult, WebhookRequest,
    WebhookResponse,
};
use crypto_webhook_bot::server;
use crypto_webhook_bot::state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crypto_webhook_bot::api::handlers::health_check,
        crypto_webhook_bot::api::handlers::webhook,
    ),
    components(
        schemas(
            HealthResponse,
            WebhookRequest,
            QueryResult,
            Intent,
            WebhookResponse,
            FulfillmentMessage,
            MessageText,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Webhook", description = "Dialogflow fulfillment"),
    ),
    info(
        title = "Crypto Webhook Bot API",
        version = "0.1.0",
        description = "Dialogflow fulfillment webhook answering cryptocurrency price questions",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[derive(Parser, Debug)]
#[command(name = "crypto-webhook-bot")]
#[command(about = "Dialogflow fulfillment webhook backed by the CoinCap API")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "BOT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (":8080" binds all interfaces)
    #[arg(long, env = "BOT_ADDR")]
    addr: Option<String>,

    /// CoinCap assets endpoint
    #[arg(long = "base", env = "COINCAP_BASE_URL")]
    base_url: Option<String>,

    /// CoinCap API key
    #[arg(long, env = "COINCAP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_overrides(args.addr, args.base_url, args.api_key);
    config.validate()?;

    let market = CoinCapClient::new(config.upstream.client_config())
        .context("building CoinCap client")?;
    let state = Arc::new(AppState::new(Arc::new(market)));

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    let app = server::apply_layers(app, &config.server);

    // Start the server
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, upstream = %config.upstream.base_url, "starting the server");

    server::serve(listener, app, &config.server, server::shutdown_signal())
        .await
        .context("server shutdown failed")?;

    info!(%addr, "stopped the server");
    Ok(())
}
