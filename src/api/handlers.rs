//! API request handlers.

use crate::error::ApiError;
use crate::intents::IntentCommand;
use crate::models::{HealthResponse, WebhookRequest, WebhookResponse};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Fulfillment Webhook
// ============================================================================

/// Answers a fulfillment request for the `price`, `info` or `history` intent.
///
/// The body is read and decoded by hand so that an unreadable body or invalid
/// JSON is reported like every other failure: `500` with a plain-text message.
#[utoipa::path(
    post,
    path = "/webhook",
    request_body = WebhookRequest,
    responses(
        (status = 200, description = "Reply for the matched intent", body = WebhookResponse),
        (status = 500, description = "Request could not be answered", body = String, content_type = "text/plain")
    ),
    tag = "Webhook"
)]
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let body = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "failed to read webhook request body");
        ApiError::MalformedRequest(rejection.body_text())
    })?;
    let request: WebhookRequest = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "rejecting malformed webhook request");
        ApiError::MalformedRequest(err.to_string())
    })?;

    info!(
        session = %request.session,
        response_id = %request.response_id,
        intent = %request.query_result.intent.display_name,
        "received webhook request"
    );

    let reply = answer(&state, &request).await.inspect_err(|err| {
        warn!(
            response_id = %request.response_id,
            error = %err,
            "webhook request failed"
        );
    })?;

    debug!(response_id = %request.response_id, %reply, "sending reply");
    Ok(Json(WebhookResponse::text(reply)))
}

async fn answer(state: &AppState, request: &WebhookRequest) -> Result<String, ApiError> {
    let command = IntentCommand::from_query(&request.query_result)?;
    command.execute(state.market.as_ref()).await
}
