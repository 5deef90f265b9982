//! Request and response models for the fulfillment webhook.
//!
//! These mirror the subset of Dialogflow's `WebhookRequest` and
//! `WebhookResponse` JSON the bot reads and writes. Unknown members are
//! ignored on decode.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;


// ============================================================================
// Webhook Request
// ============================================================================

/// Inbound fulfillment request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookRequest {
    /// Conversation session name.
    pub session: String,
    /// Unique id of this detect-intent response.
    pub response_id: String,
    /// Result of the conversational query.
    pub query_result: QueryResult,
}

/// Matched intent and the parameters extracted from the user's utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    /// Matched intent.
    pub intent: Intent,
    /// Action name configured on the intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Parameter name to value.
    pub parameters: HashMap<String, String>,
}

/// Matched intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Intent {
    /// Intent name as shown in the agent console; used for dispatch.
    pub display_name: String,
}

// ============================================================================
// Webhook Response
// ============================================================================

/// Outbound fulfillment response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// Messages shown to the end user.
    pub fulfillment_messages: Vec<FulfillmentMessage>,
}

/// One fulfillment message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FulfillmentMessage {
    /// Text payload.
    pub text: MessageText,
}

/// Text payload of a fulfillment message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageText {
    /// Lines of text.
    pub text: Vec<String>,
}

impl WebhookResponse {
    /// Builds a response with a single message holding a single line.
    pub fn text(line: impl Into<String>) -> Self {
        Self {
            fulfillment_messages: vec![FulfillmentMessage {
                text: MessageText {
                    text: vec![line.into()],
                },
            }],
        }
    }

    /// First line of the first message, if any.
    #[cfg(test)]
    pub(crate) fn first_line(&self) -> Option<&str> {
        self.fulfillment_messages
            .first()
            .and_then(|message| message.text.text.first())
            .map(String::as_str)
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}
