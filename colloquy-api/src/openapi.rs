//! OpenAPI document for the Colloquy HTTP API.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{
    ComponentHealth, HealthDetails, HealthResponse, HealthStatus, ModelUsage,
};
use crate::routes::{chat, conversation, health, inventory};
use crate::types::*;
use colloquy_core::{ConversationId, Message, OutputSegment, Role, ToolCallRecord};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Colloquy API",
        description = "Streaming, tool-augmented assistant turns over a durable transcript",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:5000", description = "Local Development")
    ),
    tags(
        (name = "Chat", description = "Turns with the literary catalog assistant"),
        (name = "Conversations", description = "Stored transcripts and tool call audit records"),
        (name = "Inventory", description = "Inventory assistant and direct inventory management"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        chat::chat,
        chat::chat_stream,
        conversation::list_messages,
        conversation::list_tool_calls,
        inventory::query,
        inventory::initialize,
        inventory::list_items,
        inventory::get_item,
        inventory::create_item,
        inventory::update_item,
        inventory::record_transaction,
        inventory::analytics,
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        ChatRequest,
        ChatResponse,
        ChatStreamEvent,
        ConversationId,
        Message,
        OutputSegment,
        Role,
        ToolCallRecord,
        ConversationMessagesResponse,
        ConversationToolCallsResponse,
        InventoryFailure,
        InitializeResponse,
        ItemsResponse,
        ItemResponse,
        CreateItemRequest,
        CreateItemResponse,
        UpdateItemRequest,
        UpdateItemResponse,
        TransactionRequest,
        TransactionResponse,
        AnalyticsResponse,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
        ModelUsage,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/chat",
            "/api/chat/stream",
            "/api/conversations/{id}/messages",
            "/api/inventory/items/{id}",
            "/api/inventory/transactions",
            "/health/ready",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "{} missing from document",
                expected
            );
        }
    }
}
