//! Conversation transcript routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use colloquy_core::ConversationId;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{ConversationMessagesResponse, ConversationToolCallsResponse};

async fn existing_conversation(state: &AppState, raw_id: String) -> ApiResult<ConversationId> {
    let conversation_id = ConversationId::new(raw_id)?;
    match state.store().get_conversation(&conversation_id).await? {
        Some(conversation) => Ok(conversation.id),
        None => Err(ApiError::conversation_not_found(&conversation_id)),
    }
}

/// GET /api/conversations/{id}/messages - Ordered transcript
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/conversations/{id}/messages",
    tag = "Conversations",
    params(("id" = String, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Messages in the order they were stored", body = ConversationMessagesResponse),
        (status = 404, description = "Conversation not found", body = ApiError),
    ),
))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let conversation_id = existing_conversation(&state, id).await?;
    let messages = state.store().list_messages(&conversation_id).await?;
    Ok(Json(ConversationMessagesResponse {
        conversation_id,
        messages,
    }))
}

/// GET /api/conversations/{id}/tool-calls - Tool call audit records
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/conversations/{id}/tool-calls",
    tag = "Conversations",
    params(("id" = String, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Tool calls in the order they ran", body = ConversationToolCallsResponse),
        (status = 404, description = "Conversation not found", body = ApiError),
    ),
))]
pub async fn list_tool_calls(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let conversation_id = existing_conversation(&state, id).await?;
    let tool_calls = state.store().list_tool_calls(&conversation_id).await?;
    Ok(Json(ConversationToolCallsResponse {
        conversation_id,
        tool_calls,
    }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/:id/messages", get(list_messages))
        .route("/:id/tool-calls", get(list_tool_calls))
        .with_state(state)
}
