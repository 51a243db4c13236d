//! Chat Routes
//!
//! - POST /api/chat - one buffered turn with the catalog assistant
//! - POST /api/chat/stream - the same turn as server-sent events

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive},
    response::{IntoResponse, Sse},
    routing::post,
    Json, Router,
};
use colloquy_engine::AssistantProfile;
use futures_util::stream::StreamExt;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// Run a buffered turn, attaching the conversation id to any failure.
pub(crate) async fn buffered_turn(
    state: &AppState,
    profile: &AssistantProfile,
    request: ChatRequest,
) -> ApiResult<ChatResponse> {
    let turn = request.into_turn()?;
    let conversation_id = turn.conversation_id.clone();
    match state.assembler.respond(profile, turn).await {
        Ok(response) => Ok(response.into()),
        Err(e) => {
            let details = serde_json::json!({ "conversationId": conversation_id });
            Err(ApiError::from(e).with_details(details))
        }
    }
}

/// POST /api/chat - Buffered chat turn
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Missing message or invalid conversation id", body = ApiError),
        (status = 502, description = "Model provider failed", body = ApiError),
    ),
))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = buffered_turn(&state, &state.catalog_profile, request).await?;
    Ok(Json(response))
}

/// POST /api/chat/stream - Streamed chat turn
///
/// Each event's data is a JSON object, either `{chunk, speakable,
/// conversationId}` or a final `{error, conversationId}`. The stream closes
/// when the turn is complete.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/chat/stream",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream of turn output", content_type = "text/event-stream", body = crate::types::ChatStreamEvent),
        (status = 400, description = "Invalid conversation id", body = ApiError),
    ),
))]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let turn = request.into_turn()?;
    let events = state
        .assembler
        .stream_turn(state.catalog_profile.clone(), turn)
        .map(|event| Event::default().json_data(event));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(chat))
        .route("/stream", post(chat_stream))
        .with_state(state)
}
