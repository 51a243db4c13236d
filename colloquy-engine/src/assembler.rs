//! Response assembler
//!
//! Drives one turn end to end. The user message is stored first, the model
//! is called with the profile's history and tools, model text and tool
//! output are forwarded as they become available, and the assistant message
//! is stored only once the model stream completes cleanly.

use crate::decoder::decode_stream;
use crate::dispatcher::{DispatchContext, ToolDispatcher};
use crate::history::build_history;
use crate::profile::{AssistantProfile, HistoryMode};
use crate::turn::{TurnAccumulator, TurnEvent, TurnRequest, TurnResponse, TurnState};
use colloquy_core::{
    ColloquyResult, ConversationId, EngineConfig, MessageId, Role, StreamEvent, ToolInvocation,
    ValidationError,
};
use colloquy_llm::{ChatMessage, ContentBlock, ModelProvider, ModelRequest};
use colloquy_storage::TranscriptStore;
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Arc;

#[derive(Clone)]
pub struct ResponseAssembler {
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn TranscriptStore>,
    config: EngineConfig,
}

impl std::fmt::Debug for ResponseAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseAssembler")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResponseAssembler {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn TranscriptStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    /// Store the user message and build the model request for this turn.
    async fn prepare(
        &self,
        profile: &AssistantProfile,
        conversation_id: &ConversationId,
        message: &str,
    ) -> ColloquyResult<(MessageId, ModelRequest)> {
        if message.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "message".to_string(),
            }
            .into());
        }

        let message_id = self
            .store
            .append_message(conversation_id, Role::User, message)
            .await?;

        let messages = match profile.history_mode {
            HistoryMode::Full => build_history(&self.store.list_messages(conversation_id).await?),
            HistoryMode::CurrentMessageOnly => vec![ChatMessage::user(message)],
        };

        tracing::info!(
            conversation_id = %conversation_id,
            message_id,
            profile = profile.name,
            history_len = messages.len(),
            "turn started"
        );

        let request = ModelRequest {
            model: self.config.model.clone(),
            system: Some(profile.system_prompt.clone()),
            messages,
            tools: profile.tool_definitions(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        Ok((message_id, request))
    }

    /// Run a turn, streaming segments to the caller as they are produced.
    ///
    /// The stream ends after the assistant message is stored, or after a
    /// single error event. Dropping it abandons the turn without storing an
    /// assistant message.
    pub fn stream_turn(
        &self,
        profile: AssistantProfile,
        request: TurnRequest,
    ) -> BoxStream<'static, TurnEvent> {
        let this = self.clone();
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(ConversationId::generate);

        Box::pin(async_stream::stream! {
            let mut acc = TurnAccumulator::new();

            let opened = match this.prepare(&profile, &conversation_id, &request.message).await {
                Ok((message_id, model_request)) => this
                    .provider
                    .stream(&model_request)
                    .await
                    .map(|raw| (message_id, decode_stream(raw, this.config.stream_idle_timeout))),
                Err(e) => Err(e),
            };
            let (message_id, mut events) = match opened {
                Ok(opened) => opened,
                Err(e) => {
                    acc.advance(TurnState::Failed);
                    tracing::error!(conversation_id = %conversation_id, error = %e, "turn could not start");
                    yield TurnEvent::error(e.to_string(), &conversation_id);
                    return;
                }
            };

            let dispatcher = ToolDispatcher::new(Arc::clone(&profile.registry), Arc::clone(&this.store));
            acc.advance(TurnState::Streaming);

            while let Some(event) = events.next().await {
                match event {
                    StreamEvent::TextDelta(text) => {
                        let segment = acc.push_text(&text);
                        yield TurnEvent::chunk(segment, &conversation_id);
                    }

                    StreamEvent::ToolInvocationStart { id, name } => {
                        tracing::debug!(conversation_id = %conversation_id, tool_use_id = %id, tool = %name, "tool input streaming");
                    }

                    StreamEvent::ToolInvocationReady(invocation) => {
                        acc.advance(TurnState::ToolPending);
                        let ctx = DispatchContext {
                            conversation_id: &conversation_id,
                            message_id,
                        };
                        match dispatcher.dispatch(&invocation, &ctx).await {
                            Ok(outcome) => {
                                for segment in outcome.segments {
                                    acc.push_tool_segment(&segment);
                                    yield TurnEvent::chunk(segment, &conversation_id);
                                }
                                acc.note_tool(&outcome.tool_name, profile.annotation(&outcome.tool_name));
                                acc.advance(TurnState::Streaming);
                            }
                            Err(e) => {
                                acc.advance(TurnState::Failed);
                                tracing::error!(conversation_id = %conversation_id, tool = %invocation.name, error = %e, "tool call could not be recorded");
                                yield TurnEvent::error(e.to_string(), &conversation_id);
                                break;
                            }
                        }
                    }

                    StreamEvent::Done => {
                        acc.advance(TurnState::Draining);
                        let stored = this
                            .store
                            .append_message(&conversation_id, Role::Assistant, acc.history_text())
                            .await;
                        match stored {
                            Ok(assistant_id) => {
                                acc.advance(TurnState::Done);
                                tracing::info!(
                                    conversation_id = %conversation_id,
                                    message_id = assistant_id,
                                    tools_used = acc.tools_used().len(),
                                    "turn completed"
                                );
                            }
                            Err(e) => {
                                acc.advance(TurnState::Failed);
                                tracing::error!(conversation_id = %conversation_id, error = %e, "assistant message not stored");
                                yield TurnEvent::error(e.to_string(), &conversation_id);
                            }
                        }
                        break;
                    }

                    StreamEvent::Error(message) => {
                        acc.advance(TurnState::Failed);
                        tracing::warn!(conversation_id = %conversation_id, error = %message, "turn aborted by model stream");
                        yield TurnEvent::error(message, &conversation_id);
                        break;
                    }
                }
            }

            if !acc.state().is_terminal() {
                acc.advance(TurnState::Failed);
                yield TurnEvent::error("Model stream ended without completing", &conversation_id);
            }
        })
    }

    /// Run a turn with a single complete model response.
    ///
    /// Content blocks are processed in order with the same dispatch and
    /// accumulation rules as the streaming path. Errors leave no assistant
    /// message behind.
    pub async fn respond(
        &self,
        profile: &AssistantProfile,
        request: TurnRequest,
    ) -> ColloquyResult<TurnResponse> {
        let conversation_id = request
            .conversation_id
            .unwrap_or_else(ConversationId::generate);
        let (message_id, model_request) = self
            .prepare(profile, &conversation_id, &request.message)
            .await?;

        let response = self.provider.complete(&model_request).await?;
        let dispatcher = ToolDispatcher::new(Arc::clone(&profile.registry), Arc::clone(&self.store));
        let ctx = DispatchContext {
            conversation_id: &conversation_id,
            message_id,
        };

        let mut acc = TurnAccumulator::new();
        acc.advance(TurnState::Streaming);
        for block in response.content {
            match block {
                ContentBlock::Text { text } => {
                    if !text.is_empty() {
                        acc.push_text(&text);
                    }
                }
                ContentBlock::ToolUse { id, name, input } => {
                    acc.advance(TurnState::ToolPending);
                    let invocation = ToolInvocation { id, name, input };
                    let outcome = dispatcher.dispatch(&invocation, &ctx).await?;
                    for segment in &outcome.segments {
                        acc.push_tool_segment(segment);
                    }
                    acc.note_tool(&outcome.tool_name, profile.annotation(&outcome.tool_name));
                    acc.advance(TurnState::Streaming);
                }
                ContentBlock::Other => {}
            }
        }

        acc.advance(TurnState::Draining);
        let assistant_id = self
            .store
            .append_message(&conversation_id, Role::Assistant, acc.history_text())
            .await?;
        acc.advance(TurnState::Done);
        tracing::info!(
            conversation_id = %conversation_id,
            message_id = assistant_id,
            tools_used = acc.tools_used().len(),
            "turn completed"
        );

        Ok(acc.into_response(conversation_id))
    }
}
