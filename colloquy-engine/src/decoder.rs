//! Stream decoder
//!
//! Reduces the provider's raw event vocabulary to [`StreamEvent`]s. Text is
//! forwarded delta by delta. Tool-use input arrives as JSON fragments keyed
//! by content block index and is only released once its block closes.

use colloquy_core::{StreamEvent, ToolInvocation};
use colloquy_llm::{BlockDelta, RawEventStream, RawStreamEvent, StartBlock};
use futures_util::stream::{BoxStream, StreamExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the accumulated input of one tool-use block.
pub const MAX_TOOL_INPUT_BYTES: usize = 1 << 20;

/// Reasons a model stream is abandoned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Model stream error ({kind}): {message}")]
    Upstream { kind: String, message: String },

    #[error("Malformed input for tool {tool}: {reason}")]
    MalformedToolInput { tool: String, reason: String },

    #[error("Input for tool {tool} exceeds {limit} bytes")]
    ToolInputTooLarge { tool: String, limit: usize },

    #[error("Model stream ended inside the input of tool {tool}")]
    UnterminatedToolBlock { tool: String },

    #[error("Model stream protocol violation: {0}")]
    Protocol(String),

    #[error("Model stream transport failure: {0}")]
    Transport(String),

    #[error("No model stream event within {0:?}")]
    IdleTimeout(Duration),
}

#[derive(Debug)]
struct ToolBlock {
    id: String,
    name: String,
    initial_input: Value,
    buffer: String,
}

impl ToolBlock {
    fn into_invocation(self) -> Result<ToolInvocation, DecodeError> {
        let input = if self.buffer.trim().is_empty() {
            match self.initial_input {
                Value::Null => Value::Object(Map::new()),
                other => other,
            }
        } else {
            serde_json::from_str(&self.buffer).map_err(|e| DecodeError::MalformedToolInput {
                tool: self.name.clone(),
                reason: e.to_string(),
            })?
        };

        if !input.is_object() {
            return Err(DecodeError::MalformedToolInput {
                tool: self.name,
                reason: "input is not a JSON object".to_string(),
            });
        }

        Ok(ToolInvocation {
            id: self.id,
            name: self.name,
            input,
        })
    }
}

/// Incremental decoder state for one model response.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    blocks: HashMap<usize, ToolBlock>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `message_stop` has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one raw event.
    ///
    /// Returns the stream event it completes, if any. An error means the
    /// stream must be abandoned.
    pub fn decode(&mut self, event: RawStreamEvent) -> Result<Option<StreamEvent>, DecodeError> {
        match event {
            RawStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                StartBlock::ToolUse { id, name, input } => {
                    if self.blocks.contains_key(&index) {
                        return Err(DecodeError::Protocol(format!(
                            "content block {} started twice",
                            index
                        )));
                    }
                    tracing::debug!(index, tool = %name, "tool block opened");
                    self.blocks.insert(
                        index,
                        ToolBlock {
                            id: id.clone(),
                            name: name.clone(),
                            initial_input: input,
                            buffer: String::new(),
                        },
                    );
                    Ok(Some(StreamEvent::ToolInvocationStart { id, name }))
                }
                StartBlock::Text { text } => Ok(text_event(text)),
                StartBlock::Other => Ok(None),
            },

            RawStreamEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => Ok(text_event(text)),
                BlockDelta::InputJsonDelta { partial_json } => {
                    let block = self.blocks.get_mut(&index).ok_or_else(|| {
                        DecodeError::Protocol(format!(
                            "input fragment for unopened block {}",
                            index
                        ))
                    })?;
                    if block.buffer.len() + partial_json.len() > MAX_TOOL_INPUT_BYTES {
                        return Err(DecodeError::ToolInputTooLarge {
                            tool: block.name.clone(),
                            limit: MAX_TOOL_INPUT_BYTES,
                        });
                    }
                    block.buffer.push_str(&partial_json);
                    Ok(None)
                }
                BlockDelta::Other => Ok(None),
            },

            RawStreamEvent::ContentBlockStop { index } => match self.blocks.remove(&index) {
                Some(block) => {
                    let invocation = block.into_invocation()?;
                    Ok(Some(StreamEvent::ToolInvocationReady(invocation)))
                }
                None => Ok(None),
            },

            RawStreamEvent::MessageStop => {
                self.finished = true;
                Ok(None)
            }

            RawStreamEvent::Error { error } => Err(DecodeError::Upstream {
                kind: error.error_type,
                message: error.message,
            }),

            RawStreamEvent::MessageStart { .. }
            | RawStreamEvent::MessageDelta { .. }
            | RawStreamEvent::Ping
            | RawStreamEvent::Unknown => Ok(None),
        }
    }

    /// Close the decoder once the source is exhausted.
    pub fn finish(&mut self) -> Result<StreamEvent, DecodeError> {
        if let Some(block) = self.blocks.values().next() {
            return Err(DecodeError::UnterminatedToolBlock {
                tool: block.name.clone(),
            });
        }
        Ok(StreamEvent::Done)
    }
}

fn text_event(text: String) -> Option<StreamEvent> {
    if text.is_empty() {
        None
    } else {
        Some(StreamEvent::TextDelta(text))
    }
}

/// Decode a live provider stream.
///
/// The returned stream always ends with exactly one terminal event: `Done`
/// when the source completes cleanly, `Error` otherwise. Waiting longer than
/// `idle_timeout` for the next raw event counts as an error.
pub fn decode_stream(
    mut raw: RawEventStream,
    idle_timeout: Duration,
) -> BoxStream<'static, StreamEvent> {
    Box::pin(async_stream::stream! {
        let mut decoder = StreamDecoder::new();

        let outcome: Result<(), DecodeError> = loop {
            let next = match tokio::time::timeout(idle_timeout, raw.next()).await {
                Ok(next) => next,
                Err(_) => break Err(DecodeError::IdleTimeout(idle_timeout)),
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => break Err(DecodeError::Transport(e.to_string())),
                None => break Ok(()),
            };

            match decoder.decode(event) {
                Ok(Some(decoded)) => yield decoded,
                Ok(None) => {}
                Err(e) => break Err(e),
            }

            if decoder.is_finished() {
                break Ok(());
            }
        };

        match outcome.and_then(|()| decoder.finish()) {
            Ok(done) => yield done,
            Err(e) => {
                tracing::warn!(error = %e, "model stream abandoned");
                yield StreamEvent::Error(e.to_string());
            }
        }
    })
}
