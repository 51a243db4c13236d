//! Colloquy Test Utilities
//!
//! Shared test infrastructure for the Colloquy workspace:
//! - A scripted model provider that replays canned responses
//! - Builders for raw provider stream events
//! - Proptest generators for deltas, fragmented tool input and ids
//! - Fixtures for the catalog and inventory stores

// Re-export in-memory storage from its source crate
pub use colloquy_storage::{InMemoryTranscriptStore, TranscriptStore};

pub use colloquy_core::{
    ColloquyError, ColloquyResult, ConversationId, LlmError, Message, OutputSegment, Role,
    StreamEvent, ToolCallRecord, ToolInvocation,
};
pub use colloquy_llm::{
    ContentBlock, MessageResponse, ModelProvider, ModelRequest, RawEventStream, RawStreamEvent,
};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

// ============================================================================
// SCRIPTED MODEL PROVIDER
// ============================================================================

/// One canned provider reply.
#[derive(Debug, Clone)]
pub enum Script {
    /// Complete content blocks. Streams as the equivalent event sequence.
    Blocks(Vec<ContentBlock>),
    /// Raw stream items, replayed verbatim.
    Events(Vec<ColloquyResult<RawStreamEvent>>),
    /// Raw events followed by a source that never yields again.
    Stall(Vec<RawStreamEvent>),
    /// The request itself fails.
    Fail(LlmError),
}

/// Model provider that answers requests from a queue of scripts.
///
/// Every request is recorded so tests can inspect the history and tools the
/// engine sent.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, script: Script) -> Self {
        self.push(script);
        self
    }

    pub fn push(&self, script: Script) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(script);
    }

    /// Queue a plain text answer streamed as the given deltas.
    pub fn push_text(&self, deltas: &[&str]) {
        self.push(Script::Events(
            events::message(vec![events::text_block(0, deltas)])
                .into_iter()
                .map(Ok)
                .collect(),
        ));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_script(&self, request: &ModelRequest) -> ColloquyResult<Script> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| {
                LlmError::InvalidResponse {
                    provider: "scripted".to_string(),
                    reason: "no script left".to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> ColloquyResult<MessageResponse> {
        match self.next_script(request)? {
            Script::Blocks(content) => Ok(response(content)),
            Script::Fail(e) => Err(e.into()),
            Script::Events(_) | Script::Stall(_) => Err(LlmError::InvalidResponse {
                provider: "scripted".to_string(),
                reason: "stream script used for a complete request".to_string(),
            }
            .into()),
        }
    }

    async fn stream(&self, request: &ModelRequest) -> ColloquyResult<RawEventStream> {
        match self.next_script(request)? {
            Script::Blocks(content) => {
                let raw = events::from_blocks(&content).into_iter().map(Ok);
                Ok(Box::pin(stream::iter(raw.collect::<Vec<_>>())))
            }
            Script::Events(items) => Ok(Box::pin(stream::iter(items))),
            Script::Stall(items) => {
                let raw: Vec<ColloquyResult<RawStreamEvent>> = items.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(raw).chain(stream::pending())))
            }
            Script::Fail(e) => Err(e.into()),
        }
    }
}

/// Wrap content blocks in a complete response.
pub fn response(content: Vec<ContentBlock>) -> MessageResponse {
    let stop_reason = if content
        .iter()
        .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    {
        "tool_use"
    } else {
        "end_turn"
    };
    MessageResponse {
        id: "msg_scripted".to_string(),
        content,
        model: "scripted-model".to_string(),
        role: "assistant".to_string(),
        stop_reason: Some(stop_reason.to_string()),
        usage: Default::default(),
    }
}

// ============================================================================
// RAW EVENT BUILDERS
// ============================================================================

pub mod events {
    //! Builders for Anthropic-style raw stream events.

    use colloquy_llm::{
        BlockDelta, ContentBlock, ErrorDetail, MessageDeltaBody, RawStreamEvent, StartBlock,
        StreamMessage, Usage,
    };
    use serde_json::json;

    pub fn message_start() -> RawStreamEvent {
        RawStreamEvent::MessageStart {
            message: StreamMessage {
                id: "msg_scripted".to_string(),
                usage: Usage {
                    input_tokens: 12,
                    output_tokens: 1,
                },
            },
        }
    }

    pub fn message_delta(stop_reason: &str) -> RawStreamEvent {
        RawStreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some(stop_reason.to_string()),
            },
            usage: Some(Usage {
                input_tokens: 0,
                output_tokens: 8,
            }),
        }
    }

    pub fn message_stop() -> RawStreamEvent {
        RawStreamEvent::MessageStop
    }

    pub fn ping() -> RawStreamEvent {
        RawStreamEvent::Ping
    }

    pub fn error_event(kind: &str, message: &str) -> RawStreamEvent {
        RawStreamEvent::Error {
            error: ErrorDetail {
                message: message.to_string(),
                error_type: kind.to_string(),
            },
        }
    }

    /// A text block: start, one delta per entry, stop.
    pub fn text_block(index: usize, deltas: &[&str]) -> Vec<RawStreamEvent> {
        let mut events = vec![RawStreamEvent::ContentBlockStart {
            index,
            content_block: StartBlock::Text {
                text: String::new(),
            },
        }];
        events.extend(deltas.iter().map(|text| RawStreamEvent::ContentBlockDelta {
            index,
            delta: BlockDelta::TextDelta {
                text: text.to_string(),
            },
        }));
        events.push(RawStreamEvent::ContentBlockStop { index });
        events
    }

    /// A tool-use block whose input arrives as the given JSON fragments.
    pub fn tool_use_block(
        index: usize,
        id: &str,
        name: &str,
        fragments: &[&str],
    ) -> Vec<RawStreamEvent> {
        let mut events = vec![RawStreamEvent::ContentBlockStart {
            index,
            content_block: StartBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: json!({}),
            },
        }];
        events.extend(fragments.iter().map(|fragment| RawStreamEvent::ContentBlockDelta {
            index,
            delta: BlockDelta::InputJsonDelta {
                partial_json: fragment.to_string(),
            },
        }));
        events.push(RawStreamEvent::ContentBlockStop { index });
        events
    }

    /// A whole message around the given blocks.
    pub fn message(blocks: Vec<Vec<RawStreamEvent>>) -> Vec<RawStreamEvent> {
        let uses_tool = blocks.iter().flatten().any(|event| {
            matches!(
                event,
                RawStreamEvent::ContentBlockStart {
                    content_block: StartBlock::ToolUse { .. },
                    ..
                }
            )
        });
        let mut events = vec![message_start(), ping()];
        events.extend(blocks.into_iter().flatten());
        events.push(message_delta(if uses_tool { "tool_use" } else { "end_turn" }));
        events.push(message_stop());
        events
    }

    /// The stream a provider would send for these complete blocks.
    pub fn from_blocks(content: &[ContentBlock]) -> Vec<RawStreamEvent> {
        let blocks = content
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match block {
                ContentBlock::Text { text } => Some(text_block(index, &[text.as_str()])),
                ContentBlock::ToolUse { id, name, input } => Some(tool_use_block(
                    index,
                    id,
                    name,
                    &[input.to_string().as_str()],
                )),
                ContentBlock::Other => None,
            })
            .collect();
        message(blocks)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for engine inputs.

    use colloquy_core::ConversationId;
    use proptest::prelude::*;

    /// Text deltas as a model emits them, possibly empty.
    pub fn arb_text_deltas() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-zA-Z0-9 ,.!?'\n]{0,16}", 1..12)
    }

    /// Caller-supplied conversation ids.
    pub fn arb_conversation_id() -> impl Strategy<Value = ConversationId> {
        "[a-zA-Z0-9_-]{1,40}".prop_filter_map("valid conversation id", |raw| {
            ConversationId::new(raw).ok()
        })
    }

    /// Split `json` into fragments at arbitrary char boundaries.
    pub fn arb_fragmented(json: String) -> impl Strategy<Value = Vec<String>> {
        let len = json.chars().count();
        prop::collection::vec(0..=len, 0..6).prop_map(move |mut cuts| {
            cuts.sort_unstable();
            cuts.dedup();
            let chars: Vec<char> = json.chars().collect();
            let mut fragments: Vec<String> = Vec::with_capacity(cuts.len() + 1);
            let mut start = 0;
            for cut in cuts.into_iter().chain(std::iter::once(len)) {
                fragments.push(chars[start..cut].iter().collect());
                start = cut;
            }
            fragments
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores for common testing scenarios.

    use colloquy_tools::catalog::{InMemoryCatalog, Work, WorkCategory, WorkPart};
    use colloquy_tools::inventory::{InventoryStore, NewItem};

    fn part(part_number: u32, content: &str) -> WorkPart {
        WorkPart {
            part_number,
            content: content.to_string(),
        }
    }

    /// Three works: a multi-part poem, a story and an essay.
    pub fn sample_catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_works(vec![
            Work {
                id: 1,
                title: "Gitanjali".to_string(),
                category: WorkCategory::Poem,
                date_created: Some("1910".to_string()),
                parts: vec![
                    part(1, "Thou hast made me endless, such is thy pleasure."),
                    part(35, "Where the mind is without fear and the head is held high"),
                ],
            },
            Work {
                id: 2,
                title: "Kabuliwala".to_string(),
                category: WorkCategory::ShortStories,
                date_created: Some("1892".to_string()),
                parts: vec![part(1, "My five years' old daughter Mini cannot live without chattering.")],
            },
            Work {
                id: 3,
                title: "Nationalism in India".to_string(),
                category: WorkCategory::Essay,
                date_created: Some("1917".to_string()),
                parts: vec![part(1, "Our real problem in India is not political. It is social.")],
            },
        ])
    }

    /// Inventory holding exactly two books.
    pub fn two_book_inventory() -> InventoryStore {
        let store = InventoryStore::new();
        for (name, price, stock) in [("Gitanjali", 12.99, 30), ("The Home and the World", 14.99, 20)] {
            let created = store.create(NewItem {
                name: name.to_string(),
                category: "books".to_string(),
                price,
                stock,
                description: String::new(),
            });
            if let Err(e) = created {
                panic!("fixture item {} rejected: {}", name, e);
            }
        }
        store
    }

    /// The demo inventory with its sample transactions applied.
    pub fn seeded_inventory() -> InventoryStore {
        let store = InventoryStore::new();
        store.seed_sample_inventory();
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request() -> ModelRequest {
        ModelRequest {
            model: "scripted-model".to_string(),
            system: None,
            messages: vec![],
            tools: vec![],
            max_tokens: 100,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_scripts_are_consumed_in_order() {
        let model = ScriptedModel::new()
            .with_script(Script::Blocks(vec![ContentBlock::Text {
                text: "first".to_string(),
            }]))
            .with_script(Script::Fail(LlmError::RateLimited {
                provider: "scripted".to_string(),
            }));

        let first = model.complete(&request()).await.expect("first script");
        assert_eq!(first.stop_reason.as_deref(), Some("end_turn"));
        assert!(model.complete(&request()).await.is_err());
        assert!(model.complete(&request()).await.is_err());
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_blocks_stream_as_events() {
        let model = ScriptedModel::new().with_script(Script::Blocks(vec![ContentBlock::ToolUse {
            id: "toolu_1".to_string(),
            name: "list_items".to_string(),
            input: serde_json::json!({"category": "books"}),
        }]));
        let events: Vec<_> = model
            .stream(&request())
            .await
            .expect("stream script")
            .collect()
            .await;
        assert!(events.iter().all(Result::is_ok));
        assert!(matches!(events.last(), Some(Ok(RawStreamEvent::MessageStop))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_fragments_rejoin(
            fragments in generators::arb_fragmented("{\"item_name\":\"Gitanjali\",\"quantity\":3}".to_string())
        ) {
            prop_assert_eq!(fragments.concat(), "{\"item_name\":\"Gitanjali\",\"quantity\":3}");
        }
    }
}
