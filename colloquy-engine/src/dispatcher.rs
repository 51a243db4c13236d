//! Tool dispatcher
//!
//! Executes one decoded invocation: resolves the tool, runs it with faults
//! and panics contained, records the call, then formats the result. Only a
//! failure to write the audit record escapes as an error.

use colloquy_core::{
    ColloquyResult, ConversationId, MessageId, OutputSegment, ToolError, ToolInvocation,
};
use colloquy_storage::TranscriptStore;
use colloquy_tools::{ToolLookup, ToolRegistry};
use futures_util::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Where an invocation came from.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    pub conversation_id: &'a ConversationId,
    /// The user message whose turn triggered the invocation.
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The tool ran and reported `success: true`.
    Completed,
    /// The tool ran and reported `success: false`.
    DomainFailure,
    /// The tool errored or panicked.
    Fault,
    /// No tool of that name is registered.
    UnknownTool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub tool_name: String,
    pub status: DispatchStatus,
    pub segments: Vec<OutputSegment>,
}

impl DispatchOutcome {
    /// Whether the tool was actually invoked.
    pub fn invoked(&self) -> bool {
        self.status != DispatchStatus::UnknownTool
    }
}

#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    store: Arc<dyn TranscriptStore>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, store: Arc<dyn TranscriptStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        ctx: &DispatchContext<'_>,
    ) -> ColloquyResult<DispatchOutcome> {
        let tool = match self.registry.lookup(&invocation.name) {
            ToolLookup::Found(tool) => tool,
            ToolLookup::Unknown { name } => {
                tracing::warn!(
                    conversation_id = %ctx.conversation_id,
                    tool = %name,
                    "model requested an unregistered tool"
                );
                return Ok(DispatchOutcome {
                    segments: vec![OutputSegment::display(format!(
                        "\n\nI tried to use a tool that isn't available ({}). Please contact support.\n\n",
                        name
                    ))],
                    tool_name: name,
                    status: DispatchStatus::UnknownTool,
                });
            }
        };

        let tool_name = invocation.name.clone();
        let input_json = invocation.input.to_string();
        tracing::info!(
            conversation_id = %ctx.conversation_id,
            message_id = ctx.message_id,
            tool = %tool_name,
            "invoking tool"
        );

        let invoked = AssertUnwindSafe(tool.invoke_json(invocation.input.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ToolError::Panicked {
                    tool: tool_name.clone(),
                    reason: panic_message(panic.as_ref()),
                })
            });

        match invoked {
            Ok(outcome) => {
                let succeeded = outcome
                    .result()
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                self.record(ctx, &tool_name, &input_json, outcome.result())
                    .await?;

                let formatted = std::panic::catch_unwind(AssertUnwindSafe(|| outcome.format()));
                match formatted {
                    Ok(segments) => Ok(DispatchOutcome {
                        tool_name,
                        status: if succeeded {
                            DispatchStatus::Completed
                        } else {
                            DispatchStatus::DomainFailure
                        },
                        segments,
                    }),
                    Err(panic) => {
                        let reason = panic_message(panic.as_ref());
                        tracing::error!(tool = %tool_name, reason = %reason, "tool formatter panicked");
                        Ok(fault_outcome(tool_name, &reason))
                    }
                }
            }
            Err(e) => {
                let reason = fault_reason(&e);
                tracing::error!(
                    conversation_id = %ctx.conversation_id,
                    tool = %tool_name,
                    error = %e,
                    "tool invocation failed"
                );
                let result = json!({ "success": false, "error": reason });
                self.record(ctx, &tool_name, &input_json, &result).await?;
                Ok(fault_outcome(tool_name, &reason))
            }
        }
    }

    async fn record(
        &self,
        ctx: &DispatchContext<'_>,
        tool_name: &str,
        input_json: &str,
        result: &Value,
    ) -> ColloquyResult<()> {
        let tool_call_id = self
            .store
            .append_tool_call(
                ctx.conversation_id,
                ctx.message_id,
                tool_name,
                input_json,
                &result.to_string(),
            )
            .await?;
        tracing::debug!(tool_call_id, tool = tool_name, "tool call recorded");
        Ok(())
    }
}

fn fault_outcome(tool_name: String, reason: &str) -> DispatchOutcome {
    DispatchOutcome {
        segments: vec![OutputSegment::display(format!(
            "\n\nI encountered an error while trying to use the {} tool: {}\n\n",
            tool_name, reason
        ))],
        tool_name,
        status: DispatchStatus::Fault,
    }
}

fn fault_reason(error: &ToolError) -> String {
    match error {
        ToolError::InvalidInput { reason, .. }
        | ToolError::Failed { reason, .. }
        | ToolError::Panicked { reason, .. } => reason.clone(),
        ToolError::DuplicateRegistration { .. } => error.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_storage::InMemoryTranscriptStore;
    use colloquy_test_utils::fixtures::seeded_inventory;
    use colloquy_tools::{inventory_registry, InputSchema, Tool, ToolId, ToolSpec};
    use colloquy_core::Role;
    use serde::Deserialize;

    struct Setup {
        store: Arc<InMemoryTranscriptStore>,
        dispatcher: ToolDispatcher,
        conversation_id: ConversationId,
        message_id: MessageId,
    }

    async fn setup(registry: ToolRegistry) -> Setup {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let conversation_id = ConversationId::generate();
        let message_id = store
            .append_message(&conversation_id, Role::User, "hello")
            .await
            .expect("append user message");
        let dispatcher = ToolDispatcher::new(Arc::new(registry), store.clone());
        Setup {
            store,
            dispatcher,
            conversation_id,
            message_id,
        }
    }

    fn invocation(name: &str, input: Value) -> ToolInvocation {
        ToolInvocation {
            id: "toolu_test".to_string(),
            name: name.to_string(),
            input,
        }
    }

    impl Setup {
        async fn dispatch(&self, name: &str, input: Value) -> DispatchOutcome {
            let ctx = DispatchContext {
                conversation_id: &self.conversation_id,
                message_id: self.message_id,
            };
            self.dispatcher
                .dispatch(&invocation(name, input), &ctx)
                .await
                .expect("dispatch should not fail")
        }
    }

    /// Panics on every call; stands in for a buggy handler.
    struct Exploding;

    #[derive(Deserialize)]
    struct Nothing {}

    #[async_trait]
    impl Tool for Exploding {
        type Input = Nothing;
        type Output = Value;

        fn spec(&self) -> ToolSpec {
            ToolSpec {
                id: ToolId::InventoryAnalytics,
                description: "explodes",
                input_schema: InputSchema::new(),
            }
        }

        async fn invoke(&self, _input: Nothing) -> Result<Value, ToolError> {
            panic!("ledger corrupted")
        }

        fn format(_output: &Value) -> Vec<OutputSegment> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_explained_and_not_recorded() {
        let s = setup(ToolRegistry::new()).await;
        let outcome = s.dispatch("summon_dragon", json!({})).await;

        assert_eq!(outcome.status, DispatchStatus::UnknownTool);
        assert!(!outcome.invoked());
        assert_eq!(outcome.segments.len(), 1);
        assert!(!outcome.segments[0].speakable);
        assert!(outcome.segments[0].text.contains("summon_dragon"));
        assert_eq!(s.store.tool_call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_is_recorded_against_the_user_message() {
        let s = setup(inventory_registry(seeded_inventory()).expect("registry")).await;
        let outcome = s.dispatch("list_items", json!({"category": "books"})).await;

        assert_eq!(outcome.status, DispatchStatus::Completed);
        assert_eq!(outcome.segments.len(), 4);

        let calls = s
            .store
            .list_tool_calls(&s.conversation_id)
            .await
            .expect("list tool calls");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].message_id, s.message_id);
        assert_eq!(calls[0].tool_name, "list_items");
        assert_eq!(calls[0].input().expect("input json"), json!({"category": "books"}));
        assert!(calls[0].succeeded());
    }

    #[tokio::test]
    async fn test_domain_failure_is_recorded_and_formatted() {
        let s = setup(inventory_registry(seeded_inventory()).expect("registry")).await;
        let outcome = s
            .dispatch(
                "record_transaction",
                json!({"item_name": "Santiniketan Art Print", "transaction_type": "sale", "quantity": 11}),
            )
            .await;

        assert_eq!(outcome.status, DispatchStatus::DomainFailure);
        assert!(outcome.segments[0]
            .text
            .contains("Insufficient stock: 10 available, 11 requested"));

        let calls = s.store.list_tool_calls(&s.conversation_id).await.expect("calls");
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].succeeded());
    }

    #[tokio::test]
    async fn test_mistyped_input_is_a_recorded_fault() {
        let s = setup(inventory_registry(seeded_inventory()).expect("registry")).await;
        let outcome = s
            .dispatch("record_transaction", json!({"item_id": 1, "quantity": "many"}))
            .await;

        assert_eq!(outcome.status, DispatchStatus::Fault);
        assert!(!outcome.segments[0].speakable);
        assert!(outcome.segments[0]
            .text
            .starts_with("\n\nI encountered an error while trying to use the record_transaction tool: "));

        let calls = s.store.list_tool_calls(&s.conversation_id).await.expect("calls");
        assert_eq!(calls.len(), 1);
        let result = calls[0].result().expect("result json");
        assert_eq!(result["success"], false);
        assert!(result["error"].is_string());
    }

    #[tokio::test]
    async fn test_panicking_tool_is_contained() {
        let registry = ToolRegistry::new().with(Exploding).expect("registry");
        let s = setup(registry).await;
        let outcome = s.dispatch("inventory_analytics", json!({})).await;

        assert_eq!(outcome.status, DispatchStatus::Fault);
        assert!(outcome.segments[0].text.contains("ledger corrupted"));
        let calls = s.store.list_tool_calls(&s.conversation_id).await.expect("calls");
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].succeeded());
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&7u8), "unknown panic");
    }
}
