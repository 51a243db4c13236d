//! Colloquy Storage - Transcript Store
//!
//! The transcript is append-only: conversations are created idempotently,
//! messages and tool calls are never rewritten. Two implementations ship
//! here, an in-memory store for tests and single-process demos and an
//! LMDB-backed store for durable deployments.

pub mod config;
pub mod lmdb_store;
pub mod transcript_key;

pub use config::StorageConfig;
pub use lmdb_store::{LmdbStoreError, LmdbTranscriptStore};
pub use transcript_key::{RecordKind, TranscriptKey};

use async_trait::async_trait;
use chrono::Utc;
use colloquy_core::{
    ColloquyResult, Conversation, ConversationId, Message, MessageId, Role, StorageError,
    ToolCallId, ToolCallRecord,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// TRANSCRIPT STORE TRAIT
// ============================================================================

/// Durable record of conversations, messages and tool calls.
///
/// Implementations must keep message ids monotonic across the whole store so
/// that ordering by id equals insertion order, even when two turns of the
/// same conversation interleave.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Prepare the backing store. Idempotent; call once at startup.
    async fn initialize(&self) -> ColloquyResult<()>;

    /// Insert-or-ignore a conversation, returning the stored row.
    async fn create_conversation_if_absent(
        &self,
        id: &ConversationId,
    ) -> ColloquyResult<Conversation>;

    /// Get a conversation by id.
    async fn get_conversation(&self, id: &ConversationId) -> ColloquyResult<Option<Conversation>>;

    /// Append a message, creating the conversation first when absent.
    ///
    /// # Returns
    /// The new message's id.
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
    ) -> ColloquyResult<MessageId>;

    /// All messages of a conversation in insertion order.
    async fn list_messages(&self, conversation_id: &ConversationId) -> ColloquyResult<Vec<Message>>;

    /// Append a tool call audit record tagged to the triggering message.
    async fn append_tool_call(
        &self,
        conversation_id: &ConversationId,
        message_id: MessageId,
        tool_name: &str,
        input_json: &str,
        result_json: &str,
    ) -> ColloquyResult<ToolCallId>;

    /// All tool calls of a conversation in insertion order.
    async fn list_tool_calls(
        &self,
        conversation_id: &ConversationId,
    ) -> ColloquyResult<Vec<ToolCallRecord>>;

    /// Remove a conversation and its messages.
    ///
    /// Tool call records are an audit log and outlive the purge.
    ///
    /// # Returns
    /// The number of messages removed.
    async fn purge_conversation(&self, id: &ConversationId) -> ColloquyResult<usize>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
struct InMemoryState {
    conversations: HashMap<ConversationId, Conversation>,
    messages: Vec<Message>,
    tool_calls: Vec<ToolCallRecord>,
    last_message_id: MessageId,
    last_tool_call_id: ToolCallId,
}

impl InMemoryState {
    fn ensure_conversation(&mut self, id: &ConversationId) -> Conversation {
        self.conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone()))
            .clone()
    }
}

/// In-memory transcript store.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTranscriptStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryTranscriptStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages across all conversations.
    pub fn message_count(&self) -> usize {
        self.read().map(|state| state.messages.len()).unwrap_or(0)
    }

    /// Number of stored tool calls across all conversations.
    pub fn tool_call_count(&self) -> usize {
        self.read().map(|state| state.tool_calls.len()).unwrap_or(0)
    }

    /// Number of stored conversations.
    pub fn conversation_count(&self) -> usize {
        self.read()
            .map(|state| state.conversations.len())
            .unwrap_or(0)
    }

    fn read(&self) -> ColloquyResult<RwLockReadGuard<'_, InMemoryState>> {
        self.state
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> ColloquyResult<RwLockWriteGuard<'_, InMemoryState>> {
        self.state
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn initialize(&self) -> ColloquyResult<()> {
        Ok(())
    }

    async fn create_conversation_if_absent(
        &self,
        id: &ConversationId,
    ) -> ColloquyResult<Conversation> {
        Ok(self.write()?.ensure_conversation(id))
    }

    async fn get_conversation(&self, id: &ConversationId) -> ColloquyResult<Option<Conversation>> {
        Ok(self.read()?.conversations.get(id).cloned())
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
    ) -> ColloquyResult<MessageId> {
        let mut state = self.write()?;
        state.ensure_conversation(conversation_id);
        state.last_message_id += 1;
        let id = state.last_message_id;
        state.messages.push(Message {
            id,
            conversation_id: conversation_id.clone(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_messages(&self, conversation_id: &ConversationId) -> ColloquyResult<Vec<Message>> {
        Ok(self
            .read()?
            .messages
            .iter()
            .filter(|m| &m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn append_tool_call(
        &self,
        conversation_id: &ConversationId,
        message_id: MessageId,
        tool_name: &str,
        input_json: &str,
        result_json: &str,
    ) -> ColloquyResult<ToolCallId> {
        let mut state = self.write()?;
        state.ensure_conversation(conversation_id);
        state.last_tool_call_id += 1;
        let id = state.last_tool_call_id;
        state.tool_calls.push(ToolCallRecord {
            id,
            conversation_id: conversation_id.clone(),
            message_id,
            tool_name: tool_name.to_string(),
            input_json: input_json.to_string(),
            result_json: result_json.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_tool_calls(
        &self,
        conversation_id: &ConversationId,
    ) -> ColloquyResult<Vec<ToolCallRecord>> {
        Ok(self
            .read()?
            .tool_calls
            .iter()
            .filter(|t| &t.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn purge_conversation(&self, id: &ConversationId) -> ColloquyResult<usize> {
        let mut state = self.write()?;
        state.conversations.remove(id);
        let before = state.messages.len();
        state.messages.retain(|m| &m.conversation_id != id);
        Ok(before - state.messages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(id: &str) -> ConversationId {
        ConversationId::new(id).expect("id should be valid")
    }

    #[tokio::test]
    async fn test_create_conversation_is_idempotent() {
        let store = InMemoryTranscriptStore::new();
        let id = conv("c1");
        let first = store
            .create_conversation_if_absent(&id)
            .await
            .expect("create should succeed");
        let second = store
            .create_conversation_if_absent(&id)
            .await
            .expect("second create should succeed");
        assert_eq!(first, second);
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_append_message_creates_conversation() {
        let store = InMemoryTranscriptStore::new();
        let id = conv("c1");
        store
            .append_message(&id, Role::User, "hello")
            .await
            .expect("append should succeed");
        assert!(store
            .get_conversation(&id)
            .await
            .expect("get should succeed")
            .is_some());
    }

    #[tokio::test]
    async fn test_message_ids_are_monotonic_across_conversations() {
        let store = InMemoryTranscriptStore::new();
        let a = conv("a");
        let b = conv("b");
        let m1 = store.append_message(&a, Role::User, "1").await.expect("append");
        let m2 = store.append_message(&b, Role::User, "2").await.expect("append");
        let m3 = store.append_message(&a, Role::Assistant, "3").await.expect("append");
        assert!(m1 < m2 && m2 < m3);

        let listed = store.list_messages(&a).await.expect("list should succeed");
        let contents: Vec<_> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_purge_keeps_tool_calls() {
        let store = InMemoryTranscriptStore::new();
        let id = conv("c1");
        let msg = store.append_message(&id, Role::User, "sell").await.expect("append");
        store
            .append_tool_call(&id, msg, "record_transaction", "{}", r#"{"success":true}"#)
            .await
            .expect("tool call should append");

        let removed = store.purge_conversation(&id).await.expect("purge should succeed");
        assert_eq!(removed, 1);
        assert!(store.get_conversation(&id).await.expect("get").is_none());
        assert_eq!(store.list_tool_calls(&id).await.expect("list").len(), 1);
    }
}
