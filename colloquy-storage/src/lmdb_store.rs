//! LMDB-backed transcript store.
//!
//! Uses the heed crate (Rust bindings for LMDB). Records are JSON values
//! keyed by [`TranscriptKey`]; two monotonic counters in a separate `meta`
//! database hand out message and tool call ids.
//!
//! # Transactions
//!
//! Every append runs in one write transaction: the conversation row is
//! inserted if absent, the counter is bumped and the record is written, so
//! concurrent turns on the same conversation cannot race on creation.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use colloquy_core::{
    ColloquyError, ColloquyResult, Conversation, ConversationId, Message, MessageId, Role,
    StorageError, ToolCallId, ToolCallRecord,
};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::StorageConfig;
use crate::transcript_key::{conversation_prefix, RecordKind, TranscriptKey};
use crate::TranscriptStore;

/// Current on-disk layout version.
pub const SCHEMA_VERSION: u32 = 1;

const RECORDS_DB: &str = "records";
const META_DB: &str = "meta";
const SCHEMA_KEY: &[u8] = b"schema_version";
const MESSAGE_SEQ_KEY: &[u8] = b"message_seq";
const TOOL_CALL_SEQ_KEY: &[u8] = b"tool_call_seq";

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for ColloquyError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization(reason) | LmdbStoreError::Deserialization(reason) => {
                ColloquyError::Storage(StorageError::Serialization { reason })
            }
            other => ColloquyError::Storage(StorageError::TransactionFailed {
                reason: other.to_string(),
            }),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// LMDB-backed transcript store.
///
/// # Example
///
/// ```ignore
/// let store = LmdbTranscriptStore::open(&StorageConfig::from_env()?)?;
/// store.initialize().await?;
/// let id = store.append_message(&conversation_id, Role::User, "hello").await?;
/// ```
#[derive(Clone)]
pub struct LmdbTranscriptStore {
    env: Env,
    records: Database<Bytes, Bytes>,
    meta: Database<Bytes, Bytes>,
}

impl LmdbTranscriptStore {
    /// Open (or create) the LMDB environment described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The LMDB environment cannot be opened
    /// - The databases cannot be created
    pub fn open(config: &StorageConfig) -> Result<Self, LmdbStoreError> {
        Self::open_at(&config.path, config.map_size_mb)
    }

    /// Open (or create) an environment at `path` with a map of `max_size_mb`.
    pub fn open_at<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never resized while transactions are live.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(2)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let records: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(RECORDS_DB))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        let meta: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(META_DB))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(path = %path.as_ref().display(), "Opened LMDB transcript store");

        Ok(Self { env, records, meta })
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbStoreError> {
        serde_json::to_vec(value).map_err(|e| LmdbStoreError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbStoreError> {
        serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Deserialization(e.to_string()))
    }

    fn read_counter(&self, txn: &RoTxn, key: &[u8]) -> Result<u64, LmdbStoreError> {
        match self.meta.get(txn, key).map_err(txn_err)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.try_into().map_err(|_| {
                    LmdbStoreError::Deserialization(format!(
                        "counter {} has {} bytes",
                        String::from_utf8_lossy(key),
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn next_id(&self, wtxn: &mut RwTxn, key: &[u8]) -> Result<u64, LmdbStoreError> {
        let next = self.read_counter(wtxn, key)? + 1;
        self.meta
            .put(wtxn, key, &next.to_be_bytes())
            .map_err(txn_err)?;
        Ok(next)
    }

    fn ensure_conversation(
        &self,
        wtxn: &mut RwTxn,
        id: &ConversationId,
    ) -> Result<Conversation, LmdbStoreError> {
        let key = TranscriptKey::conversation(id).encode();
        if let Some(bytes) = self.records.get(wtxn, &key).map_err(txn_err)? {
            return Self::decode(bytes);
        }
        let conversation = Conversation::new(id.clone());
        self.records
            .put(wtxn, &key, &Self::encode(&conversation)?)
            .map_err(txn_err)?;
        Ok(conversation)
    }

    fn scan<T: DeserializeOwned>(
        &self,
        conversation_id: &ConversationId,
        kind: RecordKind,
    ) -> Result<Vec<T>, LmdbStoreError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let prefix = TranscriptKey::kind_prefix(conversation_id, kind);
        let mut out = Vec::new();
        for entry in self.records.prefix_iter(&rtxn, &prefix).map_err(txn_err)? {
            let (_, value) = entry.map_err(txn_err)?;
            out.push(Self::decode(value)?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for LmdbTranscriptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbTranscriptStore")
            .field("path", &self.env.path())
            .finish()
    }
}

#[async_trait]
impl TranscriptStore for LmdbTranscriptStore {
    async fn initialize(&self) -> ColloquyResult<()> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let found = self
            .meta
            .get(&wtxn, SCHEMA_KEY)
            .map_err(txn_err)?
            .map(|bytes| {
                bytes
                    .try_into()
                    .map(u32::from_be_bytes)
                    .map_err(|_| LmdbStoreError::Deserialization("schema version".to_string()))
            })
            .transpose()?;

        match found {
            Some(version) if version == SCHEMA_VERSION => {}
            Some(version) => {
                return Err(StorageError::SchemaMismatch {
                    found: version,
                    expected: SCHEMA_VERSION,
                }
                .into());
            }
            None => {
                self.meta
                    .put(&mut wtxn, SCHEMA_KEY, &SCHEMA_VERSION.to_be_bytes())
                    .map_err(txn_err)?;
                tracing::info!(version = SCHEMA_VERSION, "Initialized transcript schema");
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn create_conversation_if_absent(
        &self,
        id: &ConversationId,
    ) -> ColloquyResult<Conversation> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let conversation = self.ensure_conversation(&mut wtxn, id)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &ConversationId) -> ColloquyResult<Option<Conversation>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let key = TranscriptKey::conversation(id).encode();
        match self.records.get(&rtxn, &key).map_err(txn_err)? {
            Some(bytes) => Ok(Some(Self::decode(bytes)?)),
            None => Ok(None),
        }
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
    ) -> ColloquyResult<MessageId> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.ensure_conversation(&mut wtxn, conversation_id)?;
        let id = self.next_id(&mut wtxn, MESSAGE_SEQ_KEY)?;
        let message = Message {
            id,
            conversation_id: conversation_id.clone(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.records
            .put(
                &mut wtxn,
                &TranscriptKey::message(conversation_id, id).encode(),
                &Self::encode(&message)?,
            )
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(id)
    }

    async fn list_messages(&self, conversation_id: &ConversationId) -> ColloquyResult<Vec<Message>> {
        Ok(self.scan(conversation_id, RecordKind::Message)?)
    }

    async fn append_tool_call(
        &self,
        conversation_id: &ConversationId,
        message_id: MessageId,
        tool_name: &str,
        input_json: &str,
        result_json: &str,
    ) -> ColloquyResult<ToolCallId> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.ensure_conversation(&mut wtxn, conversation_id)?;
        let id = self.next_id(&mut wtxn, TOOL_CALL_SEQ_KEY)?;
        let record = ToolCallRecord {
            id,
            conversation_id: conversation_id.clone(),
            message_id,
            tool_name: tool_name.to_string(),
            input_json: input_json.to_string(),
            result_json: result_json.to_string(),
            created_at: Utc::now(),
        };
        self.records
            .put(
                &mut wtxn,
                &TranscriptKey::tool_call(conversation_id, id).encode(),
                &Self::encode(&record)?,
            )
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(id)
    }

    async fn list_tool_calls(
        &self,
        conversation_id: &ConversationId,
    ) -> ColloquyResult<Vec<ToolCallRecord>> {
        Ok(self.scan(conversation_id, RecordKind::ToolCall)?)
    }

    async fn purge_conversation(&self, id: &ConversationId) -> ColloquyResult<usize> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let mut doomed = Vec::new();
        for entry in self
            .records
            .prefix_iter(&wtxn, &conversation_prefix(id))
            .map_err(txn_err)?
        {
            let (key, _) = entry.map_err(txn_err)?;
            if let Some(decoded) = TranscriptKey::decode(key) {
                if decoded.kind() != RecordKind::ToolCall {
                    doomed.push(decoded);
                }
            }
        }

        let mut removed = 0;
        for key in &doomed {
            self.records
                .delete(&mut wtxn, &key.encode())
                .map_err(txn_err)?;
            if key.kind() == RecordKind::Message {
                removed += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;

        tracing::info!(conversation_id = %id, messages = removed, "Purged conversation");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, LmdbTranscriptStore) {
        let dir = TempDir::new().expect("temp dir should be created");
        let store = LmdbTranscriptStore::open_at(dir.path(), 10).expect("store should open");
        (dir, store)
    }

    fn conv(id: &str) -> ConversationId {
        ConversationId::new(id).expect("id should be valid")
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (_dir, store) = open_store();
        store.initialize().await.expect("first initialize should succeed");
        store.initialize().await.expect("second initialize should succeed");
    }

    #[tokio::test]
    async fn test_initialize_rejects_foreign_schema() {
        let (_dir, store) = open_store();
        {
            let mut wtxn = store.env.write_txn().expect("write txn");
            store
                .meta
                .put(&mut wtxn, SCHEMA_KEY, &99u32.to_be_bytes())
                .expect("put should succeed");
            wtxn.commit().expect("commit should succeed");
        }
        let err = store.initialize().await.expect_err("should reject schema 99");
        assert!(matches!(
            err,
            ColloquyError::Storage(StorageError::SchemaMismatch { found: 99, .. })
        ));
    }

    #[tokio::test]
    async fn test_messages_survive_reopen() {
        let dir = TempDir::new().expect("temp dir should be created");
        let id = conv("durable");
        {
            let store = LmdbTranscriptStore::open_at(dir.path(), 10).expect("store should open");
            store.initialize().await.expect("initialize");
            store.append_message(&id, Role::User, "first").await.expect("append");
            store
                .append_message(&id, Role::Assistant, "second")
                .await
                .expect("append");
        }
        let store = LmdbTranscriptStore::open_at(dir.path(), 10).expect("store should reopen");
        let messages = store.list_messages(&id).await.expect("list should succeed");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].role, Role::Assistant);

        let next = store.append_message(&id, Role::User, "third").await.expect("append");
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn test_purge_removes_messages_but_keeps_tool_calls() {
        let (_dir, store) = open_store();
        let id = conv("purged");
        let msg = store.append_message(&id, Role::User, "hi").await.expect("append");
        store
            .append_tool_call(&id, msg, "list_works", "{}", r#"{"success":true}"#)
            .await
            .expect("tool call");

        assert_eq!(store.purge_conversation(&id).await.expect("purge"), 1);
        assert!(store.get_conversation(&id).await.expect("get").is_none());
        assert!(store.list_messages(&id).await.expect("list").is_empty());
        assert_eq!(store.list_tool_calls(&id).await.expect("list").len(), 1);
    }
}
