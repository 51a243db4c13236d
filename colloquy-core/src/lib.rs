//! Colloquy Core - Conversation Types
//!
//! Plain data shared by every colloquy crate: conversation identity, the
//! transcript records, the decoded model stream vocabulary and the output
//! segments handed to callers. No I/O lives here.

pub mod config;
pub mod error;

pub use config::{EngineConfig, FeaturedPart, FeaturedParts};
pub use error::{
    ColloquyError, ColloquyResult, ConfigError, LlmError, StorageError, ToolError,
    ValidationError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Monotonic message identity, unique within a transcript store.
pub type MessageId = u64;

/// Monotonic tool call identity, unique within a transcript store.
pub type ToolCallId = u64;

/// Longest conversation id accepted from callers.
pub const MAX_CONVERSATION_ID_LEN: usize = 128;

/// Opaque conversation identifier.
///
/// Callers may supply their own id; when absent a UUIDv7 string is generated
/// so ids sort roughly by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Validate and wrap a caller-supplied id.
    pub fn new(id: impl Into<String>) -> ColloquyResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "conversation_id".to_string(),
            }
            .into());
        }
        if trimmed.len() > MAX_CONVERSATION_ID_LEN {
            return Err(ValidationError::InvalidValue {
                field: "conversation_id".to_string(),
                reason: format!("longer than {} bytes", MAX_CONVERSATION_ID_LEN),
            }
            .into());
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError::InvalidValue {
                field: "conversation_id".to_string(),
                reason: "contains control characters".to_string(),
            }
            .into());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh, timestamp-sortable id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ColloquyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = ColloquyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

// ============================================================================
// TRANSCRIPT RECORDS
// ============================================================================

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation row. Messages and tool calls reference it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Conversation {
    pub id: ConversationId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
        }
    }
}

/// One immutable transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Audit record of one tool invocation.
///
/// Input and result are stored as serialized JSON exactly as they crossed
/// the dispatcher, so the record can be replayed without the tool's types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ToolCallRecord {
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub id: ToolCallId,
    pub conversation_id: ConversationId,
    /// The user message whose turn triggered the call.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub message_id: MessageId,
    pub tool_name: String,
    pub input_json: String,
    pub result_json: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl ToolCallRecord {
    /// Parse the stored input back into a JSON value.
    pub fn input(&self) -> ColloquyResult<Value> {
        serde_json::from_str(&self.input_json).map_err(ColloquyError::serialization)
    }

    /// Parse the stored result back into a JSON value.
    pub fn result(&self) -> ColloquyResult<Value> {
        serde_json::from_str(&self.result_json).map_err(ColloquyError::serialization)
    }

    /// Whether the stored result reports `success: true`.
    pub fn succeeded(&self) -> bool {
        self.result()
            .ok()
            .and_then(|value| value.get("success").and_then(Value::as_bool))
            .unwrap_or(false)
    }
}

// ============================================================================
// STREAM VOCABULARY
// ============================================================================

/// A fully decoded tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned id of the tool-use block.
    pub id: String,
    pub name: String,
    /// Always a JSON object.
    pub input: Value,
}

/// Typed events produced by the stream decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolInvocationStart { id: String, name: String },
    ToolInvocationReady(ToolInvocation),
    Done,
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// Unit of output handed to callers.
///
/// `speakable` separates prose meant for voice synthesis from structural
/// decoration (headers, numbering, spacing) that is shown but never voiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OutputSegment {
    pub text: String,
    pub speakable: bool,
}

impl OutputSegment {
    pub fn speakable(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speakable: true,
        }
    }

    /// A display-only segment.
    pub fn display(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speakable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[cfg(feature = "openapi")]
    #[test]
    fn test_transcript_schemas_document_timestamps() {
        use utoipa::PartialSchema;

        for schema in [Message::schema(), ToolCallRecord::schema(), Conversation::schema()] {
            let schema = serde_json::to_value(schema).expect("schema json");
            assert_eq!(schema["properties"]["created_at"]["type"], "string");
            assert_eq!(schema["properties"]["created_at"]["format"], "date-time");
        }
    }

    #[test]
    fn test_conversation_id_rejects_blank() {
        assert!(ConversationId::new("").is_err());
        assert!(ConversationId::new("   ").is_err());
    }

    #[test]
    fn test_conversation_id_trims() {
        let id = ConversationId::new("  conv-1 ").expect("id should be valid");
        assert_eq!(id.as_str(), "conv-1");
    }

    #[test]
    fn test_conversation_id_rejects_oversized() {
        let long = "x".repeat(MAX_CONVERSATION_ID_LEN + 1);
        assert!(ConversationId::new(long).is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_conversation_id_serde_is_transparent() {
        let id = ConversationId::new("abc").expect("id should be valid");
        let json = serde_json::to_string(&id).expect("serialize should succeed");
        assert_eq!(json, "\"abc\"");
        assert!(serde_json::from_str::<ConversationId>("\"\"").is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(
            serde_json::to_string(&Role::Assistant).expect("serialize should succeed"),
            "\"assistant\""
        );
    }

    #[test]
    fn test_tool_call_record_success_flag() {
        let record = ToolCallRecord {
            id: 1,
            conversation_id: ConversationId::generate(),
            message_id: 1,
            tool_name: "record_transaction".to_string(),
            input_json: r#"{"quantity":3}"#.to_string(),
            result_json: r#"{"success":false,"error":"Insufficient stock"}"#.to_string(),
            created_at: Utc::now(),
        };
        assert!(!record.succeeded());
        assert_eq!(
            record.input().expect("input should parse")["quantity"],
            serde_json::json!(3)
        );
    }

    #[test]
    fn test_segment_constructors() {
        assert!(OutputSegment::speakable("hi").speakable);
        assert!(!OutputSegment::display("# Title").speakable);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_valid_ids_survive_parse(raw in "[a-zA-Z0-9_-]{1,64}") {
            let id: ConversationId = raw.parse().expect("id should be valid");
            prop_assert_eq!(id.as_str(), raw.as_str());
        }
    }
}
