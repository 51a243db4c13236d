//! Anthropic Messages API wire types

use colloquy_core::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// REQUEST
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

// ============================================================================
// COMPLETE RESPONSE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub role: String,
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    /// Block kinds this client does not act on, such as `thinking`.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

// ============================================================================
// STREAMING EVENTS
// ============================================================================

/// One server-sent event of a streaming Messages response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawStreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockStart {
        index: usize,
        content_block: StartBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<Usage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ErrorDetail,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub id: String,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_with_unknown_block_still_parses() {
        let response: MessageResponse = serde_json::from_value(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-haiku-20240307",
            "stop_reason": "end_turn",
            "content": [
                {"type": "thinking", "thinking": "the user wants a poem", "signature": "abc"},
                {"type": "text", "text": "Here is one."}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 5}
        }))
        .expect("response should parse");

        assert_eq!(
            response.content,
            vec![
                ContentBlock::Other,
                ContentBlock::Text {
                    text: "Here is one.".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_request_omits_empty_optionals() {
        let request = MessageRequest {
            model: "claude-3-haiku-20240307".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 1000,
            system: None,
            temperature: None,
            tools: Vec::new(),
            stream: false,
        };
        let value = serde_json::to_value(&request).expect("serialize should succeed");
        assert!(value.get("system").is_none());
        assert!(value.get("tools").is_none());
        assert!(value.get("stream").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_streaming_request_sets_flag() {
        let request = MessageRequest {
            model: "m".to_string(),
            messages: vec![],
            max_tokens: 10,
            system: Some("be brief".to_string()),
            temperature: None,
            tools: vec![],
            stream: true,
        };
        let value = serde_json::to_value(&request).expect("serialize should succeed");
        assert_eq!(value["stream"], true);
        assert_eq!(value["system"], "be brief");
    }

    #[test]
    fn test_response_content_blocks() {
        let raw = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-haiku-20240307",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "list_items", "input": {"category": "books"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 30}
        });
        let response: MessageResponse = serde_json::from_value(raw).expect("should deserialize");
        assert_eq!(response.content.len(), 2);
        assert!(matches!(
            &response.content[1],
            ContentBlock::ToolUse { name, .. } if name == "list_items"
        ));
        assert_eq!(response.usage.output_tokens, 30);
    }

    #[test]
    fn test_stream_event_vocabulary() {
        let start: RawStreamEvent = serde_json::from_value(json!({
            "type": "content_block_start",
            "index": 1,
            "content_block": {"type": "tool_use", "id": "toolu_1", "name": "list_works", "input": {}}
        }))
        .expect("should deserialize");
        assert!(matches!(
            start,
            RawStreamEvent::ContentBlockStart { index: 1, content_block: StartBlock::ToolUse { .. } }
        ));

        let delta: RawStreamEvent = serde_json::from_value(json!({
            "type": "content_block_delta",
            "index": 1,
            "delta": {"type": "input_json_delta", "partial_json": "{\"cat"}
        }))
        .expect("should deserialize");
        assert!(matches!(
            delta,
            RawStreamEvent::ContentBlockDelta { delta: BlockDelta::InputJsonDelta { .. }, .. }
        ));
    }

    #[test]
    fn test_unrecognised_events_are_tolerated() {
        let event: RawStreamEvent =
            serde_json::from_value(json!({"type": "brand_new_event"})).expect("should deserialize");
        assert_eq!(event, RawStreamEvent::Unknown);

        let delta: RawStreamEvent = serde_json::from_value(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "thinking_delta", "thinking": "hmm"}
        }))
        .expect("should deserialize");
        assert!(matches!(
            delta,
            RawStreamEvent::ContentBlockDelta { delta: BlockDelta::Other, .. }
        ));
    }
}
