//! Turn vocabulary shared by the streaming and buffered paths.

use colloquy_core::{ConversationId, OutputSegment};
use serde::{Deserialize, Serialize};

/// A user message addressed to an assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    /// Continue this conversation; a new one is started when absent.
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
        }
    }

    pub fn in_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }
}

/// One event of a streamed turn, as sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnEvent {
    Chunk {
        chunk: String,
        speakable: bool,
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
    },
    Error {
        error: String,
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
    },
}

impl TurnEvent {
    pub fn chunk(segment: OutputSegment, conversation_id: &ConversationId) -> Self {
        TurnEvent::Chunk {
            chunk: segment.text,
            speakable: segment.speakable,
            conversation_id: conversation_id.clone(),
        }
    }

    pub fn error(error: impl Into<String>, conversation_id: &ConversationId) -> Self {
        TurnEvent::Error {
            error: error.into(),
            conversation_id: conversation_id.clone(),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            TurnEvent::Chunk {
                conversation_id, ..
            }
            | TurnEvent::Error {
                conversation_id, ..
            } => conversation_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TurnEvent::Error { .. })
    }
}

/// Result of a buffered turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub conversation_id: ConversationId,
    /// Everything shown to the user, tool output included.
    pub response: String,
    /// The speakable subset, in order.
    pub speakable_chunks: Vec<OutputSegment>,
}

/// Lifecycle of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    ToolPending,
    Draining,
    Done,
    Failed,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Done | TurnState::Failed)
    }

    pub fn can_transition_to(&self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Idle, Failed)
                | (Streaming, ToolPending)
                | (ToolPending, Streaming)
                | (Streaming, Draining)
                | (Draining, Done)
                | (Streaming, Failed)
                | (ToolPending, Failed)
                | (Draining, Failed)
        )
    }
}

/// Running totals of a turn.
///
/// `display` is what the user sees; `history` is what goes into the stored
/// assistant message, with tool output replaced by short notes.
#[derive(Debug, Clone)]
pub(crate) struct TurnAccumulator {
    state: TurnState,
    display: String,
    history: String,
    speakable: Vec<OutputSegment>,
    tools_used: Vec<String>,
}

impl TurnAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            state: TurnState::Idle,
            display: String::new(),
            history: String::new(),
            speakable: Vec::new(),
            tools_used: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> TurnState {
        self.state
    }

    /// Move to `next`, logging transitions the lifecycle does not allow.
    pub(crate) fn advance(&mut self, next: TurnState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = ?self.state, to = ?next, "unexpected turn transition");
        }
        self.state = next;
    }

    /// Model text: shown, spoken and kept in history.
    pub(crate) fn push_text(&mut self, text: &str) -> OutputSegment {
        self.display.push_str(text);
        self.history.push_str(text);
        let segment = OutputSegment::speakable(text);
        self.speakable.push(segment.clone());
        segment
    }

    /// Tool output: shown, spoken when speakable, never kept in history.
    pub(crate) fn push_tool_segment(&mut self, segment: &OutputSegment) {
        self.display.push_str(&segment.text);
        if segment.speakable {
            self.speakable.push(segment.clone());
        }
    }

    pub(crate) fn note_tool(&mut self, tool_name: &str, annotation: String) {
        self.history.push_str(&annotation);
        self.tools_used.push(tool_name.to_string());
    }

    pub(crate) fn history_text(&self) -> &str {
        &self.history
    }

    pub(crate) fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    pub(crate) fn into_response(self, conversation_id: ConversationId) -> TurnResponse {
        TurnResponse {
            conversation_id,
            response: self.display,
            speakable_chunks: self.speakable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conversation() -> ConversationId {
        ConversationId::new("conv-7").expect("valid id")
    }

    #[test]
    fn test_request_accepts_missing_conversation() {
        let request: TurnRequest =
            serde_json::from_value(json!({"message": "list my books", "conversationId": null}))
                .expect("deserialize");
        assert_eq!(request, TurnRequest::new("list my books"));

        let request: TurnRequest =
            serde_json::from_value(json!({"message": "again", "conversationId": "conv-7"}))
                .expect("deserialize");
        assert_eq!(request.conversation_id, Some(conversation()));
    }

    #[test]
    fn test_event_wire_shape() {
        let chunk = TurnEvent::chunk(OutputSegment::display("\n\n"), &conversation());
        assert_eq!(
            serde_json::to_value(&chunk).expect("serialize"),
            json!({"chunk": "\n\n", "speakable": false, "conversationId": "conv-7"})
        );
        let error = TurnEvent::error("upstream closed", &conversation());
        assert_eq!(
            serde_json::to_value(&error).expect("serialize"),
            json!({"error": "upstream closed", "conversationId": "conv-7"})
        );
        assert!(error.is_error());
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        use TurnState::*;
        for state in [Done, Failed] {
            assert!(state.is_terminal());
            for next in [Idle, Streaming, ToolPending, Draining, Done, Failed] {
                assert!(!state.can_transition_to(next));
            }
        }
        assert!(Streaming.can_transition_to(ToolPending));
        assert!(!Idle.can_transition_to(Done));
    }

    #[test]
    fn test_accumulator_separates_display_and_history() {
        let mut acc = TurnAccumulator::new();
        acc.push_text("Here you go.");
        acc.push_tool_segment(&OutputSegment::display("\n\n# Gitanjali\n\n"));
        acc.push_tool_segment(&OutputSegment::speakable("Where the mind is without fear\n"));
        acc.note_tool("get_work_content", "\n\n[Note: Used tool 'get_work_content']".to_string());

        assert_eq!(acc.history_text(), "Here you go.\n\n[Note: Used tool 'get_work_content']");
        assert_eq!(acc.tools_used(), ["get_work_content".to_string()]);

        let response = acc.into_response(conversation());
        assert_eq!(
            response.response,
            "Here you go.\n\n# Gitanjali\n\nWhere the mind is without fear\n"
        );
        assert_eq!(response.speakable_chunks.len(), 2);
        assert!(response.speakable_chunks.iter().all(|s| s.speakable));
    }
}
