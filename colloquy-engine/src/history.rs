//! Transcript to model history
//!
//! The Messages API wants a conversation that opens with a user turn and
//! alternates roles. Stored transcripts need not: an aborted turn leaves a
//! user message with no reply, and empty messages are possible.

use colloquy_core::{Message, Role};
use colloquy_llm::ChatMessage;

/// Separator used when two same-role messages are merged.
const MERGE_SEPARATOR: &str = "\n\n";

/// Build the model history from stored messages.
///
/// Skips blank messages, merges consecutive messages of the same role and
/// drops assistant messages that precede the first user message.
pub fn build_history(messages: &[Message]) -> Vec<ChatMessage> {
    let mut history: Vec<ChatMessage> = Vec::with_capacity(messages.len());

    for message in messages {
        if message.content.trim().is_empty() {
            continue;
        }
        if history.is_empty() && message.role == Role::Assistant {
            continue;
        }
        match history.last_mut() {
            Some(previous) if previous.role == message.role => {
                previous.content.push_str(MERGE_SEPARATOR);
                previous.content.push_str(&message.content);
            }
            _ => history.push(ChatMessage {
                role: message.role,
                content: message.content.clone(),
            }),
        }
    }

    history
}
