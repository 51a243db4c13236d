//! Conversation-scoped LMDB key layout.
//!
//! Every record lives under its conversation's prefix so a single prefix
//! scan returns one conversation's messages or tool calls in id order.

use colloquy_core::ConversationId;

/// Separator byte between the conversation id and the record kind.
///
/// 0xFF never appears in UTF-8, so no conversation id can contain it and
/// one conversation's prefix can never be a prefix of another's.
const SEPARATOR: u8 = 0xFF;

/// Kind of record stored under a conversation prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Conversation,
    Message,
    ToolCall,
}

impl RecordKind {
    fn to_byte(self) -> u8 {
        match self {
            RecordKind::Conversation => 0x01,
            RecordKind::Message => 0x02,
            RecordKind::ToolCall => 0x03,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(RecordKind::Conversation),
            0x02 => Some(RecordKind::Message),
            0x03 => Some(RecordKind::ToolCall),
            _ => None,
        }
    }
}

/// A record key scoped to one conversation.
///
/// # Binary Format
///
/// - Bytes 0..n: conversation id (UTF-8)
/// - Byte n: separator (0xFF)
/// - Byte n+1: record kind
/// - Bytes n+2..n+10: sequence number, big-endian
///
/// Big-endian sequence numbers make LMDB's lexicographic order match
/// insertion order within a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranscriptKey {
    conversation_id: ConversationId,
    kind: RecordKind,
    sequence: u64,
}

impl TranscriptKey {
    pub fn conversation(conversation_id: &ConversationId) -> Self {
        Self {
            conversation_id: conversation_id.clone(),
            kind: RecordKind::Conversation,
            sequence: 0,
        }
    }

    pub fn message(conversation_id: &ConversationId, message_id: u64) -> Self {
        Self {
            conversation_id: conversation_id.clone(),
            kind: RecordKind::Message,
            sequence: message_id,
        }
    }

    pub fn tool_call(conversation_id: &ConversationId, tool_call_id: u64) -> Self {
        Self {
            conversation_id: conversation_id.clone(),
            kind: RecordKind::ToolCall,
            sequence: tool_call_id,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn encode(&self) -> Vec<u8> {
        let id = self.conversation_id.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(id.len() + 10);
        bytes.extend_from_slice(id);
        bytes.push(SEPARATOR);
        bytes.push(self.kind.to_byte());
        bytes.extend_from_slice(&self.sequence.to_be_bytes());
        bytes
    }

    /// Decode a key from bytes, `None` when the layout does not match.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 11 {
            return None;
        }
        let split = bytes.len() - 10;
        if bytes[split] != SEPARATOR {
            return None;
        }
        let id = std::str::from_utf8(&bytes[..split]).ok()?;
        let conversation_id = ConversationId::new(id).ok()?;
        let kind = RecordKind::from_byte(bytes[split + 1])?;
        let sequence = u64::from_be_bytes(bytes[split + 2..].try_into().ok()?);
        Some(Self {
            conversation_id,
            kind,
            sequence,
        })
    }

    /// Prefix covering every record of one kind in a conversation.
    pub fn kind_prefix(conversation_id: &ConversationId, kind: RecordKind) -> Vec<u8> {
        let mut bytes = conversation_prefix(conversation_id);
        bytes.push(kind.to_byte());
        bytes
    }
}

/// Prefix covering every record in a conversation.
pub fn conversation_prefix(conversation_id: &ConversationId) -> Vec<u8> {
    let id = conversation_id.as_str().as_bytes();
    let mut bytes = Vec::with_capacity(id.len() + 1);
    bytes.extend_from_slice(id);
    bytes.push(SEPARATOR);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn conv(id: &str) -> ConversationId {
        ConversationId::new(id).expect("id should be valid")
    }

    #[test]
    fn test_decode_roundtrip() {
        let key = TranscriptKey::message(&conv("abc"), 42);
        let decoded = TranscriptKey::decode(&key.encode()).expect("key should decode");
        assert_eq!(decoded, key);
        assert_eq!(decoded.kind(), RecordKind::Message);
        assert_eq!(decoded.sequence(), 42);
    }

    #[test]
    fn test_decode_rejects_short_and_corrupt() {
        assert!(TranscriptKey::decode(&[0x01, 0x02]).is_none());
        let mut bytes = TranscriptKey::tool_call(&conv("abc"), 1).encode();
        bytes[3] = 0x00;
        assert!(TranscriptKey::decode(&bytes).is_none());
    }

    #[test]
    fn test_prefix_isolates_similar_ids() {
        let short = conv("conv");
        let long = conv("conv-2");
        let long_key = TranscriptKey::message(&long, 1).encode();
        assert!(!long_key.starts_with(&conversation_prefix(&short)));
        assert!(long_key.starts_with(&conversation_prefix(&long)));
    }

    #[test]
    fn test_kind_prefix_matches_only_that_kind() {
        let id = conv("abc");
        let prefix = TranscriptKey::kind_prefix(&id, RecordKind::Message);
        assert!(TranscriptKey::message(&id, 9).encode().starts_with(&prefix));
        assert!(!TranscriptKey::tool_call(&id, 9).encode().starts_with(&prefix));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_sequence_order_is_byte_order(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
            let id = conv("ordered");
            let ka = TranscriptKey::message(&id, a).encode();
            let kb = TranscriptKey::message(&id, b).encode();
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }
    }
}
