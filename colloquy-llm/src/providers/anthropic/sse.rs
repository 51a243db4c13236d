//! Incremental server-sent events parser.
//!
//! Network chunks do not respect line or event boundaries, so the parser
//! buffers raw bytes and only decodes complete lines. A frame is dispatched
//! on the blank line that terminates it.

use super::types::RawStreamEvent;
use colloquy_core::LlmError;

/// One dispatched SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Decode the frame's data payload as a Messages stream event.
    pub fn parse_event(&self) -> Result<RawStreamEvent, LlmError> {
        serde_json::from_str(&self.data).map_err(|e| LlmError::InvalidResponse {
            provider: "anthropic".to_string(),
            reason: format!(
                "undecodable {} event: {}",
                self.event.as_deref().unwrap_or("message"),
                e
            ),
        })
    }
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, LlmError> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8(line).map_err(|e| LlmError::InvalidResponse {
                provider: "anthropic".to_string(),
                reason: format!("stream is not valid UTF-8: {}", e),
            })?;
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        Ok(frames)
    }

    /// Flush a trailing frame left unterminated at end of stream.
    pub fn finish(&mut self) -> Result<Option<SseFrame>, LlmError> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8(rest).map_err(|e| LlmError::InvalidResponse {
                provider: "anthropic".to_string(),
                reason: format!("stream is not valid UTF-8: {}", e),
            })?;
            if let Some(frame) = self.process_line(line.trim_end_matches('\r')) {
                return Ok(Some(frame));
            }
        }
        Ok(self.dispatch())
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment line, used for keep-alives.
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STREAM: &str = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":5,\"output_tokens\":1}}}\n\
\n\
: keep-alive\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi \u{1F600}\"}}\n\
\n";

    #[test]
    fn test_parses_complete_stream() {
        let mut parser = SseParser::new();
        let frames = parser.push(STREAM.as_bytes()).expect("push should succeed");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("message_start"));
        assert!(matches!(
            frames[1].parse_event().expect("event should decode"),
            RawStreamEvent::ContentBlockDelta { index: 0, .. }
        ));
        assert_eq!(parser.finish().expect("finish should succeed"), None);
    }

    #[test]
    fn test_handles_crlf_and_multiline_data() {
        let mut parser = SseParser::new();
        let frames = parser
            .push(b"data: line one\r\ndata: line two\r\n\r\n")
            .expect("push should succeed");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut parser = SseParser::new();
        assert!(parser
            .push(b"event: ping\ndata: {\"type\":\"ping\"}")
            .expect("push should succeed")
            .is_empty());
        let frame = parser
            .finish()
            .expect("finish should succeed")
            .expect("trailing frame expected");
        assert_eq!(frame.parse_event().expect("decode"), RawStreamEvent::Ping);
    }

    #[test]
    fn test_undecodable_payload_is_an_error() {
        let frame = SseFrame {
            event: Some("content_block_delta".to_string()),
            data: "{not json".to_string(),
        };
        assert!(frame.parse_event().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_chunking_does_not_change_frames(split_points in prop::collection::vec(0usize..STREAM.len(), 0..8)) {
            let bytes = STREAM.as_bytes();
            let mut cuts = split_points.clone();
            cuts.sort_unstable();
            cuts.dedup();

            let mut parser = SseParser::new();
            let mut frames = Vec::new();
            let mut start = 0;
            for cut in cuts {
                frames.extend(parser.push(&bytes[start..cut]).expect("push should succeed"));
                start = cut;
            }
            frames.extend(parser.push(&bytes[start..]).expect("push should succeed"));

            let mut whole = SseParser::new();
            let expected = whole.push(bytes).expect("push should succeed");
            prop_assert_eq!(frames, expected);
        }
    }
}
