//! Colloquy LLM - Model Provider Layer
//!
//! Provider-agnostic trait for chat completions, plus the Anthropic Messages
//! API implementation. Streaming responses surface as the raw provider event
//! vocabulary; turning those into conversation events is the engine's job.

pub mod config;
pub mod providers;

pub use config::AnthropicConfig;
pub use providers::anthropic::{
    BlockDelta, ChatMessage, ContentBlock, ErrorDetail, MessageDeltaBody,
    MessageRequest, MessageResponse, RawStreamEvent, SseFrame, SseParser, StartBlock,
    StreamMessage, ToolDefinition, Usage,
};
pub use providers::{AnthropicClient, AnthropicProvider};

use async_trait::async_trait;
use colloquy_core::ColloquyResult;
use futures_util::stream::BoxStream;
use std::sync::atomic::{AtomicU64, Ordering};

/// Raw provider events in arrival order. Transport failures are yielded as
/// errors; the stream ends after the first one.
pub type RawEventStream = BoxStream<'static, ColloquyResult<RawStreamEvent>>;

// ============================================================================
// MODEL PROVIDER TRAIT
// ============================================================================

/// One chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// Trait for chat completion providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Request a complete, non-streaming response.
    ///
    /// # Returns
    /// * `Ok(MessageResponse)` - Ordered text and tool-use blocks
    /// * `Err(ColloquyError::Llm)` - If the request fails
    async fn complete(&self, request: &ModelRequest) -> ColloquyResult<MessageResponse>;

    /// Open a streaming response.
    ///
    /// Errors returned here mean the stream never opened; failures after
    /// that arrive as items of the returned stream.
    async fn stream(&self, request: &ModelRequest) -> ColloquyResult<RawEventStream>;
}

// ============================================================================
// USAGE TRACKING
// ============================================================================

/// Running token totals across requests.
pub struct UsageTracker {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    requests: AtomicU64,
}

impl UsageTracker {
    /// Create a new tracker with zero counts.
    pub fn new() -> Self {
        Self {
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    /// Record token usage reported by the provider.
    ///
    /// A report with input tokens counts as a new request; streaming
    /// responses report output tokens again in their trailing delta.
    pub fn record(&self, input_tokens: u64, output_tokens: u64) {
        if input_tokens > 0 {
            self.requests.fetch_add(1, Ordering::Relaxed);
        }
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens.load(Ordering::Relaxed)
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("input_tokens", &self.input_tokens())
            .field("output_tokens", &self.output_tokens())
            .field("requests", &self.requests())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usage_tracker_counts_requests_once() {
        let tracker = UsageTracker::new();
        tracker.record(10, 1);
        tracker.record(0, 25);
        assert_eq!(tracker.input_tokens(), 10);
        assert_eq!(tracker.output_tokens(), 26);
        assert_eq!(tracker.requests(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_usage_tracker_sums(reports in prop::collection::vec((0u64..10_000, 0u64..10_000), 0..50)) {
            let tracker = UsageTracker::new();
            for (input, output) in &reports {
                tracker.record(*input, *output);
            }
            prop_assert_eq!(tracker.input_tokens(), reports.iter().map(|r| r.0).sum::<u64>());
            prop_assert_eq!(tracker.output_tokens(), reports.iter().map(|r| r.1).sum::<u64>());
        }
    }
}
