//! Anthropic Messages API provider

mod client;
mod provider;
pub mod sse;
pub mod types;

pub use client::AnthropicClient;
pub use provider::AnthropicProvider;
pub use sse::{SseFrame, SseParser};
pub use types::*;
