use super::client::AnthropicClient;
use super::types::{MessageRequest, MessageResponse, RawStreamEvent};
use crate::config::AnthropicConfig;
use crate::{ModelProvider, ModelRequest, RawEventStream, UsageTracker};
use async_trait::async_trait;
use colloquy_core::ColloquyResult;
use futures_util::StreamExt;
use std::sync::Arc;

const MESSAGES_ENDPOINT: &str = "messages";

/// [`ModelProvider`] backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: AnthropicClient,
    usage: Arc<UsageTracker>,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig) -> Self {
        Self {
            client: AnthropicClient::new(config),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    /// Token usage observed across every request made by this provider.
    pub fn usage(&self) -> Arc<UsageTracker> {
        Arc::clone(&self.usage)
    }

    fn to_wire(request: &ModelRequest, stream: bool) -> MessageRequest {
        MessageRequest {
            model: request.model.clone(),
            messages: request.messages.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            temperature: request.temperature,
            tools: request.tools.clone(),
            stream,
        }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ModelRequest) -> ColloquyResult<MessageResponse> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending completion request"
        );
        let response: MessageResponse = self
            .client
            .request(MESSAGES_ENDPOINT, &Self::to_wire(request, false))
            .await?;
        self.usage
            .record(response.usage.input_tokens, response.usage.output_tokens);
        Ok(response)
    }

    async fn stream(&self, request: &ModelRequest) -> ColloquyResult<RawEventStream> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "opening streaming request"
        );
        let events = self
            .client
            .stream(MESSAGES_ENDPOINT, &Self::to_wire(request, true))
            .await?;

        let usage = Arc::clone(&self.usage);
        let tracked = events.inspect(move |event| match event {
            Ok(RawStreamEvent::MessageStart { message }) => {
                usage.record(message.usage.input_tokens, message.usage.output_tokens);
            }
            Ok(RawStreamEvent::MessageDelta {
                usage: Some(delta), ..
            }) => {
                usage.record(0, delta.output_tokens);
            }
            _ => {}
        });
        Ok(Box::pin(tracked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, ToolDefinition};
    use serde_json::json;

    #[test]
    fn test_wire_request_carries_tools_and_stream_flag() {
        let request = ModelRequest {
            model: "claude-3-haiku-20240307".to_string(),
            system: Some("system".to_string()),
            messages: vec![ChatMessage::user("hello")],
            tools: vec![ToolDefinition {
                name: "list_works".to_string(),
                description: "List works".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            }],
            max_tokens: 1000,
            temperature: None,
        };
        let wire = AnthropicProvider::to_wire(&request, true);
        assert!(wire.stream);
        assert_eq!(wire.tools.len(), 1);
        assert_eq!(wire.system.as_deref(), Some("system"));
    }

    #[test]
    fn test_usage_is_shared() {
        let provider = AnthropicProvider::new(&AnthropicConfig::new("key"));
        provider.usage().record(3, 4);
        assert_eq!(provider.usage().output_tokens(), 4);
    }
}
