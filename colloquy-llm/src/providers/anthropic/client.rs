//! Anthropic HTTP client

use super::sse::SseParser;
use super::types::ApiError;
use crate::config::AnthropicConfig;
use crate::RawEventStream;
use colloquy_core::{ColloquyError, ColloquyResult, LlmError};
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

const PROVIDER: &str = "anthropic";

/// Anthropic API client.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    ///
    /// # Arguments
    /// * `config` - API key, base URL and API version
    pub fn new(config: &AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        }
    }

    async fn send<Req: Serialize>(&self, endpoint: &str, body: &Req) -> ColloquyResult<Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                ColloquyError::Llm(LlmError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: format!("HTTP request failed: {}", e),
                })
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(status_error(status, &error_text))
    }

    /// Make a non-streaming API request.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> ColloquyResult<Res> {
        let response = self.send(endpoint, body).await?;
        response.json().await.map_err(|e| {
            ColloquyError::Llm(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to parse response: {}", e),
            })
        })
    }

    /// Make a streaming API request and decode its server-sent events.
    ///
    /// The returned stream yields one item per SSE frame. A transport or
    /// framing failure is yielded as an error and ends the stream.
    pub async fn stream<Req: Serialize>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> ColloquyResult<RawEventStream> {
        let response = self.send(endpoint, body).await?;
        let mut bytes = response.bytes_stream();

        let events = async_stream::stream! {
            let mut parser = SseParser::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(ColloquyError::Llm(LlmError::StreamInterrupted {
                            provider: PROVIDER.to_string(),
                            reason: e.to_string(),
                        }));
                        return;
                    }
                };
                match parser.push(&chunk) {
                    Ok(frames) => {
                        for frame in frames {
                            yield frame.parse_event().map_err(ColloquyError::from);
                        }
                    }
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    }
                }
            }
            match parser.finish() {
                Ok(Some(frame)) => yield frame.parse_event().map_err(ColloquyError::from),
                Ok(None) => {}
                Err(e) => yield Err(e.into()),
            }
        };

        Ok(Box::pin(events))
    }
}

/// Map a failed HTTP status to the matching LLM error.
fn status_error(status: StatusCode, body: &str) -> ColloquyError {
    let message = match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => body.to_string(),
    };

    ColloquyError::Llm(match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::InvalidApiKey {
            provider: PROVIDER.to_string(),
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            status: status.as_u16(),
            message,
        },
    })
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = status_error(StatusCode::from_u16(529).expect("valid status"), body);
        assert_eq!(
            err,
            ColloquyError::Llm(LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                status: 529,
                message: "Overloaded".to_string(),
            })
        );

        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ColloquyError::Llm(LlmError::RateLimited { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "nope"),
            ColloquyError::Llm(LlmError::InvalidApiKey { .. })
        ));
    }

    #[test]
    fn test_plain_text_error_body_is_kept() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(format!("{}", err).contains("upstream down"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = AnthropicClient::new(&AnthropicConfig::new("sk-secret"));
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
