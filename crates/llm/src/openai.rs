//! [`LlmProvider`] implementation for OpenAI-compatible chat-completions APIs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pipeline::{Completion, CompletionRequest, LlmError, LlmProvider, TokenCount};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use crate::config::{ProviderConfig, ProviderError};
use crate::wire::{ChatRequest, ChatResponse, ErrorEnvelope};

/// Longest slice of an error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Chat-completions client. Cheap to share: one instance per process.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ProviderError::InvalidBaseUrl {
                url: config.base_url.clone(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            config,
        })
    }

    fn transport_error(&self, err: &reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                after: self.config.request_timeout,
            }
        } else {
            LlmError::Network {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = ChatRequest::new(&self.config.generation, &request.prompt);
        let start = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        tracing::debug!(
            model = self.config.generation.model.as_str(),
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            body_bytes = text.len(),
            "chat completion response"
        );

        if !status.is_success() {
            return Err(error_for_status(status, retry_after, &text));
        }
        decode_completion(status, &text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Maps a non-2xx response onto the error taxonomy.
fn error_for_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> LlmError {
    let message = error_message(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Authentication { message },
        _ => LlmError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

/// Extracts the first choice's text from a 2xx body.
///
/// A `null` content is treated as empty text; a body without choices is an
/// API error.
fn decode_completion(status: StatusCode, body: &str) -> Result<Completion, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| LlmError::Api {
        status: status.as_u16(),
        message: format!("malformed response envelope: {e}"),
    })?;
    let choice = parsed.choices.into_iter().next().ok_or_else(|| LlmError::Api {
        status: status.as_u16(),
        message: "response contained no choices".to_string(),
    })?;
    Ok(Completion {
        text: choice.message.content.unwrap_or_default(),
        output_tokens: parsed.usage.map(|u| TokenCount::new(u.completion_tokens)),
    })
}

/// Parses a `Retry-After` value given in (possibly fractional) seconds.
///
/// HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::RetryPolicy;

    #[test]
    fn test_rate_limit_keeps_retry_after() {
        let err = error_for_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            r#"{"error":{"message":"slow down"}}"#,
        );
        assert_eq!(
            err,
            LlmError::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn test_auth_failures_use_envelope_message() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = error_for_status(
                status,
                None,
                r#"{"error":{"message":"Incorrect API key provided"}}"#,
            );
            assert_eq!(
                err,
                LlmError::Authentication {
                    message: "Incorrect API key provided".into()
                }
            );
        }
    }

    #[test]
    fn test_server_error_is_api_error_with_raw_body() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, None, "  upstream unavailable ");
        assert_eq!(
            err,
            LlmError::Api {
                status: 502,
                message: "upstream unavailable".into()
            }
        );
        assert!(matches!(err.retry_policy(), RetryPolicy::Retryable { .. }));
    }

    #[test]
    fn test_client_error_is_not_retryable() {
        let err = error_for_status(StatusCode::BAD_REQUEST, None, "{}");
        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn test_decode_first_choice_with_usage() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "[]"}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 50, "completion_tokens": 2, "total_tokens": 52}
        }"#;
        let completion = decode_completion(StatusCode::OK, body).unwrap();
        assert_eq!(completion.text, "[]");
        assert_eq!(completion.output_tokens, Some(TokenCount::new(2)));
    }

    #[test]
    fn test_decode_rejects_empty_choices_and_garbage() {
        assert!(matches!(
            decode_completion(StatusCode::OK, r#"{"choices":[]}"#),
            Err(LlmError::Api { status: 200, .. })
        ));
        assert!(matches!(
            decode_completion(StatusCode::OK, "<html>"),
            Err(LlmError::Api { status: 200, .. })
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("20"), Some(Duration::from_secs(20)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
        assert_eq!(parse_retry_after("1e20"), None);
        assert_eq!(parse_retry_after("inf"), None);
        assert_eq!(parse_retry_after("NaN"), None);
    }

    #[test]
    fn test_new_rejects_empty_key_and_bad_url() {
        assert!(matches!(
            OpenAiProvider::new(ProviderConfig::new("  ")),
            Err(ProviderError::MissingApiKey)
        ));
        assert!(matches!(
            OpenAiProvider::new(ProviderConfig::new("k").with_base_url("api.openai.com")),
            Err(ProviderError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on loopback is closed in test environments.
        let provider = OpenAiProvider::new(
            ProviderConfig::new("k")
                .with_base_url("http://127.0.0.1:9/v1")
                .with_request_timeout(Duration::from_secs(5)),
        )
        .unwrap();
        let err = provider
            .complete(CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Network { .. } | LlmError::Timeout { .. }
        ));
    }
}
