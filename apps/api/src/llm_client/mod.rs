/// LLM Client: the single point of entry for every text-generation call.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Services depend on the `Synthesizer` trait; `LlmClient` is the production impl.
///
/// Calls are never retried here. A failed synthesis surfaces to the caller.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response contained no JSON object")]
    NoStructuredBlock,

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("no response within {0}s")]
    Timeout(u64),
}

/// The external text-generation boundary: prompt in, raw text out.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Calls the synthesizer and deserializes the first well-formed JSON object in its answer.
pub async fn synthesize_json<T: DeserializeOwned>(
    synthesizer: &dyn Synthesizer,
    prompt: &str,
    system: &str,
) -> Result<T, LlmError> {
    let raw = synthesizer.synthesize(prompt, system).await?;
    let block = extract_json_block(&raw).ok_or(LlmError::NoStructuredBlock)?;
    serde_json::from_str(block).map_err(LlmError::Parse)
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with a hard per-call deadline.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            timeout,
        })
    }

    /// Makes a single call to the Messages API, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await.map_err(|e| self.classify(e))?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }

    fn classify(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            LlmError::Http(err)
        }
    }
}

#[async_trait]
impl Synthesizer for LlmClient {
    async fn synthesize(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let response = tokio::time::timeout(self.timeout, self.call(prompt, system))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))??;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Returns the first balanced `{ ... }` span that parses as JSON.
/// Models often wrap the object in prose or fences; both are skipped.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let text = strip_json_fences(text);
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(&text[start..]) {
            let candidate = &text[start..start + end + 1];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return Some(candidate);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte offset of the brace closing the one at position 0, honoring string literals.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_block_surrounded_by_prose() {
        let input = "Sure! Here it is:\n{\"subject\": \"Weekly\", \"content\": \"## Themes\"}\nEnjoy.";
        assert_eq!(
            extract_json_block(input),
            Some("{\"subject\": \"Weekly\", \"content\": \"## Themes\"}")
        );
    }

    #[test]
    fn test_extract_block_ignores_braces_in_strings() {
        let input = r#"{"summary": "likes {curly} things", "n": {"a": 1}} trailing }"#;
        assert_eq!(
            extract_json_block(input),
            Some(r#"{"summary": "likes {curly} things", "n": {"a": 1}}"#)
        );
    }

    #[test]
    fn test_extract_block_skips_malformed_candidate() {
        let input = "{not json} then {\"ok\": true}";
        assert_eq!(extract_json_block(input), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_extract_block_none_without_object() {
        assert_eq!(extract_json_block("I cannot help with that."), None);
        assert_eq!(extract_json_block("{\"unterminated\": "), None);
    }
}
