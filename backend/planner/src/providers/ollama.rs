use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use canvaspilot_core::{AdapterError, LlmProvider, ProviderReply, ProviderRequest, RawToolCall, Role};

use super::{decode_response, http_client, transport_error, DEFAULT_REQUEST_TIMEOUT};

/// Ollama local LLM provider. Needs no credential.
pub struct OllamaProvider {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            model: model.into(),
            base_url: "http://localhost:11434".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage<'a>>,
    tools: Vec<Value>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    eval_count: Option<u64>,
    prompt_eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn reply_from_message(message: OllamaResponseMessage) -> ProviderReply {
    let tool_calls = message.tool_calls.unwrap_or_default();
    if tool_calls.is_empty() {
        return ProviderReply::Text(message.content.unwrap_or_default());
    }
    // Ollama does not assign call ids; the normalizer fills them in.
    ProviderReply::ToolCalls(
        tool_calls
            .into_iter()
            .map(|tc| RawToolCall {
                call_id: None,
                name: tc.function.name,
                input: tc.function.arguments,
            })
            .collect(),
    )
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderReply, AdapterError> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(request.context.len() + 2);
        if !request.system_prompt.is_empty() {
            messages.push(OllamaChatMessage {
                role: Role::System,
                content: &request.system_prompt,
            });
        }
        messages.extend(request.context.iter().map(|m| OllamaChatMessage {
            role: m.role,
            content: &m.content,
        }));
        messages.push(OllamaChatMessage {
            role: Role::User,
            content: &request.prompt,
        });

        // Strip any provider prefix like "ollama/"
        let model = self.model.rsplit('/').next().unwrap_or(&self.model);

        let body = OllamaChatRequest {
            model,
            messages,
            tools: request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(model = %model, "Sending request to Ollama");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("ollama", e))?;

        let parsed: OllamaChatResponse = decode_response("ollama", response).await?;
        let tokens_used = parsed.eval_count.unwrap_or(0) + parsed.prompt_eval_count.unwrap_or(0);

        debug!(
            tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Ollama response received"
        );

        Ok(reply_from_message(parsed.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_calls_have_no_ids() {
        let response: OllamaChatResponse = serde_json::from_value(json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "arrange_grid", "arguments": { "columns": 3 } } }
                ]
            },
            "eval_count": 12
        }))
        .unwrap();
        match reply_from_message(response.message) {
            ProviderReply::ToolCalls(calls) => {
                assert!(calls[0].call_id.is_none());
                assert_eq!(calls[0].input["columns"], 3);
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn test_null_fields_are_text() {
        let response: OllamaChatResponse = serde_json::from_value(json!({
            "message": { "role": "assistant", "content": "done", "tool_calls": null }
        }))
        .unwrap();
        assert_eq!(reply_from_message(response.message), ProviderReply::Text("done".to_string()));

        let response: OllamaChatResponse = serde_json::from_value(json!({
            "message": { "role": "assistant", "content": null }
        }))
        .unwrap();
        assert_eq!(reply_from_message(response.message), ProviderReply::Text(String::new()));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        let provider = OllamaProvider::new("llama3")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(500));
        let request = ProviderRequest {
            system_prompt: String::new(),
            prompt: "hi".to_string(),
            tools: Vec::new(),
            context: Vec::new(),
            max_tokens: 16,
            temperature: 0.0,
        };
        let err = provider.call(&request).await.unwrap_err();
        assert!(matches!(err, AdapterError::TransportFailure(_)));
    }
}
