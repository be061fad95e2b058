use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use canvaspilot_core::{AdapterError, LlmProvider, ProviderReply, ProviderRequest, RawToolCall};

use super::{decode_response, http_client, require_key, transport_error, DEFAULT_REQUEST_TIMEOUT};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible chat completions provider (OpenAI, OpenRouter, and
/// other gateways speaking the same dialect).
///
/// Function arguments come back as a JSON-encoded string; they are passed
/// through untouched for the normalizer to parse.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: canvaspilot_core::Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    /// Some gateways send an explicit `null` on plain-text replies.
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn reply_from_response(response: ChatResponse) -> Result<ProviderReply, AdapterError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| AdapterError::MalformedResponse("openai: response had no choices".into()))?;

    let tool_calls = message.tool_calls.unwrap_or_default();
    if tool_calls.is_empty() {
        return Ok(ProviderReply::Text(message.content.unwrap_or_default()));
    }
    Ok(ProviderReply::ToolCalls(
        tool_calls
            .into_iter()
            .map(|tc| RawToolCall {
                call_id: tc.id,
                name: tc.function.name,
                input: tc.function.arguments,
            })
            .collect(),
    ))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderReply, AdapterError> {
        let api_key = require_key(self.name(), &self.api_key)?;
        let start = Instant::now();

        let mut messages = Vec::with_capacity(request.context.len() + 2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: canvaspilot_core::Role::System,
                content: &request.system_prompt,
            });
        }
        messages.extend(request.context.iter().map(|m| ChatMessage {
            role: m.role,
            content: &m.content,
        }));
        messages.push(ChatMessage {
            role: canvaspilot_core::Role::User,
            content: &request.prompt,
        });

        let tools: Vec<Value> = request
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
            .collect();

        let body = ChatRequest {
            model: &self.model,
            messages,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, base_url = %self.base_url, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("openai", e))?;

        let parsed: ChatResponse = decode_response("openai", response).await?;
        let tokens_used = parsed.usage.as_ref().and_then(|u| u.total_tokens).unwrap_or(0);

        debug!(
            tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Chat completion received"
        );

        reply_from_response(parsed)
    }
}
