use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use canvaspilot_core::{
    AdapterError, LlmProvider, ProviderReply, ProviderRequest, RawToolCall, Role,
};

use super::{decode_response, http_client, require_key, transport_error, DEFAULT_REQUEST_TIMEOUT};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider. Tool calls arrive as `tool_use` blocks.
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            model: model.into(),
            base_url: "https://api.anthropic.com".to_string(),
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
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

fn reply_from_blocks(blocks: Vec<ContentBlock>) -> ProviderReply {
    let mut calls = Vec::new();
    let mut text = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::ToolUse { id, name, input } => {
                calls.push(RawToolCall::new(id, name, input))
            }
            ContentBlock::Text { text: t } if !t.trim().is_empty() => text.push(t),
            _ => {}
        }
    }
    if calls.is_empty() {
        ProviderReply::Text(text.join("\n"))
    } else {
        ProviderReply::ToolCalls(calls)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderReply, AdapterError> {
        let api_key = require_key(self.name(), &self.api_key)?;
        let start = Instant::now();

        let mut messages: Vec<AnthropicMessage<'_>> = request
            .context
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: if m.role == Role::User { "user" } else { "assistant" },
                content: &m.content,
            })
            .collect();
        messages.push(AnthropicMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages,
            tools: request
                .tools
                .iter()
                .map(|t| AnthropicTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.input_schema,
                })
                .collect(),
        };

        debug!(model = %self.model, tools = request.tools.len(), "Sending request to Anthropic");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("anthropic", e))?;

        let parsed: MessagesResponse = decode_response("anthropic", response).await?;

        debug!(
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            latency_ms = start.elapsed().as_millis() as u64,
            "Anthropic response received"
        );

        Ok(reply_from_blocks(parsed.content))
    }
}
