use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use canvaspilot_core::{AdapterError, LlmProvider, ProviderReply, ProviderRequest, RawToolCall};

/// A mock LLM provider that plays back scripted replies.
///
/// Replies are consumed in order; once the script is exhausted every call
/// answers with a fixed text. Requests are recorded for inspection.
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<Result<ProviderReply, AdapterError>>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.with_reply(Ok(ProviderReply::Text(response.into())))
    }

    pub fn with_tool_calls(self, calls: Vec<RawToolCall>) -> Self {
        self.with_reply(Ok(ProviderReply::ToolCalls(calls)))
    }

    pub fn with_error(self, error: AdapterError) -> Self {
        self.with_reply(Err(error))
    }

    pub fn with_reply(self, reply: Result<ProviderReply, AdapterError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderReply, AdapterError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(ProviderReply::Text("Mock response".to_string())))
    }
}
