//! Command dispatcher.
//!
//! One invocation walks `BuildingContext -> AwaitingProvider -> Normalizing
//! -> Executing -> Done`. A provider failure short-circuits to `Err`; once
//! the provider has answered, the command always ends in `Ok` with one
//! result per normalized call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use canvaspilot_core::{
    AdapterError, CommandOutcome, CommandRequest, DispatchError, LlmProvider, ObjectStore,
    ProviderReply,
};
use canvaspilot_executor::{ExecContext, Executor, DEFAULT_MAX_COUNT};
use canvaspilot_logging::{EventLogger, PipelineEvent};
use canvaspilot_planner::normalize;

use crate::prompt::{PromptBuilder, DEFAULT_MAX_CONTEXT_OBJECTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPhase {
    BuildingContext,
    AwaitingProvider,
    Normalizing,
    Executing,
    Done,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchPhase::BuildingContext => "building_context",
            DispatchPhase::AwaitingProvider => "awaiting_provider",
            DispatchPhase::Normalizing => "normalizing",
            DispatchPhase::Executing => "executing",
            DispatchPhase::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_context_objects: usize,
    /// Upper bound on `count` for a single creation call.
    pub max_count: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.2,
            max_context_objects: DEFAULT_MAX_CONTEXT_OBJECTS,
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

/// Turns one natural-language command into canvas mutations.
///
/// Holds no per-command state; concurrent `execute_command` calls are
/// independent.
pub struct CommandDispatcher {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ObjectStore>,
    executor: Executor,
    prompt: PromptBuilder,
    settings: DispatcherSettings,
}

impl CommandDispatcher {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn ObjectStore>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            provider,
            executor: Executor::new(store.clone()),
            store,
            prompt: PromptBuilder::new(settings.max_context_objects),
            settings,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    #[instrument(skip(self, request), fields(canvas_id = %request.canvas_id, provider = self.provider.name()))]
    pub async fn execute_command(
        &self,
        command_id: Uuid,
        request: &CommandRequest,
    ) -> Result<CommandOutcome, DispatchError> {
        let id = command_id.to_string();

        enter(&id, DispatchPhase::BuildingContext);
        let objects = self.store.list_objects(request.canvas_id)?;
        let provider_request = self.prompt.build_request(
            request,
            &objects,
            self.settings.max_tokens,
            self.settings.temperature,
        );
        debug!(
            objects = objects.len(),
            history = provider_request.context.len(),
            "Context built"
        );

        enter(&id, DispatchPhase::AwaitingProvider);
        let reply = match self.provider.call(&provider_request).await {
            Ok(reply) => reply,
            Err(err) => return Err(fail(&id, err)),
        };

        let raw = match reply {
            ProviderReply::Text(text) => {
                info!("Provider answered without tool calls");
                return Ok(finish(&id, CommandOutcome::Text(text)));
            }
            ProviderReply::ToolCalls(raw) => raw,
        };

        enter(&id, DispatchPhase::Normalizing);
        let calls = match normalize(&raw) {
            Ok(calls) => calls,
            Err(err) => return Err(fail(&id, AdapterError::from(err))),
        };
        for call in &calls {
            EventLogger::log_event(
                &id,
                PipelineEvent::ToolCall {
                    call_id: call.call_id.clone(),
                    tool_name: call.name.to_string(),
                    arguments_json: serde_json::to_string(&call.input).unwrap_or_default(),
                },
            );
        }
        if calls.len() < raw.len() {
            warn!(dropped = raw.len() - calls.len(), "Unknown tool calls dropped");
        }

        enter(&id, DispatchPhase::Executing);
        let ctx = ExecContext::from_request(request, self.settings.max_count);
        let results = self.executor.execute(&calls, &ctx);

        Ok(finish(&id, CommandOutcome::Applied(results)))
    }
}

fn enter(command_id: &str, phase: DispatchPhase) {
    debug!(%phase, "Dispatch phase");
    EventLogger::log_event(
        command_id,
        PipelineEvent::Phase {
            phase: phase.to_string(),
        },
    );
}

fn fail(command_id: &str, err: AdapterError) -> DispatchError {
    if err.is_rate_limited() {
        // Single attempt: throttling is reported, not retried.
        warn!(error = %err, "Provider is throttling; not retrying");
    } else {
        warn!(error = %err, "Provider step failed");
    }
    EventLogger::log_event(
        command_id,
        PipelineEvent::Error {
            error_msg: err.to_string(),
        },
    );
    DispatchError::from(err)
}

fn finish(command_id: &str, outcome: CommandOutcome) -> CommandOutcome {
    enter(command_id, DispatchPhase::Done);
    let summary = outcome.summary();
    info!(%summary, "Command finished");
    EventLogger::log_event(command_id, PipelineEvent::Outcome { summary });
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvaspilot_core::{
        CanvasId, Interaction, ObjectAttrs, ObjectKind, Position, RawToolCall, ToolError, ToolName,
        ToolValue,
    };
    use canvaspilot_planner::MockProvider;
    use canvaspilot_store::MemoryStore;
    use serde_json::json;

    fn setup(provider: MockProvider) -> (CommandDispatcher, Arc<MockProvider>, Arc<MemoryStore>, CanvasId) {
        let store = Arc::new(MemoryStore::new());
        let canvas = store.create_canvas("test").unwrap();
        let provider = Arc::new(provider);
        let dispatcher =
            CommandDispatcher::new(provider.clone(), store.clone(), DispatcherSettings::default());
        (dispatcher, provider, store, canvas)
    }

    #[tokio::test]
    async fn test_tool_calls_are_normalized_and_executed() {
        let (dispatcher, provider, store, canvas) = setup(MockProvider::new("mock").with_tool_calls(vec![
            RawToolCall::new("a", "create_rectangle", json!({ "x": "10", "y": 20, "count": 3 })),
            RawToolCall::new("b", "create_circle", json!({ "x": 300, "y": 300 })),
        ]));

        let outcome = dispatcher
            .execute_command(Uuid::new_v4(), &CommandRequest::new(canvas, "three boxes and a ball"))
            .await
            .unwrap();

        let results = outcome.results();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(outcome.summary(), "created 4, updated 0, deleted 0, 0 failed");
        assert_eq!(store.list_objects(canvas).unwrap().len(), 4);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_text_reply_is_not_an_error() {
        let (dispatcher, _, store, canvas) =
            setup(MockProvider::new("mock").with_response("I can only edit the canvas."));

        let outcome = dispatcher
            .execute_command(Uuid::new_v4(), &CommandRequest::new(canvas, "what is 2+2?"))
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Text("I can only edit the canvas.".into()));
        assert!(store.list_objects(canvas).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_short_circuits() {
        let (dispatcher, _, store, canvas) = setup(MockProvider::new("mock").with_error(
            AdapterError::UpstreamError {
                status: 429,
                body: "slow down".into(),
            },
        ));

        let err = dispatcher
            .execute_command(Uuid::new_v4(), &CommandRequest::new(canvas, "draw"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::Upstream {
                status: 429,
                body: "slow down".into()
            }
        );
        assert!(err.user_message().contains("too many requests"));
        assert!(store.list_objects(canvas).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_canvas_fails_before_provider_call() {
        let (dispatcher, provider, _, _) = setup(MockProvider::new("mock"));
        let missing = Uuid::new_v4();

        let err = dispatcher
            .execute_command(Uuid::new_v4(), &CommandRequest::new(missing, "draw"))
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::CanvasNotFound(missing));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_malformed_response() {
        let (dispatcher, _, _, canvas) = setup(MockProvider::new("mock").with_tool_calls(vec![
            RawToolCall::new("a", "create_circle", json!("{not json")),
        ]));

        let err = dispatcher
            .execute_command(Uuid::new_v4(), &CommandRequest::new(canvas, "circle"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unknown_tools_dropped_and_failures_isolated() {
        let (dispatcher, _, store, canvas) = setup(MockProvider::new("mock").with_tool_calls(vec![
            RawToolCall::new("a", "paint_sky", json!({})),
            RawToolCall::new("b", "delete_object", json!({ "object_ids": [999] })),
            RawToolCall::new("c", "create_text", json!({ "text": "hello" })),
        ]));

        let outcome = dispatcher
            .execute_command(Uuid::new_v4(), &CommandRequest::new(canvas, "mixed"))
            .await
            .unwrap();

        let results = outcome.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool, ToolName::DeleteObject);
        assert_eq!(results[0].result, Err(ToolError::ObjectNotFound(999)));
        assert_eq!(results[1].tool, ToolName::CreateText);
        assert!(results[1].is_ok());
        assert_eq!(store.list_objects(canvas).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_selection_and_history_reach_provider_and_executor() {
        let store = Arc::new(MemoryStore::new());
        let canvas = store.create_canvas("test").unwrap();
        let created = store
            .insert_batch(
                canvas,
                &[ObjectAttrs::new(ObjectKind::Rectangle, Position::new(0.0, 0.0))
                    .with("width", 50)
                    .with("height", 50)],
            )
            .unwrap();
        let target = created[0].id;

        let provider = Arc::new(MockProvider::new("mock").with_tool_calls(vec![RawToolCall::new(
            "a",
            "update_style",
            json!({ "fill": "#ff0000" }),
        )]));
        let dispatcher =
            CommandDispatcher::new(provider.clone(), store.clone(), DispatcherSettings::default());

        let mut request = CommandRequest::new(canvas, "make this red").with_selection(vec![target]);
        request
            .context
            .recent
            .push(Interaction::new("add a square", "created 1, updated 0, deleted 0, 0 failed"));

        let outcome = dispatcher.execute_command(Uuid::new_v4(), &request).await.unwrap();
        match &outcome.results()[0].result {
            Ok(ToolValue::Object(object)) => assert_eq!(object.fill(), Some("#ff0000")),
            other => panic!("unexpected result {other:?}"),
        }

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].context.len(), 2);
        assert!(sent[0].prompt.contains(&format!("SELECTED: #{target}")));
        assert!(sent[0].prompt.contains(&format!("#{target} rectangle")));
    }
}
