use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use canvaspilot_agent::history::DEFAULT_HISTORY_CAPACITY;
use canvaspilot_agent::{CommandDispatcher, RecentInteractions};
use canvaspilot_core::{CanvasId, CommandOutcome, CommandRequest, DispatchError, Interaction};

use crate::events::CommandEvent;
use crate::slot::TerminalSlot;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_CAPACITY: usize = 256;

type Terminal = Result<CommandOutcome, DispatchError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Wall-clock limit per command, independent of the adapter's own timeout.
    pub command_timeout: Duration,
    /// Interactions remembered per canvas for prompt enrichment.
    pub history_capacity: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

struct Running {
    canvas_id: CanvasId,
    text: String,
    slot: Arc<TerminalSlot<Terminal>>,
    abort: AbortHandle,
}

struct Shared {
    events: broadcast::Sender<CommandEvent>,
    running: Mutex<HashMap<Uuid, Running>>,
    books: Mutex<HashMap<CanvasId, RecentInteractions>>,
    history_capacity: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Shared {
    fn publish(&self, event: CommandEvent) {
        debug!(command_id = %event.command_id(), kind = event.kind(), "Command event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Deliver the terminal outcome of a command. Only the first caller per
    /// command wins; every later signal is dropped without side effects.
    fn resolve(
        &self,
        command_id: Uuid,
        canvas_id: CanvasId,
        text: &str,
        slot: &TerminalSlot<Terminal>,
        result: Terminal,
    ) -> bool {
        let event = terminal_event(command_id, canvas_id, &result);
        let summary = result.as_ref().ok().map(CommandOutcome::summary);

        if !slot.resolve(result) {
            debug!(%command_id, kind = event.kind(), "Late terminal signal ignored");
            return false;
        }
        lock(&self.running).remove(&command_id);

        if let Some(summary) = summary {
            lock(&self.books)
                .entry(canvas_id)
                .or_insert_with(|| RecentInteractions::new(self.history_capacity))
                .push(Interaction::new(text, summary));
        }
        self.publish(event);
        true
    }
}

fn terminal_event(command_id: Uuid, canvas_id: CanvasId, result: &Terminal) -> CommandEvent {
    let at = Utc::now();
    match result {
        Ok(outcome) => CommandEvent::Completed {
            command_id,
            canvas_id,
            summary: outcome.summary(),
            outcome: outcome.clone(),
            at,
        },
        Err(DispatchError::Timeout(after)) => CommandEvent::TimedOut {
            command_id,
            canvas_id,
            after_ms: after.as_millis() as u64,
            at,
        },
        Err(DispatchError::Cancelled) => CommandEvent::Cancelled {
            command_id,
            canvas_id,
            at,
        },
        Err(err) => CommandEvent::Failed {
            command_id,
            canvas_id,
            error: err.to_string(),
            user_message: err.user_message(),
            at,
        },
    }
}

/// Waits for the single terminal outcome of one submitted command.
#[derive(Debug)]
pub struct CommandHandle {
    pub command_id: Uuid,
    pub canvas_id: CanvasId,
    rx: oneshot::Receiver<Terminal>,
}

impl CommandHandle {
    pub async fn wait(self) -> Terminal {
        self.rx.await.unwrap_or_else(|_| {
            Err(DispatchError::TaskFailure(
                "command ended without an outcome".to_string(),
            ))
        })
    }
}

/// Runs each command as its own task under a timeout, so callers never
/// block on the provider.
pub struct CommandSupervisor {
    dispatcher: Arc<CommandDispatcher>,
    settings: SupervisorSettings,
    shared: Arc<Shared>,
}

impl CommandSupervisor {
    pub fn new(dispatcher: Arc<CommandDispatcher>, settings: SupervisorSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            events,
            running: Mutex::new(HashMap::new()),
            books: Mutex::new(HashMap::new()),
            history_capacity: settings.history_capacity,
        });
        Self {
            dispatcher,
            settings,
            shared,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommandEvent> {
        self.shared.events.subscribe()
    }

    /// Recent interactions on a canvas, oldest first.
    pub fn recent(&self, canvas_id: CanvasId) -> Vec<Interaction> {
        lock(&self.shared.books)
            .get(&canvas_id)
            .map(RecentInteractions::snapshot)
            .unwrap_or_default()
    }

    pub fn running_count(&self) -> usize {
        lock(&self.shared.running).len()
    }

    /// Spawn the command and return immediately. Must be called inside a
    /// tokio runtime.
    ///
    /// A request without its own recent interactions gets the canvas's
    /// book injected.
    pub fn submit(&self, mut request: CommandRequest) -> CommandHandle {
        let command_id = Uuid::new_v4();
        let canvas_id = request.canvas_id;
        let text = request.text.clone();
        if request.context.recent.is_empty() {
            request.context.recent = self.recent(canvas_id);
        }

        let (slot, rx) = TerminalSlot::new();
        let slot = Arc::new(slot);
        info!(%command_id, %canvas_id, "Command submitted");
        self.shared.publish(CommandEvent::Started {
            command_id,
            canvas_id,
            text: text.clone(),
            at: Utc::now(),
        });

        // Held until the entry is registered, so a fast finish cannot race it.
        let mut running = lock(&self.shared.running);

        let dispatcher = self.dispatcher.clone();
        let mut work =
            tokio::spawn(async move { dispatcher.execute_command(command_id, &request).await });
        let abort = work.abort_handle();

        let shared = self.shared.clone();
        let watched = slot.clone();
        let limit = self.settings.command_timeout;
        let watched_text = text.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, &mut work).await {
                Ok(Ok(result)) => result,
                Ok(Err(join)) if join.is_cancelled() => Err(DispatchError::Cancelled),
                Ok(Err(join)) => {
                    error!(%command_id, error = %join, "Command task crashed");
                    Err(DispatchError::TaskFailure(join.to_string()))
                }
                Err(_) => {
                    work.abort();
                    warn!(%command_id, timeout = ?limit, "Command timed out");
                    Err(DispatchError::Timeout(limit))
                }
            };
            shared.resolve(command_id, canvas_id, &watched_text, &watched, result);
        });

        running.insert(
            command_id,
            Running {
                canvas_id,
                text,
                slot,
                abort,
            },
        );

        CommandHandle {
            command_id,
            canvas_id,
            rx,
        }
    }

    /// Submit and wait.
    pub async fn run(&self, request: CommandRequest) -> Terminal {
        self.submit(request).wait().await
    }

    /// Resolve a running command as `Cancelled` and abort its task.
    /// Returns `false` if the command already reached a terminal state.
    pub fn cancel(&self, command_id: Uuid) -> bool {
        let Some(running) = lock(&self.shared.running).remove(&command_id) else {
            return false;
        };
        let claimed = self.shared.resolve(
            command_id,
            running.canvas_id,
            &running.text,
            &running.slot,
            Err(DispatchError::Cancelled),
        );
        running.abort.abort();
        if claimed {
            info!(%command_id, "Command cancelled");
        }
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use canvaspilot_agent::DispatcherSettings;
    use canvaspilot_core::{
        AdapterError, LlmProvider, ObjectStore, ProviderReply, ProviderRequest, RawToolCall,
    };
    use canvaspilot_planner::MockProvider;
    use canvaspilot_store::MemoryStore;
    use serde_json::json;

    struct PanickingProvider;

    #[async_trait]
    impl LlmProvider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn call(&self, _request: &ProviderRequest) -> Result<ProviderReply, AdapterError> {
            panic!("provider blew up")
        }
    }

    fn supervisor(
        provider: Arc<dyn LlmProvider>,
        timeout: Duration,
    ) -> (CommandSupervisor, Arc<MemoryStore>, CanvasId) {
        let store = Arc::new(MemoryStore::new());
        let canvas = store.create_canvas("board").unwrap();
        let dispatcher = Arc::new(CommandDispatcher::new(
            provider,
            store.clone(),
            DispatcherSettings::default(),
        ));
        let settings = SupervisorSettings {
            command_timeout: timeout,
            ..SupervisorSettings::default()
        };
        (CommandSupervisor::new(dispatcher, settings), store, canvas)
    }

    #[tokio::test]
    async fn test_completed_command_emits_started_then_completed() {
        let provider = Arc::new(MockProvider::new("mock").with_tool_calls(vec![RawToolCall::new(
            "a",
            "create_circle",
            json!({ "x": 10, "y": 10 }),
        )]));
        let (supervisor, store, canvas) = supervisor(provider, Duration::from_secs(5));
        let mut events = supervisor.subscribe();

        let outcome = supervisor
            .run(CommandRequest::new(canvas, "a circle"))
            .await
            .unwrap();

        assert_eq!(outcome.summary(), "created 1, updated 0, deleted 0, 0 failed");
        assert_eq!(store.list_objects(canvas).unwrap().len(), 1);
        assert_eq!(events.recv().await.unwrap().kind(), "started");
        assert_eq!(events.recv().await.unwrap().kind(), "completed");
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn test_hung_provider_times_out_once() {
        let provider = Arc::new(MockProvider::new("mock").with_delay(Duration::from_secs(30)));
        let (supervisor, _, canvas) = supervisor(provider, Duration::from_millis(50));
        let mut events = supervisor.subscribe();

        let err = supervisor
            .run(CommandRequest::new(canvas, "never answers"))
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Timeout(Duration::from_millis(50)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(events.recv().await.unwrap().kind(), "started");
        assert_eq!(events.recv().await.unwrap().kind(), "timed_out");
        assert!(events.try_recv().is_err());
        assert!(supervisor.recent(canvas).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_resolves_cancelled_and_is_single_shot() {
        let provider = Arc::new(MockProvider::new("mock").with_delay(Duration::from_secs(30)));
        let (supervisor, _, canvas) = supervisor(provider, Duration::from_secs(5));

        let handle = supervisor.submit(CommandRequest::new(canvas, "slow"));
        let id = handle.command_id;
        assert!(supervisor.cancel(id));
        assert!(!supervisor.cancel(id));
        assert_eq!(handle.wait().await, Err(DispatchError::Cancelled));
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_task_failure() {
        let (supervisor, _, canvas) = supervisor(Arc::new(PanickingProvider), Duration::from_secs(5));
        let err = supervisor
            .run(CommandRequest::new(canvas, "boom"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TaskFailure(_)));
    }

    #[tokio::test]
    async fn test_failure_event_carries_user_message() {
        let provider = Arc::new(
            MockProvider::new("mock").with_error(AdapterError::MissingCredential("anthropic".into())),
        );
        let (supervisor, _, canvas) = supervisor(provider, Duration::from_secs(5));
        let mut events = supervisor.subscribe();

        let err = supervisor.run(CommandRequest::new(canvas, "draw")).await.unwrap_err();
        assert_eq!(err, DispatchError::MissingCredential("anthropic".into()));

        let _started = events.recv().await.unwrap();
        match events.recv().await.unwrap() {
            CommandEvent::Failed { user_message, .. } => {
                assert!(user_message.contains("no provider API key"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_history_is_recorded_and_injected() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_tool_calls(vec![RawToolCall::new("a", "create_text", json!({ "text": "hi" }))])
                .with_response("done"),
        );
        let (supervisor, _, canvas) = supervisor(provider.clone(), Duration::from_secs(5));

        supervisor.run(CommandRequest::new(canvas, "say hi")).await.unwrap();
        let recent = supervisor.recent(canvas);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].command, "say hi");

        supervisor.run(CommandRequest::new(canvas, "again")).await.unwrap();
        let requests = provider.requests();
        assert!(requests[0].context.is_empty());
        assert_eq!(requests[1].context.len(), 2);
        assert_eq!(requests[1].context[0].content, "say hi");
    }

    #[test]
    fn test_late_signal_after_resolution_is_ignored() {
        let shared = Shared {
            events: broadcast::channel(8).0,
            running: Mutex::new(HashMap::new()),
            books: Mutex::new(HashMap::new()),
            history_capacity: 10,
        };
        let mut rx = shared.events.subscribe();
        let (slot, _rx) = TerminalSlot::new();
        let id = Uuid::new_v4();
        let canvas = Uuid::new_v4();

        assert!(shared.resolve(id, canvas, "x", &slot, Err(DispatchError::Timeout(Duration::from_secs(30)))));
        assert!(!shared.resolve(id, canvas, "x", &slot, Ok(CommandOutcome::Text("late".into()))));

        assert_eq!(rx.try_recv().unwrap().kind(), "timed_out");
        assert!(rx.try_recv().is_err());
        assert!(lock(&shared.books).is_empty());
    }
}
