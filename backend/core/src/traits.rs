use async_trait::async_trait;

use crate::error::{AdapterError, StoreError};
use crate::message::Message;
use crate::schema::ToolSpec;
use crate::tool::RawToolCall;
use crate::types::{CanvasId, CanvasObject, ObjectAttrs, ObjectId, ObjectPatch};

/// Request to a language-model backend.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub tools: Vec<ToolSpec>,
    /// Prior turns, oldest first.
    pub context: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// What a provider answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    ToolCalls(Vec<RawToolCall>),
    Text(String),
}

/// One language-model backend.
///
/// Adapters never retry; the dispatcher owns retry policy.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send the prompt and tool schema, returning raw tool calls or text.
    async fn call(&self, request: &ProviderRequest) -> Result<ProviderReply, AdapterError>;
}

/// The persistence collaborator. All operations are canvas-scoped.
pub trait ObjectStore: Send + Sync {
    /// Read-only listing used for prompt context and geometry lookups.
    fn list_objects(&self, canvas_id: CanvasId) -> Result<Vec<CanvasObject>, StoreError>;

    fn get_object(&self, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError>;

    /// Atomic: every row is persisted or none is. Results follow row order.
    fn insert_batch(
        &self,
        canvas_id: CanvasId,
        rows: &[ObjectAttrs],
    ) -> Result<Vec<CanvasObject>, StoreError>;

    fn update_one(
        &self,
        canvas_id: CanvasId,
        id: ObjectId,
        patch: &ObjectPatch,
    ) -> Result<CanvasObject, StoreError>;

    fn delete_one(&self, canvas_id: CanvasId, id: ObjectId) -> Result<CanvasObject, StoreError>;
}
