pub mod error;
pub mod message;
pub mod schema;
pub mod tool;
pub mod traits;
pub mod types;

pub use error::{AdapterError, DispatchError, StoreError, ToolError};
pub use message::{Interaction, Message, Role};
pub use schema::{canvas_tools, ToolSpec};
pub use tool::{
    CommandOutcome, NormalizedToolCall, OutcomeCounts, RawToolCall, ToolName, ToolResult,
    ToolValue,
};
pub use traits::{LlmProvider, ObjectStore, ProviderReply, ProviderRequest};
pub use types::{
    CanvasId, CanvasObject, CommandContext, CommandRequest, ObjectAttrs, ObjectId, ObjectKind,
    ObjectPatch, Position, RenderData, Viewport, DEFAULT_OBJECT_SIZE,
};
