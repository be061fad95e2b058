use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CanvasId, ObjectId};

/// Failure of a single provider adapter call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("no API key configured for provider '{0}'")]
    MissingCredential(String),

    #[error("provider returned {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl AdapterError {
    /// 429 and 529 are the statuses providers use for throttling and overload.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AdapterError::UpstreamError { status: 429 | 529, .. })
    }
}

/// Errors that abort an entire command. Surfaced as the sole outcome.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("missing credential for provider '{0}'")]
    MissingCredential(String),

    #[error("upstream provider error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("canvas {0} not found")]
    CanvasNotFound(CanvasId),

    #[error("storage error: {0}")]
    Store(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("command task failed: {0}")]
    TaskFailure(String),

    #[error("command cancelled")]
    Cancelled,
}

impl DispatchError {
    /// One human-readable line for the issuing user.
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::MissingCredential(_) => {
                "The assistant is not configured: no provider API key is set.".to_string()
            }
            DispatchError::Upstream { status: 429, .. } => {
                "The assistant is receiving too many requests. Please try again shortly.".to_string()
            }
            DispatchError::Upstream { status: 529, .. } => {
                "The assistant is overloaded right now. Please try again shortly.".to_string()
            }
            DispatchError::Upstream { status, .. } => {
                format!("The assistant service returned an error (status {status}).")
            }
            DispatchError::Transport(_) => {
                "Could not reach the assistant service. Check your connection.".to_string()
            }
            DispatchError::MalformedResponse(_) => {
                "The assistant returned a response that could not be understood.".to_string()
            }
            DispatchError::CanvasNotFound(_) => "This canvas no longer exists.".to_string(),
            DispatchError::Store(_) => "The canvas could not be read.".to_string(),
            DispatchError::Timeout(_) => {
                "The command took too long and was stopped. Try a simpler request.".to_string()
            }
            DispatchError::TaskFailure(_) => "The command failed unexpectedly.".to_string(),
            DispatchError::Cancelled => "The command was cancelled.".to_string(),
        }
    }
}

impl From<AdapterError> for DispatchError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::MissingCredential(provider) => DispatchError::MissingCredential(provider),
            AdapterError::UpstreamError { status, body } => DispatchError::Upstream { status, body },
            AdapterError::TransportFailure(reason) => DispatchError::Transport(reason),
            AdapterError::MalformedResponse(reason) => DispatchError::MalformedResponse(reason),
        }
    }
}

/// Failure local to one tool call. Never aborts sibling calls.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ToolError {
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("invalid parameters: {0}")]
    ValidationFailure(String),

    #[error("rejected by store: {0}")]
    Rejected(String),

    #[error("batch create aborted: {0}")]
    BatchAborted(String),

    #[error("storage error: {0}")]
    Store(String),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError::ValidationFailure(message.into())
    }
}

/// Errors reported by the persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("object {0} not found")]
    NotFound(ObjectId),

    #[error("canvas {0} not found")]
    CanvasNotFound(CanvasId),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ToolError::ObjectNotFound(id),
            StoreError::ConstraintViolation(reason) => ToolError::Rejected(reason),
            other => ToolError::Store(other.to_string()),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CanvasNotFound(id) => DispatchError::CanvasNotFound(id),
            other => DispatchError::Store(other.to_string()),
        }
    }
}
