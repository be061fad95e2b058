//! Object store implementations.
//!
//! Both stores treat writes through `ObjectStore` as coming from the
//! assistant: an object locked by any user rejects them.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use canvaspilot_core::{ObjectAttrs, StoreError};

/// Summary row for a canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasInfo {
    pub id: canvaspilot_core::CanvasId,
    pub name: String,
    pub object_count: usize,
}

/// Reject rows the renderer could never place.
pub(crate) fn validate_row(index: usize, row: &ObjectAttrs) -> Result<(), StoreError> {
    if !row.position.x.is_finite() || !row.position.y.is_finite() {
        return Err(StoreError::ConstraintViolation(format!(
            "row {index}: position must be finite"
        )));
    }
    Ok(())
}

pub(crate) fn locked_error(id: canvaspilot_core::ObjectId, owner: &str) -> StoreError {
    StoreError::ConstraintViolation(format!("object {id} is locked by {owner}"))
}
