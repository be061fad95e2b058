//! Batch Splitter & Executor.
//!
//! Creation calls are expanded and persisted through one atomic
//! multi-insert; every other call runs individually in call order. The
//! caller always gets exactly one `ToolResult` per input call, in input
//! order.

mod arrange;
mod create;
pub mod executor;
mod handlers;
pub mod params;

pub use executor::{ExecContext, Executor, DEFAULT_MAX_COUNT};
