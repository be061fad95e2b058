use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, info, warn};

use canvaspilot_core::{
    CanvasId, CanvasObject, CommandRequest, NormalizedToolCall, ObjectAttrs, ObjectId,
    ObjectStore, ToolError, ToolResult, ToolValue, Viewport,
};

use crate::{create, handlers};

/// Upper bound on `count` for one creation call.
pub const DEFAULT_MAX_COUNT: u64 = 200;

/// Per-command state the handlers need besides their own parameters.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub canvas_id: CanvasId,
    pub selected_ids: Vec<ObjectId>,
    pub current_color: String,
    pub viewport: Viewport,
    pub max_count: u64,
}

impl ExecContext {
    pub fn from_request(request: &CommandRequest, max_count: u64) -> Self {
        Self {
            canvas_id: request.canvas_id,
            selected_ids: request.selected_ids.clone(),
            current_color: request.context.current_color.clone(),
            viewport: request.context.viewport,
            max_count,
        }
    }
}

/// How one creation call contributed to the batch.
enum CreatePlan {
    Rows(Range<usize>),
    Invalid(ToolError),
}

/// Splits normalized calls into one atomic batch insert plus individual
/// calls, then re-interleaves the results into call order.
pub struct Executor {
    store: Arc<dyn ObjectStore>,
}

impl Executor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn execute(&self, calls: &[NormalizedToolCall], ctx: &ExecContext) -> Vec<ToolResult> {
        // 1-2. Partition and expand creation calls into one ordered batch.
        let mut rows: Vec<ObjectAttrs> = Vec::new();
        let mut plans: Vec<Option<CreatePlan>> = Vec::with_capacity(calls.len());
        for call in calls {
            if !call.name.is_creation() {
                plans.push(None);
                continue;
            }
            let plan = match create::expand(call, ctx) {
                Ok(expanded) => {
                    let start = rows.len();
                    rows.extend(expanded);
                    CreatePlan::Rows(start..rows.len())
                }
                Err(e) => {
                    debug!(call_id = %call.call_id, tool = %call.name, error = %e, "Creation call rejected");
                    CreatePlan::Invalid(e)
                }
            };
            plans.push(Some(plan));
        }

        // 3. One atomic insert for every row.
        let batch = self.insert_batch(ctx.canvas_id, &rows);

        // 4. Individual calls, in their original relative order.
        let mut individual = calls
            .iter()
            .filter(|c| !c.name.is_creation())
            .map(|call| {
                let result = handlers::run(self.store.as_ref(), call, ctx);
                if let Err(e) = &result {
                    debug!(call_id = %call.call_id, tool = %call.name, error = %e, "Tool call failed");
                }
                match result {
                    Ok(value) => ToolResult::ok(call, value),
                    Err(e) => ToolResult::err(call, e),
                }
            })
            .collect::<Vec<_>>()
            .into_iter();

        // 5. Re-interleave by original index.
        let mut results = Vec::with_capacity(calls.len());
        for (call, plan) in calls.iter().zip(plans) {
            let result = match plan {
                None => match individual.next() {
                    Some(result) => result,
                    None => ToolResult::err(call, ToolError::validation("missing individual result")),
                },
                Some(CreatePlan::Invalid(e)) => ToolResult::err(call, e),
                Some(CreatePlan::Rows(range)) => match &batch {
                    Ok(created) => {
                        let mut objects = created[range].to_vec();
                        if call.count() > 1 {
                            ToolResult::ok(call, ToolValue::ObjectList(objects))
                        } else {
                            ToolResult::ok(call, ToolValue::Object(objects.remove(0)))
                        }
                    }
                    Err(reason) => ToolResult::err(call, ToolError::BatchAborted(reason.clone())),
                },
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(
            canvas_id = %ctx.canvas_id,
            calls = calls.len(),
            batch_rows = rows.len(),
            failed,
            "Tool calls executed"
        );
        results
    }

    /// All-or-nothing. A store that returns the wrong number of rows is
    /// treated as a failed batch.
    fn insert_batch(&self, canvas_id: CanvasId, rows: &[ObjectAttrs]) -> Result<Vec<CanvasObject>, String> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        match self.store.insert_batch(canvas_id, rows) {
            Ok(created) if created.len() == rows.len() => Ok(created),
            Ok(created) => {
                warn!(expected = rows.len(), got = created.len(), "Batch insert returned wrong row count");
                Err(format!(
                    "store returned {} objects for {} rows",
                    created.len(),
                    rows.len()
                ))
            }
            Err(e) => {
                warn!(canvas_id = %canvas_id, rows = rows.len(), error = %e, "Batch insert failed");
                Err(e.to_string())
            }
        }
    }
}
