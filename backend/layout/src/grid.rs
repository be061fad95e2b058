use canvaspilot_core::Position;

use crate::{Frame, LayoutError, Placement};

/// Grid arrangement parameters. `columns` and `rows` are mutually exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct GridParams {
    pub columns: Option<usize>,
    pub rows: Option<usize>,
    pub spacing: f64,
    /// Defaults to the widest target.
    pub cell_width: Option<f64>,
    /// Defaults to the tallest target.
    pub cell_height: Option<f64>,
    /// Each axis defaults to the top-left corner of the targets' bounding box.
    pub origin_x: Option<f64>,
    pub origin_y: Option<f64>,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            columns: None,
            rows: None,
            spacing: 20.0,
            cell_width: None,
            cell_height: None,
            origin_x: None,
            origin_y: None,
        }
    }
}

/// Resolve `(columns, rows)` for `n` items.
///
/// With neither given the grid is roughly square: `ceil(sqrt(n))` columns.
pub fn grid_dimensions(
    n: usize,
    columns: Option<usize>,
    rows: Option<usize>,
) -> Result<(usize, usize), LayoutError> {
    let columns = match (columns, rows) {
        (Some(_), Some(_)) => {
            return Err(LayoutError::InvalidParameter(
                "columns and rows are mutually exclusive".to_string(),
            ))
        }
        (Some(0), None) | (None, Some(0)) => {
            return Err(LayoutError::InvalidParameter(
                "columns and rows must be at least 1".to_string(),
            ))
        }
        (Some(c), None) => c,
        (None, Some(r)) => n.div_ceil(r).max(1),
        (None, None) => ((n as f64).sqrt().ceil() as usize).max(1),
    };
    let rows = n.div_ceil(columns).max(1);
    Ok((columns, rows))
}

/// `(column, row)` of each linear index, row-major.
pub fn grid_cells(
    n: usize,
    columns: Option<usize>,
    rows: Option<usize>,
) -> Result<Vec<(usize, usize)>, LayoutError> {
    let (columns, _) = grid_dimensions(n, columns, rows)?;
    Ok((0..n).map(|i| (i % columns, i / columns)).collect())
}

pub fn grid(targets: &[Frame], params: &GridParams) -> Result<Vec<Placement>, LayoutError> {
    if params.spacing < 0.0 {
        return Err(LayoutError::InvalidParameter("spacing must be non-negative".to_string()));
    }
    let cells = grid_cells(targets.len(), params.columns, params.rows)?;

    let cell_width = params
        .cell_width
        .unwrap_or_else(|| targets.iter().map(|f| f.width).fold(0.0, f64::max));
    let cell_height = params
        .cell_height
        .unwrap_or_else(|| targets.iter().map(|f| f.height).fold(0.0, f64::max));
    let corner = bounding_origin(targets);
    let origin = Position::new(
        params.origin_x.unwrap_or(corner.x),
        params.origin_y.unwrap_or(corner.y),
    );

    Ok(targets
        .iter()
        .zip(cells)
        .map(|(frame, (col, row))| Placement {
            object_id: frame.id,
            position: origin.offset(
                col as f64 * (cell_width + params.spacing),
                row as f64 * (cell_height + params.spacing),
            ),
        })
        .collect())
}

fn bounding_origin(targets: &[Frame]) -> Position {
    if targets.is_empty() {
        return Position::default();
    }
    let min_x = targets.iter().map(|f| f.position.x).fold(f64::INFINITY, f64::min);
    let min_y = targets.iter().map(|f| f.position.y).fold(f64::INFINITY, f64::min);
    Position::new(min_x, min_y)
}
