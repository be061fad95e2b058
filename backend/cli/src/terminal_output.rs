//! Terminal rendering: notes, tables, command outcomes.

use canvaspilot_core::{CanvasObject, CommandOutcome, ToolResult, ToolValue};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Whether stdout should get ANSI colour (honours `NO_COLOR`).
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

/// Remove ANSI escape sequences, e.g. before measuring width.
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Print an info note to stdout.
pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}i{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

/// Print a warning note to stdout.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}!{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print an error note to stderr.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}x{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Print a success note to stdout.
pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}ok{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// Column alignment.
pub enum Align {
    Left,
    Right,
}

/// A table column: header text and alignment.
pub struct Column {
    pub header: String,
    pub align: Align,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align: Align::Left,
        }
    }

    pub fn right(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align: Align::Right,
        }
    }
}

/// Render rows under the given columns, padded to the widest cell.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| strip_ansi(&c.header).chars().count())
        .collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            widths[i] = widths[i].max(strip_ansi(cell).chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| pad(&c.header, widths[i], &c.align))
        .collect();
    out.push_str(&format!("  {}\n", header.join("  ").trim_end()));
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", sep.join("  ")));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| pad(row.get(i).map(String::as_str).unwrap_or(""), widths[i], &c.align))
            .collect();
        out.push_str(&format!("  {}\n", cells.join("  ").trim_end()));
    }
    out
}

fn pad(s: &str, width: usize, align: &Align) -> String {
    let fill = " ".repeat(width.saturating_sub(strip_ansi(s).chars().count()));
    match align {
        Align::Left => format!("{s}{fill}"),
        Align::Right => format!("{fill}{s}"),
    }
}

/// One table row per canvas object.
pub fn object_rows(objects: &[CanvasObject]) -> Vec<Vec<String>> {
    objects
        .iter()
        .map(|o| {
            vec![
                o.id.to_string(),
                o.kind.to_string(),
                format!("{:.0}", o.position.x),
                format!("{:.0}", o.position.y),
                format!("{:.0}x{:.0}", o.width(), o.height()),
                o.fill().unwrap_or("-").to_string(),
                o.text().unwrap_or("").to_string(),
            ]
        })
        .collect()
}

/// Columns matching `object_rows`.
pub fn object_columns() -> Vec<Column> {
    vec![
        Column::right("ID"),
        Column::left("KIND"),
        Column::right("X"),
        Column::right("Y"),
        Column::left("SIZE"),
        Column::left("FILL"),
        Column::left("TEXT"),
    ]
}

/// One line per tool result.
pub fn describe_result(result: &ToolResult) -> String {
    match &result.result {
        Ok(ToolValue::Object(o)) => format!("{} -> #{} {}", result.tool, o.id, o.kind),
        Ok(ToolValue::ObjectList(objects)) => {
            let ids: Vec<String> = objects.iter().map(|o| format!("#{}", o.id)).collect();
            format!("{} -> {}", result.tool, ids.join(", "))
        }
        Ok(ToolValue::Selection(ids)) => {
            let ids: Vec<String> = ids.iter().map(|id| format!("#{id}")).collect();
            format!("{} -> selected [{}]", result.tool, ids.join(", "))
        }
        Ok(ToolValue::Toggle { object, enabled }) => {
            let state = if *enabled { "visible" } else { "hidden" };
            format!("{} -> #{} {state}", result.tool, object.id)
        }
        Err(err) => format!("{} failed: {err}", result.tool),
    }
}

/// Print each tool result, then the outcome summary.
pub fn print_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Text(text) => note_info(text),
        CommandOutcome::Applied(results) => {
            for result in results {
                let line = describe_result(result);
                if result.is_ok() {
                    println!("  {line}");
                } else if supports_color() {
                    println!("  {RED}{line}{RESET}");
                } else {
                    println!("  {line}");
                }
            }
            note_success(&outcome.summary());
        }
    }
}
