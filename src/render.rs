//! Output rendering.
//!
//! Results are rendered under the plan's title as an ASCII table (like the
//! MySQL CLI), a Markdown table, or a JSON document.

use crate::models::QueryResult;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// JSON document with title, columns and rows
    Json,
}

/// Render `result` under `title` in the requested format.
pub fn render(title: &str, result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_as_table(title, result),
        OutputFormat::Markdown => format_as_markdown(title, result),
        OutputFormat::Json => format_as_json(title, result),
    }
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Cell text on a single line; embedded newlines would break the grid.
fn cell_text(value: &JsonValue) -> String {
    format_value(value).replace(['\n', '\r'], " ")
}

fn centered(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

fn padded(text: &str, width: usize, right_align: bool) -> String {
    let pad = " ".repeat(width.saturating_sub(text.width()));
    if right_align {
        format!("{}{}", pad, text)
    } else {
        format!("{}{}", text, pad)
    }
}

pub fn format_as_table(title: &str, result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return format!("{}\nEmpty set\n", title);
    }

    let columns = &result.columns;
    let cells: Vec<Vec<(String, bool)>> = result
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| {
                    let value = row.get(col).unwrap_or(&JsonValue::Null);
                    (cell_text(value), matches!(value, JsonValue::Number(_)))
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in &cells {
        for (i, (text, _)) in row.iter().enumerate() {
            widths[i] = widths[i].max(text.width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";
    let total_width = separator.trim_end().width();

    let mut output = String::new();
    output.push_str(centered(title, total_width).trim_end());
    output.push('\n');

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", centered(col, *w)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &cells {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|((text, numeric), w)| format!("| {} ", padded(text, *w, *numeric)))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let seconds = result.execution_time_ms as f64 / 1000.0;
    let footer = match result.row_count() {
        0 => format!("Empty set ({:.2} sec)\n", seconds),
        1 => format!("1 row in set ({:.2} sec)\n", seconds),
        n => format!("{} rows in set ({:.2} sec)\n", n, seconds),
    };
    output.push_str(&footer);

    output
}

pub fn format_as_markdown(title: &str, result: &QueryResult) -> String {
    let mut output = format!("### {}\n\n", title);

    if result.columns.is_empty() {
        output.push_str("*Empty set*\n");
        return output;
    }

    let header: String = result
        .columns
        .iter()
        .map(|c| format!("| {} ", c))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = result.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let row_str: String = result
            .columns
            .iter()
            .map(|col| {
                let value = row.get(col).unwrap_or(&JsonValue::Null);
                format!("| {} ", cell_text(value).replace('|', "\\|"))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*\n", result.row_count()));

    output
}

pub fn format_as_json(title: &str, result: &QueryResult) -> String {
    let document = serde_json::json!({
        "title": title,
        "columns": result.columns,
        "rows": result.rows,
    });
    let mut output = serde_json::to_string_pretty(&document).unwrap_or_default();
    output.push('\n');
    output
}
