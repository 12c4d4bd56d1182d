//! Plain-text rendering of chat entries and backend utility results.

use std::fmt::Write;

use invassist_chat::format::{display_rows, fmt_num, format_cell_limited, results_heading};
use invassist_chat::{ChatEntry, EntryMode, Role, TableData};
use invassist_core::config::ChatConfig;
use invassist_core::types::{ComparisonResponse, InvoiceResponse, Row};

/// Render one history entry.
pub fn render_entry(entry: &ChatEntry, config: &ChatConfig) -> String {
    let mut out = String::new();
    let time = entry.timestamp.format("%H:%M");
    match entry.role {
        Role::User => {
            let _ = writeln!(out, "[{}] you: {}", time, entry.content.as_deref().unwrap_or(""));
            return out;
        }
        Role::Assistant => {
            let _ = writeln!(out, "[{}] assistant:", time);
        }
    }

    match entry.mode {
        Some(EntryMode::Database) => {
            if let Some(table) = &entry.table {
                render_table(&mut out, table, config);
            }
        }
        Some(EntryMode::Hybrid) => {
            if let Some(block) = &entry.hybrid {
                render_table(&mut out, &block.table, config);
                if let Some(text) = &block.ai.analysis_text {
                    let _ = writeln!(out, "{}", text);
                }
                if let Some(svg) = &block.ai.chart_markup {
                    let _ = writeln!(out, "{}", chart_placeholder(svg));
                }
            }
        }
        Some(EntryMode::Model) if entry.is_chart() => {
            let svg = entry.content.as_deref().unwrap_or("");
            let _ = writeln!(out, "{}", chart_placeholder(svg));
        }
        _ => {
            let _ = writeln!(out, "{}", entry.content.as_deref().unwrap_or(""));
        }
    }

    let actions = entry.export_actions();
    if !actions.is_empty() {
        let hints: Vec<String> = actions
            .iter()
            .map(|a| format!("/export {} {}", a.kind, a.index))
            .collect();
        let _ = writeln!(out, "  exports: {}", hints.join("  "));
    }
    out
}

fn chart_placeholder(svg: &str) -> String {
    format!("[chart: {} bytes of SVG, export as PNG to view]", svg.len())
}

fn render_table(out: &mut String, table: &TableData, config: &ChatConfig) {
    let _ = writeln!(out, "{}", results_heading(table));
    if table.columns.is_empty() {
        return;
    }
    let rows = display_rows(table, config.display_row_limit);
    write_grid(out, &table.columns, rows, config.cell_max_chars);
    if (rows.len() as u64) < table.row_count {
        let _ = writeln!(
            out,
            "  showing {} of {} rows, export to Excel for the full result",
            rows.len(),
            table.row_count
        );
    }
}

/// Invoice columns shown as plain amounts.
const AMOUNT_COLUMNS: &[&str] = &["NetTotal", "TotalTax"];

fn write_grid(out: &mut String, columns: &[String], rows: &[Row], max_chars: usize) {
    write_grid_with(out, columns, rows, |value, col| {
        format_cell_limited(value, col, max_chars)
    });
}

fn write_grid_with<F>(out: &mut String, columns: &[String], rows: &[Row], cell: F)
where
    F: Fn(&serde_json::Value, &str) -> String,
{
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(col).map(|v| cell(v, col)).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let _ = writeln!(out, "  {}", line(columns));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "  {}", rule.join("-+-"));
    for row in &cells {
        let _ = writeln!(out, "  {}", line(row.as_slice()));
    }
}

/// Render invoice rows. Columns come from the first row.
pub fn render_invoices(rows: &[Row], config: &ChatConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Invoices ({})", rows.len());
    let Some(first) = rows.first() else {
        return out;
    };
    let columns: Vec<String> = first.keys().cloned().collect();
    write_grid_with(&mut out, &columns, rows, |value, col| {
        if AMOUNT_COLUMNS.contains(&col) {
            fmt_num(value)
        } else {
            format_cell_limited(value, col, config.cell_max_chars)
        }
    });
    out
}

/// The backend's message for a failed invoice listing.
pub fn invoice_failure(response: &InvoiceResponse) -> String {
    match response.message.as_deref() {
        Some(message) if !message.trim().is_empty() => message.to_string(),
        _ => format!("Failed to fetch invoices [{}]", response.code),
    }
}

/// Render a comparison result or failure.
pub fn render_comparison(response: &ComparisonResponse) -> String {
    if !response.success {
        let reason = response
            .errors
            .as_ref()
            .and_then(|e| e.first())
            .map(|tag| format!(" ({})", tag))
            .unwrap_or_default();
        return format!(
            "Comparison failed [{}]{}: {}\n",
            response.code, reason, response.message
        );
    }
    match &response.data {
        Some(result) => format!(
            "Comparison report ready: {} ({} bytes, id {}, created {})\n",
            result.file_name, result.file_size, result.file_id, result.created_at
        ),
        None => format!("{}\n", response.message),
    }
}
