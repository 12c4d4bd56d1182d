//! Table cell and number formatting for renderers.

use serde_json::Value;

use invassist_core::types::Row;

use crate::types::TableData;

/// Default cap on rendered cell text.
pub const CELL_MAX_CHARS: usize = 120;

/// Placeholder for missing or non-numeric values.
pub const MISSING: &str = "—";

const DATE_COLUMNS: [&str; 2] = ["InvoiceDate", "BillReceiveDate"];
const VERBATIM_COLUMNS: [&str; 1] = ["account_number"];

/// Render one table cell with the default length cap.
pub fn format_cell(value: &Value, column: &str) -> String {
    format_cell_limited(value, column, CELL_MAX_CHARS)
}

/// Render one table cell.
///
/// Account numbers are shown verbatim, date columns lose their time part,
/// numbers get thousands separators and long text is cut to `max_chars`.
pub fn format_cell_limited(value: &Value, column: &str, max_chars: usize) -> String {
    if value.is_null() {
        return String::new();
    }
    if VERBATIM_COLUMNS.contains(&column) {
        return plain(value);
    }
    if DATE_COLUMNS.contains(&column) {
        if let Some(s) = value.as_str() {
            return s.split('T').next().unwrap_or(s).to_string();
        }
    }
    if let Value::Number(n) = value {
        return group_number(n, 3);
    }
    truncate(&plain(value), max_chars)
}

/// Render a numeric value with at most two fraction digits.
///
/// Numeric strings are accepted. Anything else renders as `—`.
pub fn fmt_num(value: &Value) -> String {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => group_float(f, 2),
        _ => MISSING.to_string(),
    }
}

/// The rows a renderer shows, capped at `limit`.
pub fn display_rows(table: &TableData, limit: usize) -> &[Row] {
    let shown = table.rows.len().min(limit);
    &table.rows[..shown]
}

/// Table heading carrying the full backend row count.
pub fn results_heading(table: &TableData) -> String {
    format!("Data results ({})", table.row_count)
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn group_number(n: &serde_json::Number, max_fraction: usize) -> String {
    if let Some(i) = n.as_i64() {
        return group_integer(&i.unsigned_abs().to_string(), i < 0);
    }
    if let Some(u) = n.as_u64() {
        return group_integer(&u.to_string(), false);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => group_float(f, max_fraction),
        _ => n.to_string(),
    }
}

fn group_float(value: f64, max_fraction: usize) -> String {
    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };
    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = group_integer(int_part, negative);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn group_integer(digits: &str, negative: bool) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_blank() {
        assert_eq!(format_cell(&Value::Null, "NetTotal"), "");
    }

    #[test]
    fn test_account_number_is_verbatim() {
        assert_eq!(format_cell(&json!(1234567), "account_number"), "1234567");
        assert_eq!(format_cell(&json!("00042"), "account_number"), "00042");
    }

    #[test]
    fn test_date_columns_drop_time() {
        assert_eq!(
            format_cell(&json!("2024-10-03T00:00:00"), "InvoiceDate"),
            "2024-10-03"
        );
        assert_eq!(
            format_cell(&json!("2024-10-05T12:30:00Z"), "BillReceiveDate"),
            "2024-10-05"
        );
        assert_eq!(
            format_cell(&json!("2024-10-03T00:00:00"), "Created"),
            "2024-10-03T00:00:00"
        );
    }

    #[test]
    fn test_numbers_are_grouped() {
        assert_eq!(format_cell(&json!(1234567), "NetTotal"), "1,234,567");
        assert_eq!(format_cell(&json!(-9876543), "NetTotal"), "-9,876,543");
        assert_eq!(format_cell(&json!(999), "Qty"), "999");
        assert_eq!(format_cell(&json!(1234.5678), "NetTotal"), "1,234.568");
        assert_eq!(format_cell(&json!(0.5), "Rate"), "0.5");
    }

    #[test]
    fn test_long_text_is_truncated() {
        let long = "x".repeat(150);
        let cell = format_cell(&json!(long), "Notes");
        assert_eq!(cell.chars().count(), 120);
        assert!(cell.ends_with("..."));

        let exact = "y".repeat(120);
        assert_eq!(format_cell(&json!(exact.clone()), "Notes"), exact);
        assert_eq!(format_cell_limited(&json!("abcdefgh"), "Notes", 6), "abc...");
    }

    #[test]
    fn test_other_values_render_as_text() {
        assert_eq!(format_cell(&json!(true), "Paid"), "true");
        assert_eq!(format_cell(&json!("Acme"), "Vendor"), "Acme");
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(&json!(1234.567)), "1,234.57");
        assert_eq!(fmt_num(&json!(1000)), "1,000");
        assert_eq!(fmt_num(&json!("2500.1")), "2,500.1");
        assert_eq!(fmt_num(&json!(-0.001)), "0");
        assert_eq!(fmt_num(&Value::Null), MISSING);
        assert_eq!(fmt_num(&json!("n/a")), MISSING);
    }

    #[test]
    fn test_display_rows_are_capped() {
        let table = TableData {
            columns: vec!["Id".to_string()],
            rows: (0..12)
                .map(|i| {
                    let mut row = Row::new();
                    row.insert("Id".to_string(), json!(i));
                    row
                })
                .collect(),
            row_count: 12,
        };
        assert_eq!(display_rows(&table, 5).len(), 5);
        assert_eq!(display_rows(&table, 50).len(), 12);
        assert_eq!(results_heading(&table), "Data results (12)");
    }
}
