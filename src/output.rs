//! Output formatting for the chaos CLI
//!
//! Human-readable result tables and the JSON document for `--json`.

use chaos_core::{RunReport, RunStatus, RunSummary, TestResult, Value};

use crate::runner::TargetOutcome;

/// Longest rendering of a single table cell, in characters.
pub const MAX_CELL_WIDTH: usize = 80;

const ERROR_PREFIX: &str = "ERROR: ";
const ELLIPSIS: &str = "...";

/// Shorten `text` to at most [`MAX_CELL_WIDTH`] characters.
pub fn truncate_cell(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let kept: String = text
        .chars()
        .take(MAX_CELL_WIDTH - ELLIPSIS.len())
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

fn render_inputs(inputs: &[Value]) -> String {
    let parts: Vec<String> = inputs.iter().map(Value::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Cells of one result row, already truncated. Every value is rendered as
/// compact JSON so multi-line text stays on one row.
pub fn result_row(result: &TestResult) -> Vec<String> {
    let output = if result.error {
        format!("{}{}", ERROR_PREFIX, result.output)
    } else {
        result.output.to_string()
    };
    let mut row = vec![
        truncate_cell(&output),
        result.time_taken_text(),
        truncate_cell(&render_inputs(&result.inputs)),
    ];
    if let Some(matched) = result.matched_return_type {
        row.push(matched.to_string());
    }
    row
}

/// Draw `rows` under `headers` with box-drawing characters.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}\n", left, segments.join(mid), right)
    };
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = cells.get(i).copied().unwrap_or("");
                let pad = w - cell.chars().count();
                format!(" {}{} ", cell, " ".repeat(pad))
            })
            .collect();
        format!("│{}│\n", padded.join("│"))
    };

    let mut out = String::new();
    out.push_str(&rule("┌", "┬", "┐"));
    out.push_str(&line(headers.to_vec()));
    out.push_str(&rule("├", "┼", "┤"));
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out.push_str(&rule("└", "┴", "┘"));
    out
}

/// Result table for one report.
pub fn format_report_table(report: &RunReport) -> String {
    let mut headers = vec!["Output", "Time Taken", "Inputs"];
    if report
        .data
        .iter()
        .any(|r| r.matched_return_type.is_some())
    {
        headers.push("Matched Return Type");
    }
    let rows: Vec<Vec<String>> = report.data.iter().map(result_row).collect();
    format_table(&headers, &rows)
}

pub fn format_summary(summary: &RunSummary, elapsed_ms: u64) -> String {
    let mut out = format!(
        "{} calls, {} errors ({}ms)",
        summary.total, summary.errors, elapsed_ms
    );
    if summary.matched + summary.mismatched > 0 {
        out.push_str(&format!(
            ", return type matched {}/{}",
            summary.matched,
            summary.matched + summary.mismatched
        ));
    }
    out
}

/// Heading, table, summary and reported errors for one target.
pub fn format_outcome(outcome: &TargetOutcome) -> String {
    let mut out = format!("\x1b[1m{}\x1b[0m\n", outcome.name);

    if let Some(report) = outcome.report.as_ref().filter(|r| !r.data.is_empty()) {
        out.push_str(&format_report_table(report));
        let summary = report.summary();
        out.push_str(&format_summary(&summary, report.elapsed_ms));
        out.push('\n');
        for failure in summary.failures.iter().take(5) {
            out.push_str(&format!(
                "  {:>6} x {}\n",
                failure.count,
                truncate_cell(&Value::from(failure.message.as_str()).to_string())
            ));
        }
    }

    if let RunStatus::Error { message } = &outcome.status {
        out.push_str(&format!("\x1b[31m✗ {}\x1b[0m\n", message));
    }
    for error in &outcome.errors {
        out.push_str(&format!(
            "\x1b[33m! [{}] {}\x1b[0m\n",
            error.kind.short_name(),
            error.message
        ));
    }
    out.push('\n');
    out
}

pub fn format_outcomes_json(outcomes: &[TargetOutcome]) -> String {
    serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(error: bool, output: Value, inputs: Vec<Value>, matched: Option<bool>) -> TestResult {
        TestResult {
            error,
            output,
            time_taken: Duration::from_micros(250),
            inputs,
            matched_return_type: matched,
        }
    }

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("short"), "short");
        let long = "x".repeat(200);
        let cell = truncate_cell(&long);
        assert_eq!(cell.chars().count(), MAX_CELL_WIDTH);
        assert!(cell.ends_with("..."));
        let exact = "é".repeat(MAX_CELL_WIDTH);
        assert_eq!(truncate_cell(&exact), exact);
    }

    #[test]
    fn test_row_renders_special_values() {
        let row = result_row(&result(
            false,
            Value::Number(f64::NAN),
            vec![Value::Undefined, Value::from(4)],
            Some(true),
        ));
        assert_eq!(row, vec!["NaN", "0.250ms", "[undefined, 4]", "true"]);
    }

    #[test]
    fn test_row_prefixes_errors() {
        let row = result_row(&result(true, Value::from("boom"), vec![Value::Null], None));
        assert_eq!(row[0], "ERROR: \"boom\"");
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_multiline_errors_stay_on_one_row() {
        let failed = result(
            true,
            Value::from("line one\nline two"),
            vec![Value::from("a\nb")],
            Some(false),
        );
        let row = result_row(&failed);
        assert_eq!(row[0], r#"ERROR: "line one\nline two""#);
        assert_eq!(row[2], r#"["a\nb"]"#);

        let mut report = RunReport::failed("multi", "unused");
        report.status = RunStatus::Success;
        report.data = vec![failed];
        let table = format_report_table(&report);
        assert_eq!(table.lines().count(), 5);
    }

    #[test]
    fn test_table_alignment() {
        let table = format_table(
            &["A", "Long header"],
            &[vec!["wide cell".into(), "x".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "│ A         │ Long header │");
        assert_eq!(lines[3], "│ wide cell │ x           │");
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_summary_line() {
        let summary = RunSummary::from_results(&[
            result(false, Value::from(8), vec![], Some(true)),
            result(true, Value::from("bad"), vec![], Some(false)),
        ]);
        assert_eq!(
            format_summary(&summary, 3),
            "2 calls, 1 errors (3ms), return type matched 1/2"
        );
    }
}
