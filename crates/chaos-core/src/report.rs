//! Result types for a test run.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::value::Value;

/// Outcome of one call of the function under test.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Whether the call failed.
    pub error: bool,
    /// The returned value, or the failure message when `error` is set.
    pub output: Value,
    /// Wall-clock time around the invocation.
    #[serde(serialize_with = "serialize_duration")]
    pub time_taken: Duration,
    /// The exact call vector.
    pub inputs: Vec<Value>,
    /// Whether the output satisfied the expected return descriptor; only
    /// present when one was declared, always `false` for failed calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_return_type: Option<bool>,
}

impl TestResult {
    /// Duration text with a unit suffix, e.g. `"0.042ms"`.
    pub fn time_taken_text(&self) -> String {
        format_duration(self.time_taken)
    }
}

pub fn format_duration(d: Duration) -> String {
    format!("{:.3}ms", d.as_secs_f64() * 1000.0)
}

fn serialize_duration<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*d))
}

/// Overall status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error { message: String },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

/// Complete report from a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Name of the function under test.
    pub target: String,
    #[serde(flatten)]
    pub status: RunStatus,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// Elapsed time for the whole run in milliseconds.
    pub elapsed_ms: u64,
    /// Results in slot-major, variant-minor order.
    pub data: Vec<TestResult>,
}

impl RunReport {
    /// Error-shaped report returned by a soft-policy run.
    pub fn failed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            status: RunStatus::Error {
                message: message.into(),
            },
            started_at: Utc::now(),
            elapsed_ms: 0,
            data: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.data)
    }
}

/// Aggregate view over a run's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub errors: usize,
    pub matched: usize,
    pub mismatched: usize,
    /// Distinct failure messages, most frequent first.
    pub failures: Vec<FailureCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCount {
    pub message: String,
    pub count: usize,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut failure_map: HashMap<String, usize> = HashMap::new();
        // First-seen order breaks ties between equally frequent messages.
        let mut first_seen: Vec<String> = Vec::new();
        let mut summary = RunSummary {
            total: results.len(),
            errors: 0,
            matched: 0,
            mismatched: 0,
            failures: Vec::new(),
        };

        for result in results {
            if result.error {
                summary.errors += 1;
                let message = match &result.output {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let count = failure_map.entry(message.clone()).or_insert(0);
                if *count == 0 {
                    first_seen.push(message);
                }
                *count += 1;
            }
            match result.matched_return_type {
                Some(true) => summary.matched += 1,
                Some(false) => summary.mismatched += 1,
                None => {}
            }
        }

        summary.failures = first_seen
            .into_iter()
            .map(|message| {
                let count = failure_map[&message];
                FailureCount { message, count }
            })
            .collect();
        summary.failures.sort_by(|a, b| b.count.cmp(&a.count));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(error: bool, output: Value, matched: Option<bool>) -> TestResult {
        TestResult {
            error,
            output,
            time_taken: Duration::from_micros(1500),
            inputs: vec![Value::Null],
            matched_return_type: matched,
        }
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result(false, Value::from(8), Some(true)),
            result(true, Value::from("bad input"), Some(false)),
            result(true, Value::from("overflow"), Some(false)),
            result(true, Value::from("overflow"), Some(false)),
            result(false, Value::Null, Some(false)),
        ];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.errors, 3);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.mismatched, 4);
        assert_eq!(summary.failures[0].message, "overflow");
        assert_eq!(summary.failures[0].count, 2);
        assert_eq!(summary.failures[1].message, "bad input");
    }

    #[test]
    fn test_result_serialization() {
        let json = serde_json::to_value(result(false, Value::Undefined, None)).unwrap();
        assert_eq!(json["time_taken"], "1.500ms");
        assert_eq!(json["output"], "undefined");
        assert!(json.get("matched_return_type").is_none());
    }

    #[test]
    fn test_failed_report_serialization() {
        let report = RunReport::failed("sum", "no arguments");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "no arguments");
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
    }
}
