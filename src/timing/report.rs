use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::TimingEntry;

const RULE_WIDTH: usize = 100;

/// One summarized label. Values are milliseconds rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Label cut to the report's display width
    pub label: String,
    /// Label as passed to `start`
    #[serde(skip)]
    pub full_label: String,
    pub count: u64,
    pub total_ms: f64,
    pub avg_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl ReportRow {
    /// Summarize an entry. Returns `None` if it has no completed cycle.
    pub fn from_entry(entry: &TimingEntry, label_width: usize) -> Option<Self> {
        if entry.count() == 0 {
            return None;
        }

        Some(Self {
            label: entry.label().chars().take(label_width).collect(),
            full_label: entry.label().to_owned(),
            count: entry.count(),
            total_ms: round2(entry.total_ms()),
            avg_ms: round2(entry.average_ms()),
            median_ms: round2(entry.median_ms()),
            min_ms: round2(entry.min_ms()),
            max_ms: round2(entry.max_ms()),
        })
    }
}

/// End-of-work summary table. `Display` renders the fixed-width text block
/// handed to sinks; `Serialize` gives the same data as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct TimingReport {
    /// What the work was: a request URI, `CLI`, a test name
    pub context: String,
    pub generated_at: DateTime<Utc>,
    /// Rows in first-`start` order
    pub rows: Vec<ReportRow>,
    /// Labels left started without a stop
    pub pending: Vec<String>,
    #[serde(skip)]
    label_width: usize,
}

impl TimingReport {
    pub(crate) fn build(context: &str, entries: &[TimingEntry], label_width: usize) -> Self {
        Self {
            context: context.to_owned(),
            generated_at: Utc::now(),
            rows: entries
                .iter()
                .filter_map(|e| ReportRow::from_entry(e, label_width))
                .collect(),
            pending: entries
                .iter()
                .filter(|e| e.is_pending())
                .map(|e| e.label().to_owned())
                .collect(),
            label_width,
        }
    }

    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Row for `label` as passed to `start`; display truncation does not
    /// matter.
    pub fn row(&self, label: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.full_label == label)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.label_width;
        writeln!(f, "Timing summary for: {}", self.context)?;
        writeln!(
            f,
            "{:<w$} | {:>8} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
            "Label", "Count", "Total (ms)", "Avg (ms)", "Median (ms)", "Min (ms)", "Max (ms)",
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<w$} | {:>8} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
                row.label,
                row.count,
                group_thousands(row.total_ms),
                group_thousands(row.avg_ms),
                group_thousands(row.median_ms),
                group_thousands(row.min_ms),
                group_thousands(row.max_ms),
            )?;
        }
        write!(f, "{}", "-".repeat(RULE_WIDTH))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `1234567.891` → `"1,234,567.89"`
fn group_thousands(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
