//! Flattens a meeting summary into the text that gets chunked and embedded.

use crate::loader::{SummaryEntry, SummaryRecord};
use serde_json::Value;

/// Render a summary as `Title`, `Overview`, `Details` and `Next Steps` lines.
/// Empty detail and next-step lists are left out.
pub fn flatten_summary(summary: &SummaryRecord) -> String {
    let mut text = format!(
        "Title: {}\nOverview: {}\n",
        summary.summary_title, summary.summary_overview
    );

    if !summary.summary_details.is_empty() {
        text.push_str("Details: ");
        text.push_str(&join_entries(&summary.summary_details));
        text.push('\n');
    }

    if !summary.next_steps.is_empty() {
        text.push_str("Next Steps: ");
        text.push_str(&join_entries(&summary.next_steps));
    }

    text
}

fn join_entries(entries: &[SummaryEntry]) -> String {
    entries
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Plain text as-is, labeled fields as `key: value, key: value`
pub fn render_entry(entry: &SummaryEntry) -> String {
    match entry {
        SummaryEntry::Text(text) => text.clone(),
        SummaryEntry::Fields(fields) => {
            let mut pairs: Vec<_> = fields.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            pairs
                .into_iter()
                .map(|(key, value)| format!("{}: {}", key, render_value(value)))
                .collect::<Vec<_>>()
                .join(", ")
        }
        SummaryEntry::Other(value) => render_value(value),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
