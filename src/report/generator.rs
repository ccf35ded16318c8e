//! Markdown checklist generation.
//!
//! Two output contracts exist, chosen by [`Source`]:
//!
//! - `modules`: one `# course` heading per accessible course, one
//!   `## module` heading per module, and `- [ ] {name} 📅 {due_at}` per
//!   dated assignment. The due date is copied verbatim.
//! - `upcoming`: one `- [ ] {label} [due:: YYYY-MM-DD]` line per event.
//!
//! Rendering is a pure function of the fetched data.

use crate::aggregator::Aggregator;
use crate::canvas::Transport;
use crate::cli::Source;
use crate::error::Result;
use crate::models::{AggregateRoot, Event};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

/// Fetch from Canvas and render the checklist for `source`.
///
/// Nothing is rendered if any request fails.
pub async fn generate<T: Transport + ?Sized>(
    transport: &T,
    base_url: &str,
    token: &str,
    source: Source,
    concurrency: usize,
) -> Result<String> {
    let aggregator = Aggregator::new(transport, base_url, token)?.with_concurrency(concurrency);

    match source {
        Source::Modules => {
            let root = aggregator.fetch_all().await?;
            Ok(render_checklist(&root))
        }
        Source::Upcoming => {
            let events = aggregator.fetch_events().await?;
            Ok(render_event_checklist(&events))
        }
    }
}

/// Render the course tree.
pub fn render_checklist(root: &AggregateRoot) -> String {
    let mut output = String::new();

    for course in &root.courses {
        let Some(course_name) = course.name.as_deref() else {
            continue;
        };
        output.push_str(&format!("# {}\n", course_name));

        for module in &course.modules {
            let Some(module_name) = module.name.as_deref() else {
                continue;
            };
            output.push_str(&format!("## {}\n", module_name));

            for (name, due_at) in module.assignments.iter().filter_map(|a| a.checklist_fields()) {
                output.push_str(&format!("- [ ] {} 📅 {}\n", name, due_at));
            }
        }
    }

    output
}

/// Render the flat event list.
pub fn render_event_checklist(events: &[Event]) -> String {
    let mut output = String::new();

    for event in events {
        output.push_str(&format!("- [ ] {}", event.label()));
        if let Some(timestamp) = event.timestamp() {
            output.push_str(&format!(" [due:: {}]", normalize_date(timestamp)));
        }
        output.push('\n');
    }

    output
}

/// Reduce a Canvas timestamp to `YYYY-MM-DD`.
///
/// The calendar day is taken in UTC, not the local zone, so a deadline late
/// in the evening west of Greenwich lands on the following day.
///
/// Values that are neither RFC 3339 timestamps nor plain dates are returned unchanged.
pub fn normalize_date(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc).format("%Y-%m-%d").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }

    warn!("Unrecognized date format: {}", raw);
    raw.to_string()
}
