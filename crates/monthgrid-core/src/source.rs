use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::event::Event;

/// Reads the event collection from `path`.
///
/// The file is either a JSON array of events or one event object per line.
/// Source order is kept; it decides which events a crowded day shows first.
#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn load_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read events file {}", path.display()))?;

    let events = if raw.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Event>>(&raw)
            .with_context(|| format!("failed parsing events array in {}", path.display()))?
    } else {
        parse_jsonl(path, &raw)?
    };

    info!(count = events.len(), "loaded events");
    Ok(events)
}

/// Like `load_events`, but a missing file yields no events.
#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn load_events_if_present(path: &Path) -> anyhow::Result<Vec<Event>> {
    if !path.exists() {
        warn!("events file not found; rendering an empty calendar");
        return Ok(vec![]);
    }
    load_events(path)
}

fn parse_jsonl(path: &Path, raw: &str) -> anyhow::Result<Vec<Event>> {
    debug!("parsing events as jsonl");
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(event);
    }
    Ok(out)
}
