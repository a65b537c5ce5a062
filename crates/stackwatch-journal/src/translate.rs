//! Line translation: one journal line to its mission-tracking meaning.
//! Commander records become identity changes; mission records decode
//! through the core event union; everything else is skipped.

use serde::Deserialize;
use tracing::warn;

use stackwatch_core::event::{self, JournalEvent};

/// What one journal line means to mission tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItem {
    /// A `Commander` record announcing the operator identity.
    Commander(String),
    Event(JournalEvent),
}

#[derive(Debug, Deserialize)]
struct CommanderRecord {
    #[serde(rename = "Name")]
    name: String,
}

/// Classify one journal line.
///
/// Returns `None` for blank lines, irrelevant record kinds, and malformed
/// records. Malformed records are logged here so callers can keep
/// streaming without their own error handling.
pub fn classify_line(line: &str) -> Option<LineItem> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparseable journal line, skipping");
            return None;
        }
    };

    if value.get("event").and_then(serde_json::Value::as_str) == Some("Commander") {
        return match serde_json::from_value::<CommanderRecord>(value) {
            Ok(record) => Some(LineItem::Commander(record.name)),
            Err(e) => {
                warn!(error = %e, "malformed commander record, skipping");
                None
            }
        };
    }

    match event::decode_value(&value) {
        Ok(Some(event)) => Some(LineItem::Event(event)),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "malformed journal event, skipping");
            None
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
