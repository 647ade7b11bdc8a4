//! Progress log (`progress.txt`) layout.
//!
//! ```text
//! ## Codebase Patterns
//! - reusable fact curated by workers
//!
//! ---
//! Started: 2026-01-15T10:00:00+00:00
//!
//! ## 2026-01-15T10:20:00+00:00 - US-001
//! - what changed
//! ---
//! ```
//!
//! The patterns region may be rewritten by any iteration. Entries below the
//! first separator are append-only history.

use chrono::{DateTime, Utc};

/// Heading that opens the patterns region.
pub const PATTERNS_HEADING: &str = "## Codebase Patterns";

/// Separator between the patterns region and history, and between entries.
pub const SEPARATOR: &str = "---";

const STARTED_PREFIX: &str = "Started:";

/// Parsed view of the progress log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressLog {
    /// Non-blank lines of the patterns region.
    pub patterns: Vec<String>,
    /// Run-start marker value, if present.
    pub started: Option<String>,
    pub entries: Vec<HistoryEntry>,
}

/// One `## <timestamp> - <item id>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Heading text without the leading `## `.
    pub heading: String,
    pub lines: Vec<String>,
}

impl HistoryEntry {
    /// Item id from a `<timestamp> - <item id>` heading.
    #[must_use]
    pub fn item_id(&self) -> Option<&str> {
        self.heading
            .rsplit_once(" - ")
            .map(|(_, id)| id.trim())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Preamble,
    Patterns,
    History,
}

impl ProgressLog {
    /// Fresh log content: empty patterns region plus a run-start marker.
    #[must_use]
    pub fn skeleton(started: DateTime<Utc>) -> String {
        format!(
            "{PATTERNS_HEADING}\n\n{SEPARATOR}\n{STARTED_PREFIX} {}\n",
            started.to_rfc3339()
        )
    }

    /// Split log text into its regions. Never fails; unknown lines are kept
    /// with the nearest entry or dropped if they precede all entries.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut log = ProgressLog::default();
        let mut region = Region::Preamble;

        for line in text.lines() {
            let trimmed = line.trim_end();

            if region == Region::Preamble {
                if trimmed == PATTERNS_HEADING {
                    region = Region::Patterns;
                    continue;
                }
                if trimmed.is_empty() {
                    continue;
                }
                // no patterns heading: everything is history
                region = Region::History;
            }

            if region == Region::Patterns {
                if trimmed == SEPARATOR {
                    region = Region::History;
                } else if !trimmed.trim().is_empty() {
                    log.patterns.push(trimmed.to_string());
                }
                continue;
            }

            if let Some(heading) = trimmed.strip_prefix("## ") {
                log.entries.push(HistoryEntry {
                    heading: heading.trim().to_string(),
                    lines: Vec::new(),
                });
            } else if let Some(started) = trimmed.strip_prefix(STARTED_PREFIX) {
                if log.entries.is_empty() && log.started.is_none() {
                    log.started = Some(started.trim().to_string());
                } else if let Some(entry) = log.entries.last_mut() {
                    entry.lines.push(trimmed.to_string());
                }
            } else if trimmed == SEPARATOR || trimmed.trim().is_empty() {
                continue;
            } else if let Some(entry) = log.entries.last_mut() {
                entry.lines.push(trimmed.to_string());
            }
        }

        log
    }

    /// True when neither region holds anything beyond the skeleton.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.patterns.is_empty() && self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_skeleton_parses_as_fresh() {
        let log = ProgressLog::parse(&ProgressLog::skeleton(started()));
        assert!(log.is_fresh());
        assert_eq!(log.started.as_deref(), Some("2026-01-15T10:00:00+00:00"));
    }

    #[test]
    fn test_parse_patterns_and_entries() {
        let text = "\
## Codebase Patterns
- Use sql<number> for aggregates
- Migrations live in db/migrations

---
Started: 2026-01-15T10:00:00+00:00

## 2026-01-15T10:20:00+00:00 - US-001
- Added priority column
- Learned: enum lives in types.ts
---

## 2026-01-15T10:45:00+00:00 - US-002
- Wired badge component
---
";
        let log = ProgressLog::parse(text);
        assert_eq!(log.patterns.len(), 2);
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0].item_id(), Some("US-001"));
        assert_eq!(log.entries[0].lines.len(), 2);
        assert_eq!(log.entries[1].item_id(), Some("US-002"));
        assert!(!log.is_fresh());
    }

    #[test]
    fn test_log_without_patterns_heading_is_all_history() {
        let text = "## 2026-01-15 - US-009\n- did a thing\n";
        let log = ProgressLog::parse(text);
        assert!(log.patterns.is_empty());
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.entries[0].item_id(), Some("US-009"));
    }

    #[test]
    fn test_heading_without_item_id() {
        let entry = HistoryEntry {
            heading: "Notes".to_string(),
            lines: vec![],
        };
        assert_eq!(entry.item_id(), None);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(ProgressLog::parse(""), ProgressLog::default());
    }
}
