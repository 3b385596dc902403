//! Realtime event log as shown in the console.
//!
//! Consecutive events of the same type are folded into one row with a
//! repeat count, so the displayed list never holds two adjacent entries of
//! the same type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Origin of a realtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Client,
    Server,
}

/// One row of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(with = "time::serde::timestamp")]
    pub time: OffsetDateTime,
    pub source: EventSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    pub event: Value,
}

impl RealtimeEvent {
    pub fn new(source: EventSource, event: Value) -> Self {
        Self {
            time: OffsetDateTime::now_utc(),
            source,
            count: None,
            event,
        }
    }

    /// The `type` field of the payload, empty when absent.
    pub fn event_type(&self) -> &str {
        self.event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Provider event id, used as the expand/collapse key.
    pub fn event_id(&self) -> Option<&str> {
        self.event.get("event_id").and_then(Value::as_str)
    }

    /// Number of occurrences this row stands for.
    pub fn occurrences(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// Fold `event` into `log`.
///
/// If the tail has the same event type its count goes up (absent counts as
/// one, so the first repeat yields 2); otherwise the event is appended.
pub fn aggregate(mut log: Vec<RealtimeEvent>, event: RealtimeEvent) -> Vec<RealtimeEvent> {
    match log.last_mut() {
        Some(last) if last.event_type() == event.event_type() => {
            last.count = Some(last.occurrences() + 1);
        }
        _ => log.push(event),
    }
    log
}

/// Ordered, aggregated log of realtime events for one session.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<RealtimeEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RealtimeEvent) {
        let records = std::mem::take(&mut self.records);
        self.records = aggregate(records, event);
    }

    pub fn records(&self) -> &[RealtimeEvent] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Tracks the rendered height of the log view.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoScroll {
    last_height: u32,
}

impl AutoScroll {
    /// Returns true when the view should scroll to its end.
    pub fn on_height(&mut self, height: u32) -> bool {
        if height != self.last_height {
            self.last_height = height;
            true
        } else {
            false
        }
    }
}

/// Render the time since `start` as `mm:ss.hh`.
pub fn format_elapsed(start: OffsetDateTime, at: OffsetDateTime) -> String {
    let delta = (at - start).whole_milliseconds().max(0);
    let hundredths = (delta / 10) % 100;
    let seconds = (delta / 1000) % 60;
    let minutes = (delta / 60_000) % 60;
    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Duration;

    fn event(kind: &str) -> RealtimeEvent {
        RealtimeEvent::new(EventSource::Server, json!({ "type": kind }))
    }

    #[test]
    fn test_repeats_fold_into_count() {
        let mut log = EventLog::new();
        log.push(event("A"));
        log.push(event("A"));
        log.push(event("B"));

        let rows = log.records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event_type(), "A");
        assert_eq!(rows[0].count, Some(2));
        assert_eq!(rows[1].event_type(), "B");
        assert_eq!(rows[1].count, None);
    }

    #[test]
    fn test_count_keeps_growing() {
        let mut log = EventLog::new();
        for _ in 0..5 {
            log.push(event("response.audio.delta"));
        }
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].count, Some(5));
    }

    #[test]
    fn test_no_adjacent_duplicates_and_bounded_growth() {
        let kinds = ["A", "B", "B", "A", "C", "C", "C", "A", "", ""];
        let mut log: Vec<RealtimeEvent> = Vec::new();
        for kind in kinds {
            let before = log.len();
            log = aggregate(log, event(kind));
            assert!(log.len() <= before + 1);
            for pair in log.windows(2) {
                assert_ne!(pair[0].event_type(), pair[1].event_type());
            }
        }
        assert_eq!(log.len(), 6);
    }

    #[test]
    fn test_source_is_kept_from_first_occurrence() {
        let mut log = EventLog::new();
        log.push(RealtimeEvent::new(EventSource::Client, json!({"type": "x"})));
        log.push(RealtimeEvent::new(EventSource::Server, json!({"type": "x"})));
        assert_eq!(log.records()[0].source, EventSource::Client);
    }

    #[test]
    fn test_clear() {
        let mut log = EventLog::new();
        log.push(event("A"));
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_auto_scroll_only_on_change() {
        let mut scroll = AutoScroll::default();
        assert!(scroll.on_height(120));
        assert!(!scroll.on_height(120));
        assert!(scroll.on_height(240));
    }

    #[test]
    fn test_format_elapsed() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let at = start + Duration::milliseconds(61_234);
        assert_eq!(format_elapsed(start, at), "01:01.23");
        assert_eq!(format_elapsed(start, start), "00:00.00");
        assert_eq!(format_elapsed(at, start), "00:00.00");
    }

    #[test]
    fn test_event_id() {
        let e = RealtimeEvent::new(
            EventSource::Server,
            json!({"type": "session.created", "event_id": "evt_1"}),
        );
        assert_eq!(e.event_id(), Some("evt_1"));
    }
}
