//! In-memory trace model consumed and annotated by the grouping passes.
//!
//! Trace collection, storage formats, and the semantic-typing layer that
//! gives meaning to event-type and stat-type identifiers all live outside
//! this crate. The passes only need ordered timelines of time-ranged
//! events with typed stats, plus the ability to write stats back.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Result, StitchError};

/// Opaque event-type identifier, assigned by the external typing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventType(pub i64);

/// Opaque stat-type identifier, assigned by the external typing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatType(pub i64);

/// A typed key-value annotation attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatValue {
    Int(i64),
    Uint(u64),
    Double(f64),
    Str(String),
    IntList(Vec<i64>),
}

impl StatValue {
    /// Integer view; `Uint` values coerce when they fit.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StatValue::Int(v) => Some(*v),
            StatValue::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Unsigned view; non-negative `Int` values coerce.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            StatValue::Uint(v) => Some(*v),
            StatValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// One time-ranged occurrence on a timeline.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub name: String,
    pub event_type: EventType,
    /// Offset from the trace origin, in nanoseconds.
    pub start_ns: u64,
    pub duration_ns: u64,
    stats: IndexMap<StatType, StatValue>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        event_type: EventType,
        start_ns: u64,
        duration_ns: u64,
    ) -> Self {
        Self {
            name: name.into(),
            event_type,
            start_ns,
            duration_ns,
            stats: IndexMap::new(),
        }
    }

    /// Builder-style stat attachment for trace construction.
    pub fn with_stat(mut self, stat_type: StatType, value: StatValue) -> Self {
        self.stats.insert(stat_type, value);
        self
    }

    /// Exclusive end of the event's time range.
    ///
    /// Relies on [`Trace::validate`] having rejected overflowing ranges.
    pub fn end_ns(&self) -> u64 {
        self.start_ns + self.duration_ns
    }

    pub fn stat(&self, stat_type: StatType) -> Option<&StatValue> {
        self.stats.get(&stat_type)
    }

    /// Insert or replace a stat. This is the mutation hook the passes use
    /// to persist group ids, step names, and eager flags onto the trace.
    pub fn set_stat(&mut self, stat_type: StatType, value: StatValue) {
        self.stats.insert(stat_type, value);
    }

    pub fn int_stat(&self, stat_type: StatType) -> Option<i64> {
        self.stat(stat_type).and_then(StatValue::as_int)
    }

    pub fn uint_stat(&self, stat_type: StatType) -> Option<u64> {
        self.stat(stat_type).and_then(StatValue::as_uint)
    }

    pub fn str_stat(&self, stat_type: StatType) -> Option<&str> {
        self.stat(stat_type).and_then(StatValue::as_str)
    }
}

/// An ordered-in-time sequence of events belonging to one thread/device.
///
/// Events are stored in construction order, which is not necessarily
/// start-time order; the nester sorts internally.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub id: u64,
    pub name: String,
    pub events: Vec<Event>,
}

impl Timeline {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Address of one event inside a trace: timeline index, then event index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventAddr {
    pub timeline: usize,
    pub event: usize,
}

/// The complete captured execution record, composed of timelines.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trace {
    pub timelines: Vec<Timeline>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_timeline(&mut self, timeline: Timeline) {
        self.timelines.push(timeline);
    }

    pub fn event(&self, addr: EventAddr) -> &Event {
        &self.timelines[addr.timeline].events[addr.event]
    }

    pub fn event_mut(&mut self, addr: EventAddr) -> &mut Event {
        &mut self.timelines[addr.timeline].events[addr.event]
    }

    /// Reject structurally invalid traces before any pass runs.
    ///
    /// Incomplete traces (missing stats, dangling references) are handled
    /// by silent degradation in the passes; this catches only states no
    /// well-formed trace collector can produce.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for timeline in &self.timelines {
            if !seen.insert(timeline.id) {
                return Err(StitchError::DuplicateTimeline {
                    id: timeline.id,
                    name: timeline.name.clone(),
                });
            }
            for (event_index, event) in timeline.events.iter().enumerate() {
                if event.start_ns.checked_add(event.duration_ns).is_none() {
                    return Err(StitchError::TimeRangeOverflow {
                        timeline_id: timeline.id,
                        event_index,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatValue::Int(-3), Some(-3), None)]
    #[case(StatValue::Int(3), Some(3), Some(3))]
    #[case(StatValue::Uint(7), Some(7), Some(7))]
    #[case(StatValue::Uint(u64::MAX), None, Some(u64::MAX))]
    #[case(StatValue::Str("x".into()), None, None)]
    fn test_numeric_coercions(
        #[case] value: StatValue,
        #[case] as_int: Option<i64>,
        #[case] as_uint: Option<u64>,
    ) {
        assert_eq!(value.as_int(), as_int);
        assert_eq!(value.as_uint(), as_uint);
    }

    #[test]
    fn test_set_stat_replaces() {
        let mut event = Event::new("op", EventType(1), 0, 10);
        event.set_stat(StatType(5), StatValue::Int(1));
        event.set_stat(StatType(5), StatValue::Int(2));
        assert_eq!(event.int_stat(StatType(5)), Some(2));
    }

    #[test]
    fn test_validate_duplicate_timeline() {
        let mut trace = Trace::new();
        trace.push_timeline(Timeline::new(1, "a"));
        trace.push_timeline(Timeline::new(1, "b"));
        assert!(matches!(
            trace.validate(),
            Err(StitchError::DuplicateTimeline { id: 1, .. })
        ));
    }

    #[test]
    fn test_validate_time_overflow() {
        let mut trace = Trace::new();
        let mut timeline = Timeline::new(0, "t");
        timeline.push(Event::new("e", EventType(1), u64::MAX, 1));
        trace.push_timeline(timeline);
        assert!(matches!(
            trace.validate(),
            Err(StitchError::TimeRangeOverflow {
                timeline_id: 0,
                event_index: 0
            })
        ));
    }

    #[test]
    fn test_validate_ok_on_empty_trace() {
        // An empty trace is valid input; the pipeline just produces no groups.
        assert!(Trace::new().validate().is_ok());
    }
}
