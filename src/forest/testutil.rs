//! Shared builders for forest tests.

use crate::model::{Event, EventType, Timeline, Trace};
use crate::options::{GroupingOptions, StatIds};

/// Stat numbering shared by every test; the ids are arbitrary, only
/// distinctness matters.
pub(crate) fn stat_ids() -> StatIds {
    use crate::model::StatType;
    StatIds {
        producer_kind: StatType(1),
        producer_id: StatType(2),
        consumer_kind: StatType(3),
        consumer_id: StatType(4),
        model_id: StatType(5),
        group_id: StatType(6),
        group_name: StatType(10),
        step_name: StatType(7),
        is_eager: StatType(8),
        selected_group_ids: StatType(9),
    }
}

pub(crate) fn options() -> GroupingOptions {
    GroupingOptions::new(stat_ids())
}

pub(crate) fn event(name: &str, event_type: EventType, start_ns: u64, duration_ns: u64) -> Event {
    Event::new(name, event_type, start_ns, duration_ns)
}

pub(crate) fn single_timeline(events: Vec<Event>) -> Trace {
    let mut timeline = Timeline::new(0, "t0");
    for event in events {
        timeline.push(event);
    }
    let mut trace = Trace::new();
    trace.push_timeline(timeline);
    trace
}

pub(crate) fn two_timelines(first: Vec<Event>, second: Vec<Event>) -> Trace {
    let mut t0 = Timeline::new(0, "t0");
    for event in first {
        t0.push(event);
    }
    let mut t1 = Timeline::new(1, "t1");
    for event in second {
        t1.push(event);
    }
    let mut trace = Trace::new();
    trace.push_timeline(t0);
    trace.push_timeline(t1);
    trace
}
