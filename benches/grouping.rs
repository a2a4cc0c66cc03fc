// Benchmarks for forest construction and the full grouping pipeline.
//
// Run with:
//   cargo bench --bench grouping

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use tracestitch::{
    Event, EventType, GroupingOptions, StatIds, StatType, StatValue, Timeline, Trace, group_events,
};

const ROOT: EventType = EventType(10);
const OP: EventType = EventType(11);

fn bench_options() -> GroupingOptions {
    let mut options = GroupingOptions::new(StatIds {
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
    });
    options.root_events.push(ROOT);
    options
}

/// `timelines` timelines of `steps` root events, each containing a small
/// run of nested ops.
fn synthetic_trace(timelines: u64, steps: u64) -> Trace {
    let mut trace = Trace::new();
    for timeline_id in 0..timelines {
        let mut timeline = Timeline::new(timeline_id, format!("worker-{timeline_id}"));
        for step in 0..steps {
            let base = step * 1_000;
            timeline.push(Event::new(format!("step-{step}"), ROOT, base, 900));
            for op in 0..8 {
                let start = base + 10 + op * 100;
                timeline.push(
                    Event::new("op", OP, start, 80)
                        .with_stat(StatType(40), StatValue::Uint(step * 8 + op)),
                );
            }
        }
        trace.push_timeline(timeline);
    }
    trace
}

fn bench_group_events(c: &mut Criterion) {
    c.bench_function("group_events/8x100", |b| {
        b.iter_batched(
            || synthetic_trace(8, 100),
            |mut trace| {
                let meta = group_events(&mut trace, &bench_options()).unwrap();
                black_box(meta);
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_group_events);
criterion_main!(benches);
