//! Event forest: arena construction and the ordered grouping pipeline.
//!
//! [`EventForest`] wraps one trace in a node arena, then runs a fixed
//! sequence of passes over it: per-timeline containment nesting, rule- and
//! context-based cross-timeline stitching, heuristic root/eager detection,
//! deterministic group assignment, and post-pass refinements. Every pass
//! may assume all earlier passes have fully completed; nothing here
//! suspends or races.

pub mod connect;
pub mod group;
pub mod heuristics;
pub mod nest;
pub mod node;

#[cfg(test)]
pub(crate) mod testutil;

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::Result;
use crate::model::{Event, EventAddr, EventType, StatType, StatValue, Trace};
use crate::options::GroupingOptions;

pub use group::{GroupMetadata, GroupMetadataMap};
pub use node::{ContextInfo, ContextKind, EventNode, NodeId};

/// Producer and consumer nodes sharing one (kind, id) context key.
///
/// Built during node construction and consumed by the context connector;
/// order within each list is arena order, which keeps edge insertion
/// deterministic.
#[derive(Debug, Default)]
pub(crate) struct ContextGroup {
    pub(crate) producers: Vec<NodeId>,
    pub(crate) consumers: Vec<NodeId>,
}

pub(crate) type ContextGroupMap = IndexMap<(ContextKind, u64), ContextGroup>;

/// The node arena for one trace, plus everything the passes accumulate:
/// per-type indexes, the context registry, root lists, and group metadata.
///
/// The forest holds the trace mutably for its whole lifetime; stat
/// writes (group id, eager flag, step name) go back through it.
#[derive(Debug)]
pub struct EventForest<'t> {
    trace: &'t mut Trace,
    options: GroupingOptions,
    nodes: Vec<EventNode>,
    /// Arena ids per timeline, in construction order.
    timeline_nodes: Vec<Vec<NodeId>>,
    by_type: HashMap<EventType, Vec<NodeId>>,
    context_groups: ContextGroupMap,
    group_metadata: GroupMetadataMap,
    /// Nodes whose event type is in the configured root list.
    legacy_root_events: Vec<NodeId>,
    /// Loop-iteration roots; when non-empty they supersede the legacy set.
    loop_root_events: Vec<NodeId>,
    /// Root node of each created group, in group-id order.
    group_roots: Vec<(i64, NodeId)>,
    next_group_id: i64,
}

impl<'t> EventForest<'t> {
    /// Validate the trace and configuration, build the node arena, and run
    /// the per-timeline nester. Cross-timeline passes run in
    /// [`group_events`](Self::group_events).
    pub fn new(trace: &'t mut Trace, options: &GroupingOptions) -> Result<Self> {
        options.validate()?;
        trace.validate()?;

        let mut forest = EventForest {
            trace,
            options: options.clone(),
            nodes: Vec::new(),
            timeline_nodes: Vec::new(),
            by_type: HashMap::new(),
            context_groups: ContextGroupMap::new(),
            group_metadata: GroupMetadataMap::new(),
            legacy_root_events: Vec::new(),
            loop_root_events: Vec::new(),
            group_roots: Vec::new(),
            next_group_id: 0,
        };
        forest.build_nodes();
        for timeline in 0..forest.timeline_nodes.len() {
            let ids = forest.timeline_nodes[timeline].clone();
            forest.nest_timeline(&ids);
        }
        log::debug!(
            "built event forest: {} nodes across {} timelines",
            forest.nodes.len(),
            forest.timeline_nodes.len()
        );
        Ok(forest)
    }

    fn build_nodes(&mut self) {
        let Self {
            trace,
            options,
            nodes,
            timeline_nodes,
            by_type,
            context_groups,
            legacy_root_events,
            ..
        } = self;

        for (timeline_index, timeline) in trace.timelines.iter().enumerate() {
            let mut ids = Vec::with_capacity(timeline.events.len());
            for (event_index, event) in timeline.events.iter().enumerate() {
                let id = NodeId(nodes.len());
                let producer_context =
                    read_context(event, options.stats.producer_kind, options.stats.producer_id);
                let consumer_context =
                    read_context(event, options.stats.consumer_kind, options.stats.consumer_id);
                let is_root = options.is_root_event(event.event_type);

                nodes.push(EventNode {
                    addr: EventAddr {
                        timeline: timeline_index,
                        event: event_index,
                    },
                    name: event.name.clone(),
                    event_type: event.event_type,
                    start_ns: event.start_ns,
                    end_ns: event.end_ns(),
                    parents: Vec::new(),
                    children: Vec::new(),
                    group_id: None,
                    producer_context,
                    consumer_context,
                    is_root,
                    is_async: options.is_async_event(event.event_type),
                    is_eager: false,
                });

                by_type.entry(event.event_type).or_default().push(id);
                if let Some(ctx) = producer_context {
                    context_groups
                        .entry((ctx.kind, ctx.id))
                        .or_default()
                        .producers
                        .push(id);
                }
                if let Some(ctx) = consumer_context {
                    context_groups
                        .entry((ctx.kind, ctx.id))
                        .or_default()
                        .consumers
                        .push(id);
                }
                if is_root {
                    legacy_root_events.push(id);
                }
                ids.push(id);
            }
            timeline_nodes.push(ids);
        }
    }

    /// Run the full grouping pipeline. Strictly ordered; deterministic for
    /// a given trace and configuration.
    pub fn group_events(&mut self) {
        self.connect_inter_timeline();
        self.connect_context_groups(|kind| kind != ContextKind::DataPipeline);
        self.process_loop_iterations();
        self.mark_eager_host_ops();
        self.mark_eager_kernels();
        self.create_event_groups();
        self.merge_worker_groups();
        self.tag_model_ids();
        self.annotate_selected_group_ids();
    }

    /// Connect data-pipeline producer/consumer events only.
    ///
    /// Independently invokable: enriches an already-grouped forest with
    /// pipeline-stage edges, or runs on its own when grouping is not
    /// needed. Never re-runs nesting or group assignment, and linking is
    /// idempotent.
    pub fn connect_data_pipeline(&mut self) {
        self.connect_context_groups(|kind| kind == ContextKind::DataPipeline);
    }

    pub fn node(&self, id: NodeId) -> &EventNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[EventNode] {
        &self.nodes
    }

    pub fn nodes_of_type(&self, event_type: EventType) -> &[NodeId] {
        self.by_type
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Group metadata keyed by group id, in id order. Exposed for the
    /// reporting layer.
    pub fn group_metadata(&self) -> &GroupMetadataMap {
        &self.group_metadata
    }

    /// One line per group, in id order. Stable across runs on the same
    /// input, so it doubles as a determinism probe in tests.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (group_id, meta) in &self.group_metadata {
            let parents: Vec<_> = meta.parents.iter().collect();
            let children: Vec<_> = meta.children.iter().collect();
            write!(
                out,
                "group {group_id}: name={:?} parents={parents:?} children={children:?}",
                meta.name
            )
            .unwrap();
            if let Some(model_id) = &meta.model_id {
                write!(out, " model={model_id:?}").unwrap();
            }
            out.push('\n');
        }
        out
    }

    /// Link `parent` -> `child`. Nodes may accumulate parents from
    /// nesting and from multiple stitching passes; the relation is a DAG.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parents.push(parent);
    }

    /// Like [`add_child`](Self::add_child) but skips an edge that already
    /// exists, so context connection can be re-invoked safely.
    pub(crate) fn add_child_dedup(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes[child.0].parents.contains(&parent) {
            self.add_child(parent, child);
        }
    }

    /// Nearest ancestor satisfying `pred`, searching breadth-first over
    /// parent edges (closest ancestors first).
    pub(crate) fn find_ancestor(
        &self,
        start: NodeId,
        include_self: bool,
        pred: impl Fn(&EventNode) -> bool,
    ) -> Option<NodeId> {
        let mut queue = VecDeque::new();
        let mut seen = std::collections::HashSet::new();
        if include_self {
            queue.push_back(start);
        } else {
            queue.extend(self.nodes[start.0].parents.iter().copied());
        }
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if pred(&self.nodes[id.0]) {
                return Some(id);
            }
            queue.extend(self.nodes[id.0].parents.iter().copied());
        }
        None
    }

    /// One timeline's node ids sorted by start time, ties by arena order.
    pub(crate) fn timeline_nodes_by_start(&self, timeline: usize) -> Vec<NodeId> {
        let mut ids = self.timeline_nodes[timeline].clone();
        ids.sort_by_key(|&id| (self.nodes[id.0].start_ns, id.0));
        ids
    }

    pub(crate) fn timeline_count(&self) -> usize {
        self.timeline_nodes.len()
    }

    /// Persist a stat onto the event a node wraps.
    pub(crate) fn set_node_stat(&mut self, id: NodeId, stat_type: StatType, value: StatValue) {
        let addr = self.nodes[id.0].addr;
        self.trace.event_mut(addr).set_stat(stat_type, value);
    }

    pub(crate) fn node_stat_tuple(&self, id: NodeId, stats: &[StatType]) -> Option<Vec<u64>> {
        let event = self.trace.event(self.nodes[id.0].addr);
        stats.iter().map(|&stat| event.uint_stat(stat)).collect()
    }

    pub(crate) fn node_str_stat(&self, id: NodeId, stat_type: StatType) -> Option<&str> {
        self.trace.event(self.nodes[id.0].addr).str_stat(stat_type)
    }

    pub(crate) fn node_stat(&self, id: NodeId, stat_type: StatType) -> Option<&StatValue> {
        self.trace.event(self.nodes[id.0].addr).stat(stat_type)
    }
}

/// Full pipeline in one call: build the forest, group, and return the
/// group metadata for reporting. The trace is left annotated in place.
pub fn group_events(trace: &mut Trace, options: &GroupingOptions) -> Result<GroupMetadataMap> {
    let mut forest = EventForest::new(trace, options)?;
    forest.group_events();
    Ok(forest.group_metadata.clone())
}

fn read_context(event: &Event, kind_stat: StatType, id_stat: StatType) -> Option<ContextInfo> {
    let kind = event.int_stat(kind_stat)?;
    let id = event.uint_stat(id_stat)?;
    Some(ContextInfo {
        kind: ContextKind::from_stat(kind),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::testutil::{event, options, single_timeline};
    use super::*;
    use crate::model::Timeline;

    #[test]
    fn test_empty_trace_builds_empty_forest() {
        let mut trace = Trace::new();
        let forest = EventForest::new(&mut trace, &options()).unwrap();
        assert!(forest.nodes().is_empty());
        assert!(forest.group_metadata().is_empty());
    }

    #[test]
    fn test_invalid_trace_fails_before_any_pass() {
        let mut trace = Trace::new();
        trace.push_timeline(Timeline::new(3, "a"));
        trace.push_timeline(Timeline::new(3, "b"));
        assert!(EventForest::new(&mut trace, &options()).is_err());
    }

    #[test]
    fn test_find_ancestor_prefers_nearest() {
        let mut trace = single_timeline(vec![
            event("outer", EventType(1), 0, 100),
            event("mid", EventType(1), 10, 50),
            event("inner", EventType(2), 20, 10),
        ]);
        let forest = EventForest::new(&mut trace, &options()).unwrap();
        let inner = NodeId(2);
        let found = forest
            .find_ancestor(inner, false, |n| n.event_type == EventType(1))
            .unwrap();
        assert_eq!(forest.node(found).name(), "mid");
    }

    #[test]
    fn test_find_ancestor_include_self() {
        let mut trace = single_timeline(vec![event("only", EventType(4), 0, 10)]);
        let forest = EventForest::new(&mut trace, &options()).unwrap();
        assert_eq!(
            forest.find_ancestor(NodeId(0), true, |n| n.event_type == EventType(4)),
            Some(NodeId(0))
        );
        assert_eq!(
            forest.find_ancestor(NodeId(0), false, |n| n.event_type == EventType(4)),
            None
        );
    }

    #[test]
    fn test_determinism_across_runs() {
        let build = || {
            let mut trace = Trace::new();
            let mut t0 = Timeline::new(0, "main");
            t0.push(event("root_a", EventType(10), 0, 100));
            t0.push(event("child", EventType(11), 10, 20));
            let mut t1 = Timeline::new(1, "worker");
            t1.push(event("root_b", EventType(10), 50, 100));
            trace.push_timeline(t0);
            trace.push_timeline(t1);
            trace
        };
        let mut opts = options();
        opts.root_events.push(EventType(10));

        let mut first = build();
        let mut second = build();
        let summary_a = {
            let mut forest = EventForest::new(&mut first, &opts).unwrap();
            forest.group_events();
            forest.summary()
        };
        let summary_b = {
            let mut forest = EventForest::new(&mut second, &opts).unwrap();
            forest.group_events();
            forest.summary()
        };
        assert_eq!(summary_a, summary_b);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
