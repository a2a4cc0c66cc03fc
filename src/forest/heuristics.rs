//! Domain heuristics layered on top of the structural passes.
//!
//! Each pass is optional: it runs only when its event types are
//! configured, and a node missing a required stat is silently skipped.
//! Ordering matters and is fixed by the pipeline: loop detection and
//! eager marking run before group assembly, worker merge and model-id
//! tagging after it.

use std::collections::VecDeque;

use super::{EventForest, NodeId};
use crate::model::StatValue;

impl EventForest<'_> {
    /// Detect loop iterations on the configured executor event type.
    ///
    /// Scanning each timeline in time order, an executor event whose
    /// predecessor is not an executor event (or that is first overall)
    /// starts a new iteration: it is flagged as a root and registered as
    /// a loop root. Any detected loop root supersedes the legacy root set
    /// during group assembly. Iteration roots without a caller-provided
    /// step name get one, so groups read as "Iteration N".
    pub(crate) fn process_loop_iterations(&mut self) {
        let Some(executor) = self.options.loop_executor_event else {
            return;
        };
        let step_name_stat = self.options.stats.step_name;
        for timeline in 0..self.timeline_count() {
            let ids = self.timeline_nodes_by_start(timeline);
            let mut prev_was_executor = false;
            let mut iteration = 0u64;
            for id in ids {
                let is_executor = self.node(id).event_type == executor;
                if is_executor && !prev_was_executor {
                    iteration += 1;
                    self.nodes[id.0].is_root = true;
                    self.loop_root_events.push(id);
                    if self.node_str_stat(id, step_name_stat).is_none() {
                        self.set_node_stat(
                            id,
                            step_name_stat,
                            StatValue::Str(format!("Iteration {iteration}")),
                        );
                    }
                    log::debug!(
                        "loop iteration {iteration} rooted at '{}' on timeline {timeline}",
                        self.node(id).name()
                    );
                }
                prev_was_executor = is_executor;
            }
        }
    }

    /// Mark eagerly executed host ops: a host op with no graph-execution
    /// ancestor runs outside any compiled region.
    pub(crate) fn mark_eager_host_ops(&mut self) {
        let Some(host_op) = self.options.host_op_event else {
            return;
        };
        let is_eager_stat = self.options.stats.is_eager;
        let graph_types = self.options.graph_run_events.clone();
        let ops: Vec<NodeId> = self.nodes_of_type(host_op).to_vec();
        let mut marked = 0usize;
        for id in ops {
            let inside_graph = self
                .find_ancestor(id, false, |n| graph_types.contains(&n.event_type))
                .is_some();
            if !inside_graph {
                self.nodes[id.0].is_eager = true;
                self.set_node_stat(id, is_eager_stat, StatValue::Int(1));
                marked += 1;
            }
        }
        log::debug!("eager marking: {marked} host ops");
    }

    /// Mark eagerly executed kernels: a kernel launch inherits eagerness
    /// from the nearest host op that launched it (reached through the
    /// cross-timeline edges). Runs after the host-op pass.
    pub(crate) fn mark_eager_kernels(&mut self) {
        let Some(kernel) = self.options.kernel_launch_event else {
            return;
        };
        let Some(host_op) = self.options.host_op_event else {
            return;
        };
        let is_eager_stat = self.options.stats.is_eager;
        let kernels: Vec<NodeId> = self.nodes_of_type(kernel).to_vec();
        for id in kernels {
            let Some(op) = self.find_ancestor(id, false, |n| n.event_type == host_op) else {
                continue;
            };
            if self.node(op).is_eager {
                self.nodes[id.0].is_eager = true;
                self.set_node_stat(id, is_eager_stat, StatValue::Int(1));
            }
        }
    }

    /// Fold eager ops dispatched right after a function run into the
    /// function run's group.
    ///
    /// A dispatcher thread runs a function-run root and then invokes a
    /// sequence of callback ops on the same timeline; those ops are one
    /// logical unit with the function run, not new groups. The merge
    /// window closes at the next root on the timeline.
    pub(crate) fn merge_worker_groups(&mut self) {
        let Some(function_run) = self.options.function_run_event else {
            return;
        };
        let Some(host_op) = self.options.host_op_event else {
            return;
        };
        for timeline in 0..self.timeline_count() {
            let ids = self.timeline_nodes_by_start(timeline);
            let mut current: Option<i64> = None;
            for id in ids {
                let node = self.node(id);
                if node.event_type == function_run && node.group_id.is_some() {
                    current = node.group_id;
                    continue;
                }
                if node.is_root {
                    current = None;
                    continue;
                }
                let Some(group_id) = current else {
                    continue;
                };
                if node.event_type == host_op && node.is_eager && node.group_id != Some(group_id) {
                    self.fold_into_group(id, group_id);
                }
            }
        }
    }

    /// Reassign one node to `group_id` and pull its still-ungrouped
    /// descendants along. Descendants owned by another group keep it.
    fn fold_into_group(&mut self, id: NodeId, group_id: i64) {
        let group_id_stat = self.options.stats.group_id;
        log::debug!(
            "worker merge: folding '{}' into group {group_id}",
            self.node(id).name()
        );
        self.nodes[id.0].group_id = Some(group_id);
        self.set_node_stat(id, group_id_stat, StatValue::Int(group_id));
        let mut queue: VecDeque<NodeId> = self.nodes[id.0].children.iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if self.node(next).group_id.is_some() {
                continue;
            }
            self.nodes[next.0].group_id = Some(group_id);
            self.set_node_stat(next, group_id_stat, StatValue::Int(group_id));
            queue.extend(self.nodes[next.0].children.iter().copied());
        }
    }

    /// Copy a model-id stat found on a group's root (or the root's
    /// nearest ancestor) into the group metadata. Labeling only; group
    /// membership is unaffected.
    pub(crate) fn tag_model_ids(&mut self) {
        let model_stat = self.options.stats.model_id;
        let roots = self.group_roots.clone();
        for (group_id, root) in roots {
            let Some(holder) = self.find_ancestor(root, true, |n| {
                self.trace.event(n.addr).stat(model_stat).is_some()
            }) else {
                continue;
            };
            let Some(model_id) = self.node_stat(holder, model_stat).and_then(stat_display) else {
                continue;
            };
            if let Some(meta) = self.group_metadata.get_mut(&group_id) {
                meta.model_id = Some(model_id.clone());
            }
            if holder != root {
                self.set_node_stat(root, model_stat, StatValue::Str(model_id));
            }
        }
    }
}

/// Render a stat value as a display string, for model-id labeling.
fn stat_display(value: &StatValue) -> Option<String> {
    match value {
        StatValue::Str(s) => Some(s.clone()),
        StatValue::Int(i) => Some(i.to_string()),
        StatValue::Uint(u) => Some(u.to_string()),
        StatValue::Double(d) => Some(d.to_string()),
        StatValue::IntList(_) => None,
    }
}
