//! Cross-timeline stitching.
//!
//! Two mechanisms join causally related events across timelines:
//!
//! - **Rules**: a [`ConnectRule`](crate::options::ConnectRule) joins a
//!   parent event type to a child event type through equal stat-value
//!   tuples (e.g. a shared correlation id).
//! - **Contexts**: nodes exposing a producer or consumer context are
//!   registered under their (kind, id) key during construction; every
//!   producer then becomes a parent of every consumer under the same key.

use std::collections::HashMap;

use super::{ContextKind, EventForest, NodeId};

impl EventForest<'_> {
    /// Evaluate every connect rule, in list order.
    ///
    /// Per rule: index candidate parents by their stat-value tuple, then
    /// attach them to every child-type node carrying an equal tuple. A
    /// node missing any required stat is excluded from that rule's
    /// matching; rules are additive and never remove earlier edges.
    pub(crate) fn connect_inter_timeline(&mut self) {
        let rules = self.options.connect_rules.clone();
        for (index, rule) in rules.iter().enumerate() {
            let mut candidates: HashMap<Vec<u64>, Vec<NodeId>> = HashMap::new();
            for &parent in self.nodes_of_type(rule.parent_event) {
                if let Some(key) = self.node_stat_tuple(parent, &rule.parent_stats) {
                    candidates.entry(key).or_default().push(parent);
                }
            }
            if candidates.is_empty() {
                continue;
            }

            let children: Vec<NodeId> = self.nodes_of_type(rule.child_event).to_vec();
            let mut edges = 0usize;
            for child in children {
                let Some(key) = self.node_stat_tuple(child, &rule.child_stats) else {
                    continue;
                };
                if let Some(parents) = candidates.get(&key) {
                    for &parent in parents {
                        self.add_child(parent, child);
                        edges += 1;
                    }
                }
            }
            log::debug!("connect rule {index}: added {edges} cross-timeline edges");
        }
    }

    /// Link every producer to every consumer sharing a context key, for
    /// the kinds selected by `select`. The general connection phase takes
    /// every kind except [`ContextKind::DataPipeline`]; the dedicated
    /// data-pipeline entry point takes exactly that kind.
    ///
    /// Existing edges are skipped, so invoking this twice over the same
    /// kinds does not duplicate parents.
    pub(crate) fn connect_context_groups(&mut self, select: impl Fn(ContextKind) -> bool) {
        let mut links: Vec<(NodeId, NodeId)> = Vec::new();
        for (&(kind, _id), group) in &self.context_groups {
            if !select(kind) || group.producers.is_empty() || group.consumers.is_empty() {
                continue;
            }
            for &producer in &group.producers {
                for &consumer in &group.consumers {
                    links.push((producer, consumer));
                }
            }
        }
        for (producer, consumer) in links {
            self.add_child_dedup(producer, consumer);
        }
    }
}
