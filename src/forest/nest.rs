//! Intra-timeline containment nesting.
//!
//! Rebuilds parent/child edges from time ranges alone: an event's nearest
//! enclosing event on the same timeline becomes its parent. One linear
//! scan over the timeline after sorting, so O(n log n) per timeline, and
//! each timeline is independent of every other.

use super::{EventForest, NodeId};

impl EventForest<'_> {
    /// Build containment edges for one timeline's nodes.
    ///
    /// Events are visited in (start asc, duration desc) order so that a
    /// zero-duration event sitting exactly on its container's start
    /// boundary is visited after the container and nests correctly. A
    /// stack tracks currently-open intervals; the top of the stack after
    /// popping closed intervals is the nearest enclosing candidate.
    ///
    /// Partial overlap is not a containment relation: if the candidate
    /// ends before the current event does, no edge is created.
    pub(crate) fn nest_timeline(&mut self, timeline_nodes: &[NodeId]) {
        let mut order: Vec<NodeId> = timeline_nodes
            .iter()
            .copied()
            .filter(|&id| !self.node(id).is_async())
            .collect();
        // Duration desc == end desc once starts are equal.
        order.sort_by(|&a, &b| {
            let (na, nb) = (self.node(a), self.node(b));
            na.start_ns
                .cmp(&nb.start_ns)
                .then(nb.end_ns.cmp(&na.end_ns))
                .then(a.cmp(&b))
        });

        let mut open: Vec<NodeId> = Vec::new();
        for id in order {
            let (start, end) = {
                let node = self.node(id);
                (node.start_ns, node.end_ns)
            };
            while let Some(&top) = open.last() {
                if self.node(top).end_ns <= start {
                    open.pop();
                } else {
                    break;
                }
            }
            if let Some(&top) = open.last()
                && self.node(top).end_ns >= end
            {
                self.add_child(top, id);
            }
            open.push(id);
        }
    }
}
