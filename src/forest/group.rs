//! Group assembly: root selection, deterministic id assignment, group
//! metadata, and the selected-group-ids annotation.

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use serde::Serialize;

use super::{EventForest, NodeId};
use crate::model::StatValue;

/// Display and relationship metadata for one group.
///
/// Created on first encounter of a new root and refined by later passes
/// (model-id tagging, worker merge); never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupMetadata {
    pub name: String,
    /// Inference model identifier; labeling only, no effect on membership.
    pub model_id: Option<String>,
    /// Groups that reached into this group during assignment.
    pub parents: BTreeSet<i64>,
    /// Groups this group reached into.
    pub children: BTreeSet<i64>,
}

/// Group metadata keyed by group id. Insertion order is id order, so
/// iteration is deterministic.
pub type GroupMetadataMap = IndexMap<i64, GroupMetadata>;

impl EventForest<'_> {
    /// Create event groups from the effective root set.
    ///
    /// Loop-iteration roots, when any were detected, supersede the legacy
    /// root set entirely. Roots are processed in (start time, arena id)
    /// order; each still-ungrouped root allocates the next group id and
    /// propagates it through its reachable descendants.
    pub(crate) fn create_event_groups(&mut self) {
        let mut roots = if self.loop_root_events.is_empty() {
            self.legacy_root_events.clone()
        } else {
            self.loop_root_events.clone()
        };
        // Ties at identical start times resolve by arena order, keeping
        // the id sequence reproducible across runs.
        roots.sort_by_key(|&id| (self.node(id).start_ns, id));

        for root in roots {
            if self.node(root).group_id.is_some() {
                continue;
            }
            let group_id = self.next_group_id;
            self.next_group_id += 1;

            let name = self
                .node_str_stat(root, self.options.stats.step_name)
                .unwrap_or(self.node(root).name())
                .to_string();
            self.set_node_stat(
                root,
                self.options.stats.group_name,
                StatValue::Str(name.clone()),
            );
            self.group_metadata.insert(
                group_id,
                GroupMetadata {
                    name,
                    ..GroupMetadata::default()
                },
            );
            self.group_roots.push((group_id, root));
            self.propagate_group_id(root, group_id);
            log::debug!(
                "group {group_id}: rooted at '{}' start={}ns",
                self.node(root).name(),
                self.node(root).start_ns
            );
        }
    }

    /// Assign `group_id` to every node reachable from `root` that has no
    /// group yet. First assignment wins: reaching a node already owned by
    /// a different group records the symmetric cross-group relationship
    /// instead of overwriting.
    pub(crate) fn propagate_group_id(&mut self, root: NodeId, group_id: i64) {
        let group_id_stat = self.options.stats.group_id;
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            match self.node(id).group_id {
                Some(existing) if existing == group_id => continue,
                Some(existing) => {
                    self.group_metadata
                        .entry(group_id)
                        .or_default()
                        .children
                        .insert(existing);
                    self.group_metadata
                        .entry(existing)
                        .or_default()
                        .parents
                        .insert(group_id);
                    continue;
                }
                None => {
                    self.nodes[id.0].group_id = Some(group_id);
                    self.set_node_stat(id, group_id_stat, StatValue::Int(group_id));
                    queue.extend(self.nodes[id.0].children.iter().copied());
                }
            }
        }
    }

    /// Annotate every grouped node with its own group id plus the ids of
    /// directly related groups, for downstream correlation display.
    ///
    /// Pure function of the group assignment, so re-running it on an
    /// already-annotated trace rewrites identical values.
    pub(crate) fn annotate_selected_group_ids(&mut self) {
        let selected_stat = self.options.stats.selected_group_ids;
        for id in (0..self.nodes.len()).map(NodeId) {
            let Some(group_id) = self.node(id).group_id else {
                continue;
            };
            let mut selected = BTreeSet::from([group_id]);
            if let Some(meta) = self.group_metadata.get(&group_id) {
                selected.extend(meta.parents.iter().copied());
                selected.extend(meta.children.iter().copied());
            }
            let selected: Vec<i64> = selected.into_iter().collect();
            self.set_node_stat(id, selected_stat, StatValue::IntList(selected));
        }
    }
}
