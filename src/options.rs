//! Pipeline configuration, supplied by the caller.
//!
//! All identifiers here come from the external semantic-typing layer; the
//! pipeline never interprets them beyond equality. Passes whose event
//! types are left unset simply do not run.

use crate::error::{Result, StitchError};
use crate::model::{EventType, StatType};

/// Declares that events of `parent_event` connect as parents of events of
/// `child_event` when the stat values named by `parent_stats` equal,
/// pairwise, the values named by `child_stats`.
///
/// Rules are evaluated independently and in list order; later rules add
/// parents without removing earlier ones. A node missing any required
/// stat is excluded from that rule's matching.
#[derive(Debug, Clone)]
pub struct ConnectRule {
    pub parent_event: EventType,
    pub child_event: EventType,
    pub parent_stats: Vec<StatType>,
    pub child_stats: Vec<StatType>,
}

impl ConnectRule {
    /// Rule matching on the same stat types on both sides, the common case
    /// (e.g. a shared correlation or step id).
    pub fn symmetric(parent_event: EventType, child_event: EventType, stats: Vec<StatType>) -> Self {
        Self {
            parent_event,
            child_event,
            parent_stats: stats.clone(),
            child_stats: stats,
        }
    }
}

/// Semantic stat ids consumed and produced by the pipeline.
#[derive(Debug, Clone)]
pub struct StatIds {
    /// Producer-side context kind, read during node construction.
    pub producer_kind: StatType,
    /// Producer-side context id.
    pub producer_id: StatType,
    /// Consumer-side context kind.
    pub consumer_kind: StatType,
    /// Consumer-side context id.
    pub consumer_id: StatType,
    /// Model identifier read from inference roots or their ancestors.
    pub model_id: StatType,
    /// Written back: the assigned group id.
    pub group_id: StatType,
    /// Written back on root events: the group's display name.
    pub group_name: StatType,
    /// Read (preferred group name) and written back on loop roots.
    pub step_name: StatType,
    /// Written back: 1 on eagerly executed ops and kernels.
    pub is_eager: StatType,
    /// Written back: own group plus directly related group ids.
    pub selected_group_ids: StatType,
}

/// Configuration for one grouping run.
#[derive(Debug, Clone)]
pub struct GroupingOptions {
    pub connect_rules: Vec<ConnectRule>,
    /// Event types whose nodes seed legacy root detection.
    pub root_events: Vec<EventType>,
    /// Executor event type scanned for loop-iteration roots. When
    /// iterations are found they supersede the legacy root set entirely.
    pub loop_executor_event: Option<EventType>,
    /// Dispatcher event type whose group absorbs trailing eager ops on
    /// the same timeline (worker merge).
    pub function_run_event: Option<EventType>,
    /// Graph-execution region types; an op nested under one of these is
    /// not eager.
    pub graph_run_events: Vec<EventType>,
    /// Host op event type checked by the CPU eager pass and worker merge.
    pub host_op_event: Option<EventType>,
    /// Kernel launch event type checked by the GPU eager pass.
    pub kernel_launch_event: Option<EventType>,
    /// Event types excluded from containment nesting. Async dispatch
    /// events span their whole timeline and would otherwise swallow every
    /// later event as a child.
    pub async_events: Vec<EventType>,
    pub stats: StatIds,
}

impl GroupingOptions {
    pub fn new(stats: StatIds) -> Self {
        Self {
            connect_rules: Vec::new(),
            root_events: Vec::new(),
            loop_executor_event: None,
            function_run_event: None,
            graph_run_events: Vec::new(),
            host_op_event: None,
            kernel_launch_event: None,
            async_events: Vec::new(),
            stats,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (index, rule) in self.connect_rules.iter().enumerate() {
            if rule.parent_stats.len() != rule.child_stats.len() {
                return Err(StitchError::MismatchedRuleStats {
                    index,
                    parent_len: rule.parent_stats.len(),
                    child_len: rule.child_stats.len(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn is_root_event(&self, event_type: EventType) -> bool {
        self.root_events.contains(&event_type)
    }

    pub(crate) fn is_async_event(&self, event_type: EventType) -> bool {
        self.async_events.contains(&event_type)
    }

    pub(crate) fn is_graph_run_event(&self, event_type: EventType) -> bool {
        self.graph_run_events.contains(&event_type)
    }
}
