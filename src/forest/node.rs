//! Arena-backed event nodes.
//!
//! Nodes live in the [`EventForest`](super::EventForest) arena and refer
//! to each other by [`NodeId`], so a node can hold multiple parents (one
//! from nesting, more from cross-timeline stitching) without ownership
//! cycles. The parent/child relation is a DAG, not necessarily a tree.

use serde::Serialize;

use crate::model::{EventAddr, EventType};

/// Stable index of a node in the forest arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Closed set of context kinds used to match producers to consumers.
///
/// The kind arrives as a numeric stat value; unknown values decode to
/// [`Generic`](ContextKind::Generic) so traces from newer collectors
/// still connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ContextKind {
    Generic,
    Gpu,
    Executor,
    DataPipeline,
}

impl ContextKind {
    pub fn from_stat(value: i64) -> Self {
        match value {
            1 => ContextKind::Gpu,
            2 => ContextKind::Executor,
            3 => ContextKind::DataPipeline,
            _ => ContextKind::Generic,
        }
    }
}

/// A (kind, id) pair matching causally related events across timelines,
/// modeling asynchronous launch/completion or send/receive correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContextInfo {
    pub kind: ContextKind,
    pub id: u64,
}

/// Graph wrapper around one event: containment and cross-timeline edges,
/// group assignment, derived contexts, and heuristic flags.
///
/// Created once per raw event and mutated in place by every pass; never
/// destroyed during the pipeline.
#[derive(Debug, Clone)]
pub struct EventNode {
    pub(crate) addr: EventAddr,
    pub(crate) name: String,
    pub(crate) event_type: EventType,
    pub(crate) start_ns: u64,
    pub(crate) end_ns: u64,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) group_id: Option<i64>,
    pub(crate) producer_context: Option<ContextInfo>,
    pub(crate) consumer_context: Option<ContextInfo>,
    pub(crate) is_root: bool,
    pub(crate) is_async: bool,
    pub(crate) is_eager: bool,
}

impl EventNode {
    /// Address of the wrapped event in the trace.
    pub fn addr(&self) -> EventAddr {
        self.addr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn start_ns(&self) -> u64 {
        self.start_ns
    }

    /// Exclusive end of the event's time range.
    pub fn end_ns(&self) -> u64 {
        self.end_ns
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group_id
    }

    pub fn producer_context(&self) -> Option<ContextInfo> {
        self.producer_context
    }

    pub fn consumer_context(&self) -> Option<ContextInfo> {
        self.consumer_context
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn is_eager(&self) -> bool {
        self.is_eager
    }
}
