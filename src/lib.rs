//! Causal structure reconstruction for profiler traces.
//!
//! A captured trace is a flat collection of timestamped events spread over
//! timelines (one per thread or device). This crate rebuilds the causal
//! structure of such a trace and partitions every event into exactly one
//! logical execution group:
//!
//! 1. **Nesting** — containment trees per timeline (an event's nearest
//!    enclosing event becomes its parent).
//! 2. **Stitching** — cross-timeline edges from declarative
//!    [`ConnectRule`]s and from producer/consumer context matching.
//! 3. **Grouping** — deterministic assignment of every reachable event to
//!    a group rooted at a designated root event, with cross-group
//!    relationship metadata.
//!
//! Heuristic passes (loop-iteration roots, eager-execution marking, worker
//! merge, model-id tagging) refine the result. See [`EventForest`] for the
//! pipeline, or [`group_events`] for the one-call entry point.

pub mod error;
pub mod forest;
pub mod model;
pub mod options;

pub use error::{Result, StitchError};
pub use forest::{
    ContextInfo, ContextKind, EventForest, GroupMetadata, GroupMetadataMap, NodeId, group_events,
};
pub use model::{Event, EventType, StatType, StatValue, Timeline, Trace};
pub use options::{ConnectRule, GroupingOptions, StatIds};
