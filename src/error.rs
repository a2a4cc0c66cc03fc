//! Typed errors for structural precondition violations.
//!
//! The grouping pipeline is best-effort over potentially incomplete
//! traces: missing stats silently exclude a node from a rule, and nodes
//! unreachable from any root simply stay ungrouped. The only failures are
//! structurally invalid input or configuration, and those are rejected
//! before any pass runs.

/// Structural errors detected before the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StitchError {
    /// A connect rule's parent and child stat lists must pair up
    /// one-to-one; values are compared positionally.
    #[error(
        "connect rule {index}: parent stat list has {parent_len} entries, child stat list has {child_len}"
    )]
    MismatchedRuleStats {
        index: usize,
        parent_len: usize,
        child_len: usize,
    },

    /// Two timelines carry the same id.
    #[error("duplicate timeline id {id} ('{name}')")]
    DuplicateTimeline { id: u64, name: String },

    /// An event's start + duration does not fit in the time domain.
    #[error("timeline {timeline_id} event {event_index}: start + duration overflows")]
    TimeRangeOverflow { timeline_id: u64, event_index: usize },
}

pub type Result<T> = std::result::Result<T, StitchError>;
