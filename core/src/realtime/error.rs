//! Error types for the realtime aggregates

use thiserror::Error;

/// Errors from the realtime aggregation engine.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// An event was routed to an entity that does not own it. This is a
    /// contract violation in the caller's routing, not a runtime condition.
    #[error("event owner {actual} does not match entity {expected}")]
    OwnerMismatch { expected: String, actual: String },
}
