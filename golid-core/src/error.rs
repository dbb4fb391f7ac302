//! Error types.
//!
//! Ordinary reads, writes and effect runs never fail. The errors here cover
//! the opt-in dispatch depth limit, configuration parsing, and the boundary
//! toward the rendering layer.

use thiserror::Error;

use crate::binding::TargetId;
use crate::reactive::SignalId;

/// Errors raised by the reactive core.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A write would have nested dispatches deeper than the configured limit.
    ///
    /// The value was stored; its dependents were not re-run.
    #[error("dispatch for {signal} refused at depth {depth} (limit {limit})")]
    DispatchDepthExceeded {
        signal: SignalId,
        depth: usize,
        limit: usize,
    },

    /// A batch flush would have exceeded the configured depth limit.
    #[error("batch flush refused at depth {depth} (limit {limit})")]
    FlushDepthExceeded { depth: usize, limit: usize },

    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Errors at the boundary toward the rendering layer.
#[derive(Debug, Error)]
pub enum BindError {
    /// The target has not been attached (yet). Not fatal.
    #[error("target {0} is not attached")]
    Unresolved(TargetId),

    #[error("failed to encode patch as MessagePack: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode MessagePack patch: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("failed to encode patch as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
