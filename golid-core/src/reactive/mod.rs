//! Reactive Primitives
//!
//! This module implements the reactive core: signals, effects, and the
//! dependency tracking that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal is read while an
//! effect is running, the signal registers that effect as a dependent. When
//! the signal is written, all current dependents re-run.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once when created and
//! again whenever a signal it read during its last run is written. Effects
//! synchronize reactive state with the outside world, such as a rendered
//! page or a log.
//!
//! # Implementation Notes
//!
//! Tracking is automatic: nobody subscribes explicitly. A process-wide
//! context stack records which effect is running, and every signal read
//! consults it. Before each run an effect detaches from all of its old
//! dependencies, so its dependency set always matches exactly what its
//! latest run read.
//!
//! Writes propagate synchronously and sequentially on the writer's thread.
//! See `scheduler.rs` for the dispatch policy and `runtime.rs` for how
//! access from several threads is serialized.

mod config;
mod context;
mod effect;
mod id;
mod runtime;
mod scheduler;
mod signal;

pub use config::RuntimeConfig;
pub use effect::{watch, Effect};
pub use id::{EffectId, SignalId};
pub use runtime::Runtime;
pub use signal::Signal;
