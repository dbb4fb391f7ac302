//! Golid Core
//!
//! This crate provides the reactive core of the Golid declarative UI
//! toolkit. It implements:
//!
//! - Reactive primitives (signals and effects) with automatic, dynamic
//!   dependency tracking
//! - Synchronous notification dispatch, with optional batching
//! - Binding adapters that keep externally rendered targets in sync
//!
//! Rendering markup, diffing, and talking to a browser are left to the
//! rendering layer, which consumes [`binding::Patch`]es and reports events.
//!
//! # Architecture
//!
//! - `reactive`: signals, effects, dependency tracking, and dispatch
//! - `binding`: render targets, patches, event handlers, binding adapters
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use golid_core::reactive::{watch, Signal};
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let count = Signal::new(0);
//!
//! let (c, l) = (count.clone(), log.clone());
//! watch(move || l.lock().push(c.get()));
//!
//! count.set(5);
//! count.set(5);
//! assert_eq!(*log.lock(), vec![0, 5, 5]);
//! ```

pub mod binding;
pub mod error;
pub mod reactive;

pub use error::{BindError, ReactiveError};
