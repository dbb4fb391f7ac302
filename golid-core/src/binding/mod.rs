//! Binding Layer
//!
//! The boundary between the reactive core and an external rendering layer.
//!
//! # Overview
//!
//! - `target`: opaque target IDs, the [`RenderTarget`] handle trait, and the
//!   [`TargetRegistry`] that resolves IDs and parks undeliverable patches.
//! - `patch`: the [`Patch`] data structure describing "replace this target's
//!   content".
//! - `event`: handler registration for external events.
//! - `adapter`: binding adapters, i.e. effects that render into a target.
//!
//! Nothing here adds reactivity rules. A binding is an ordinary effect, and an
//! event handler is ordinary code that happens to write signals.

mod adapter;
mod event;
mod patch;
mod target;

pub use adapter::{bind_input, bind_markup, bind_text, Binding};
pub use event::{Event, EventKind};
pub use patch::{Patch, PatchKind};
pub use target::{RenderTarget, TargetId, TargetRegistry};
