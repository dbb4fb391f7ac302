//! Render Targets
//!
//! A binding writes its output into a target owned by the rendering layer.
//! The core never holds structural references into rendered output; it only
//! knows targets by an opaque [`TargetId`], and the rendering layer tells the
//! [`TargetRegistry`] when the element behind an ID exists.
//!
//! # Deferred Delivery
//!
//! Bindings run as soon as they are created, which is usually before the
//! rendering layer has inserted the placeholder. A patch for a target that
//! is not attached yet is parked in the registry. Only the latest patch per
//! target is kept, and it is applied as soon as the target is attached.
//! Nothing polls.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::event::{EventKind, Handler};
use super::patch::Patch;
use crate::error::BindError;
use crate::reactive::Runtime;

/// Opaque, stable identifier of an external render target.
///
/// Its [`Display`](fmt::Display) form is suitable as an element ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "golid-{}", self.0)
    }
}

/// A live handle to an external render target.
///
/// Implemented by the rendering layer. `apply` replaces the target's content
/// as described by the patch. It is called while the reactive lane is held,
/// so it must not block on other threads that use signals.
pub trait RenderTarget: Send + Sync {
    fn apply(&self, patch: &Patch);
}

impl<F> RenderTarget for F
where
    F: Fn(&Patch) + Send + Sync,
{
    fn apply(&self, patch: &Patch) {
        self(patch)
    }
}

#[derive(Default)]
pub(super) struct RegistryState {
    attached: HashMap<TargetId, Arc<dyn RenderTarget>>,

    /// Latest undelivered patch per detached target.
    parked: IndexMap<TargetId, Patch>,

    pub(super) handlers: HashMap<(TargetId, EventKind), Handler>,
}

/// Resolves target IDs to live render targets.
///
/// Shared between bindings (which deliver patches) and the rendering layer
/// (which attaches targets and dispatches events). Cloning shares state.
#[derive(Clone, Default)]
pub struct TargetRegistry {
    pub(super) state: Arc<Mutex<RegistryState>>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that the target behind `id` now exists.
    ///
    /// A parked patch for the target is applied immediately. Attaching an
    /// already attached ID replaces the handle.
    ///
    /// Attach, detach and delivery are ordered through the reactive lane, so
    /// a patch delivered concurrently is either flushed here or applied
    /// after the parked one, never stranded.
    pub fn attach(&self, id: TargetId, target: Arc<dyn RenderTarget>) {
        let _lane = Runtime::enter();
        let parked = {
            let mut state = self.state.lock();
            state.attached.insert(id, Arc::clone(&target));
            state.parked.shift_remove(&id)
        };
        debug!(target_id = %id, flushed = parked.is_some(), "target attached");

        if let Some(patch) = parked {
            target.apply(&patch);
        }
    }

    /// Report that the target behind `id` is gone.
    ///
    /// Later patches for it are parked until it is attached again.
    pub fn detach(&self, id: TargetId) -> Option<Arc<dyn RenderTarget>> {
        let _lane = Runtime::enter();
        let removed = self.state.lock().attached.remove(&id);
        debug!(target_id = %id, "target detached");
        removed
    }

    /// Resolve an ID to its live handle.
    pub fn resolve(&self, id: TargetId) -> Result<Arc<dyn RenderTarget>, BindError> {
        self.state
            .lock()
            .attached
            .get(&id)
            .cloned()
            .ok_or(BindError::Unresolved(id))
    }

    /// Check whether a target is attached.
    pub fn is_attached(&self, id: TargetId) -> bool {
        self.state.lock().attached.contains_key(&id)
    }

    /// Apply `patch` to its target, or park it if the target is not attached.
    ///
    /// Returns true if the patch was applied now.
    pub fn deliver(&self, patch: Patch) -> bool {
        let _lane = Runtime::enter();
        let target = {
            let mut state = self.state.lock();
            match state.attached.get(&patch.target).cloned() {
                Some(target) => target,
                None => {
                    debug!(target_id = %patch.target, "patch parked");
                    state.parked.insert(patch.target, patch);
                    return false;
                }
            }
        };

        trace!(target_id = %patch.target, "patch applied");
        target.apply(&patch);
        true
    }

    /// The patch waiting for a detached target, if any.
    ///
    /// The rendering layer may use this to render initial content inline.
    pub fn parked(&self, id: TargetId) -> Option<Patch> {
        self.state.lock().parked.get(&id).cloned()
    }

    /// Number of targets with a parked patch.
    pub fn parked_count(&self) -> usize {
        self.state.lock().parked.len()
    }

    /// Drop everything the registry knows about a target.
    pub fn forget(&self, id: TargetId) {
        let mut state = self.state.lock();
        state.attached.remove(&id);
        state.parked.shift_remove(&id);
        state.handlers.retain(|(target, _), _| *target != id);
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TargetRegistry")
            .field("attached", &state.attached.len())
            .field("parked", &state.parked.len())
            .field("handlers", &state.handlers.len())
            .finish()
    }
}
