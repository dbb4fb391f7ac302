//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever one of
//! the signals it read during its last run is written.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately. Every signal read
//!    during that run becomes a dependency.
//!
//! 2. When any dependency is written, the effect re-runs synchronously,
//!    before the write returns.
//!
//! 3. Before re-running, the effect detaches itself from every signal it
//!    previously depended on and rebuilds its dependency set from the reads
//!    of the new run. Dependencies are therefore exact, never a union of
//!    everything ever read.
//!
//! # Ownership
//!
//! An effect created while another effect is running is owned by that
//! effect. Owned effects are disposed when their owner re-runs or is
//! disposed, so re-rendering a binding does not leak the bindings it
//! created last time.
//!
//! # Lifetime
//!
//! Dropping an [`Effect`] handle does not stop the effect: the signals it
//! depends on keep it alive. Call [`Effect::dispose`] to detach it from
//! every signal and release its body.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::id::{EffectId, SignalId};
use super::runtime::Runtime;
use super::signal::Source;

/// Type-erased effect body.
pub(crate) type Body = Arc<dyn Fn() + Send + Sync>;

/// Shared state behind every [`Effect`] handle.
///
/// All mutation happens while the runtime lane is held. The mutexes only
/// exist so the state can be shared across threads.
pub(crate) struct EffectCore {
    id: EffectId,

    /// Taken on disposal to release whatever the body captured.
    body: Mutex<Option<Body>>,

    /// Signals read during the most recent run, in first-read order.
    dependencies: Mutex<IndexMap<SignalId, Weak<dyn Source>>>,

    /// Effects created during the most recent run.
    children: Mutex<Vec<Arc<EffectCore>>>,

    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectCore {
    pub(crate) fn new(body: Body) -> Self {
        Self {
            id: EffectId::new(),
            body: Mutex::new(Some(body)),
            dependencies: Mutex::new(IndexMap::new()),
            children: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn body(&self) -> Option<Body> {
        self.body.lock().clone()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn record_run(&self) -> usize {
        self.run_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a dependency. Returns false if it was already recorded.
    pub(crate) fn add_dependency(&self, id: SignalId, source: Weak<dyn Source>) -> bool {
        let mut dependencies = self.dependencies.lock();
        if dependencies.contains_key(&id) {
            return false;
        }
        dependencies.insert(id, source);
        true
    }

    /// Remove this effect from the dependent set of every signal it read
    /// last time, and forget those signals.
    pub(crate) fn detach_all(&self) {
        let previous = std::mem::take(&mut *self.dependencies.lock());

        for (signal_id, source) in previous {
            if let Some(source) = source.upgrade() {
                source.remove_dependent(self.id);
                trace!(effect = %self.id, signal = %signal_id, "detached");
            }
        }
    }

    pub(crate) fn adopt(&self, child: Arc<EffectCore>) {
        self.children.lock().push(child);
    }

    pub(crate) fn dispose_children(&self) {
        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            child.dispose();
        }
    }

    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.detach_all();
        self.dispose_children();

        // Dropping the body breaks the signal -> effect -> body -> signal cycle.
        self.body.lock().take();
        debug!(effect = %self.id, "disposed");
    }
}

/// A side-effecting computation that re-runs when its dependencies change.
///
/// # Example
///
/// ```rust
/// use golid_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
///
/// let c = count.clone();
/// let effect = Effect::new(move || {
///     println!("Count is: {}", c.get());
/// });
///
/// count.set(5); // Prints: "Count is: 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Effect {
    core: Arc<EffectCore>,
}

impl Effect {
    /// Create a new effect and run it immediately.
    ///
    /// The first run establishes the initial dependencies. If another effect
    /// is running, the new effect becomes its child.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let core = Arc::new(EffectCore::new(Arc::new(body)));

        let lane = Runtime::enter();
        let owner = lane.borrow().current().cloned();
        if let Some(owner) = owner {
            owner.adopt(core.clone());
            trace!(effect = %core.id, owner = %owner.id, "adopted");
        }
        Runtime::run_effect(&lane, &core);
        drop(lane);

        Self { core }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.core.id
    }

    /// Detach this effect from every signal and release its body.
    ///
    /// Owned child effects are disposed as well. After disposal the effect
    /// never runs again. Disposing twice is a no-op.
    pub fn dispose(&self) {
        let _lane = Runtime::enter();
        self.core.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.core.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of signals read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.core.dependencies.lock().len()
    }

    /// Signals read during the most recent run, in first-read order.
    pub fn dependencies(&self) -> Vec<SignalId> {
        self.core.dependencies.lock().keys().copied().collect()
    }

    /// Check whether the most recent run read the given signal.
    pub fn depends_on(&self, signal: SignalId) -> bool {
        self.core.dependencies.lock().contains_key(&signal)
    }

    /// Number of effects created during the most recent run.
    pub fn child_count(&self) -> usize {
        self.core.children.lock().len()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.core.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Register and immediately run a new effect.
///
/// Shorthand for [`Effect::new`].
pub fn watch<F>(body: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(body)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_dependency_written() {
        let signal = Signal::new(0);
        let s = signal.clone();
        let effect = Effect::new(move || {
            s.get();
        });

        signal.set(1);
        signal.set(2);
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = Signal::new(0);
        let s = signal.clone();
        let effect = Effect::new(move || {
            s.get();
        });

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(effect.dependency_count(), 0);
        assert_eq!(signal.dependent_count(), 0);

        signal.set(1);
        assert_eq!(effect.run_count(), 1);

        // Disposing again is harmless
        effect.dispose();
    }

    #[test]
    fn dependencies_are_listed_in_read_order() {
        let a = Signal::new(1);
        let b = Signal::new(2);
        let (ac, bc) = (a.clone(), b.clone());

        let effect = Effect::new(move || {
            bc.get();
            ac.get();
            bc.get();
        });

        assert_eq!(effect.dependencies(), vec![b.id(), a.id()]);
        assert!(effect.depends_on(a.id()));
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        assert_eq!(effect2.run_count(), 1);

        // Shared disposal state
        effect1.dispose();
        assert!(effect2.is_disposed());
    }

    #[test]
    fn watch_is_effect_new() {
        let runs = Arc::new(AtomicI32::new(0));
        let r = runs.clone();
        let effect = watch(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(effect.child_count(), 0);
    }
}
