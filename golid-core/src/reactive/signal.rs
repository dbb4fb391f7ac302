//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! indexes the effects that read it during their most recent run.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is running, the signal and the
//!    effect record each other (the signal's dependent set, the effect's
//!    dependency set).
//!
//! 2. When a signal is written, every effect in its dependent set re-runs
//!    before the write returns.
//!
//! 3. Writes never compare against the previous value. Writing the value a
//!    signal already holds still notifies every dependent.
//!
//! # Cycles
//!
//! There is no cycle detection by default. An effect that writes a signal
//! it also reads re-triggers itself and recurses until the stack runs out.
//! Avoiding this is the caller's responsibility, unless a dispatch depth
//! limit has been configured (see [`RuntimeConfig`](super::RuntimeConfig)).
//!
//! # Thread Safety
//!
//! Signals are `Send + Sync` when `T` is. Every read and write goes through
//! the runtime lane, so reactive activity from different threads is
//! serialized rather than interleaved.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{trace, warn};

use super::effect::{Effect, EffectCore};
use super::id::{EffectId, SignalId};
use super::runtime::Runtime;
use super::scheduler;
use crate::error::ReactiveError;

/// Snapshot of a signal's dependents taken at write time.
pub(crate) type Dependents = SmallVec<[Arc<EffectCore>; 8]>;

/// Type-erased view of a signal, as seen from an effect's dependency set.
pub(crate) trait Source: Send + Sync {
    fn id(&self) -> SignalId;

    /// Register an effect. Returns false if it was already registered.
    fn add_dependent(&self, effect: &Arc<EffectCore>) -> bool;

    fn remove_dependent(&self, effect: EffectId);

    fn has_dependent(&self, effect: EffectId) -> bool;
}

pub(crate) struct SignalCore<T> {
    id: SignalId,
    value: RwLock<T>,

    /// Effects to re-run on write, in registration order.
    dependents: Mutex<IndexMap<EffectId, Arc<EffectCore>>>,
}

impl<T> SignalCore<T> {
    fn snapshot(&self) -> Dependents {
        self.dependents.lock().values().cloned().collect()
    }
}

impl<T> Source for SignalCore<T>
where
    T: Send + Sync,
{
    fn id(&self) -> SignalId {
        self.id
    }

    fn add_dependent(&self, effect: &Arc<EffectCore>) -> bool {
        let mut dependents = self.dependents.lock();
        if dependents.contains_key(&effect.id()) {
            return false;
        }
        dependents.insert(effect.id(), Arc::clone(effect));
        true
    }

    fn remove_dependent(&self, effect: EffectId) {
        self.dependents.lock().shift_remove(&effect);
    }

    fn has_dependent(&self, effect: EffectId) -> bool {
        self.dependents.lock().contains_key(&effect)
    }
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal produces another handle to the same value.
///
/// # Example
///
/// ```rust
/// use golid_core::reactive::Signal;
///
/// let count = Signal::new(0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (notifies dependents)
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    core: Arc<SignalCore<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            core: Arc::new(SignalCore {
                id: SignalId::new(),
                value: RwLock::new(value),
                dependents: Mutex::new(IndexMap::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.core.id
    }

    /// Get the current value.
    ///
    /// If called while an effect is running, this also registers that
    /// effect as a dependent. Outside any effect this is a plain read.
    pub fn get(&self) -> T {
        let lane = Runtime::enter();
        let source: Arc<dyn Source> = self.core.clone();
        Runtime::track_read(&lane, &source);

        let value = self.core.value.read().clone();
        drop(lane);
        value
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.core.value.read().clone()
    }

    /// Set a new value and re-run every dependent.
    ///
    /// The write is unconditional: setting the current value again still
    /// notifies. All dependents have finished re-running when this returns.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            warn!(signal = %self.core.id, error = %err, "dispatch refused");
        }
    }

    /// Like [`set`](Self::set), but reports a refused dispatch.
    ///
    /// The new value is stored either way. Dispatch is only refused when a
    /// depth limit is configured and this write would exceed it.
    pub fn try_set(&self, value: T) -> Result<(), ReactiveError> {
        let lane = Runtime::enter();
        *self.core.value.write() = value;

        let dependents = self.core.snapshot();
        trace!(signal = %self.core.id, dependents = dependents.len(), "write");
        scheduler::notify(&lane, &*self.core, dependents)
    }

    /// Update the value using a function of the current value.
    ///
    /// The read and the write happen under one hold of the lane, so
    /// concurrent updates from other threads are never lost.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let _lane = Runtime::enter();
        let current = self.get_untracked();
        self.set(f(&current));
    }

    /// Run `f` with the current value now and after every write.
    pub fn watch<F>(&self, f: F) -> Effect
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let signal = self.clone();
        Effect::new(move || f(signal.get()))
    }

    /// Get the number of effects currently depending on this signal.
    pub fn dependent_count(&self) -> usize {
        self.core.dependents.lock().len()
    }

    /// Check whether the given effect currently depends on this signal.
    pub fn has_dependent(&self, effect: EffectId) -> bool {
        Source::has_dependent(&*self.core, effect)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.core.id)
            .field("value", &self.get_untracked())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
