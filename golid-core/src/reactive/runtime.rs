//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals and
//! effects. It owns the execution lane and implements dependency tracking.
//!
//! # How It Works
//!
//! 1. When an effect runs, the runtime first detaches it from every signal
//!    it read last time, then makes it the current effect and runs its body.
//!
//! 2. When a signal is read during that run, the runtime records the edge
//!    in both directions (signal → effect, effect → signal).
//!
//! 3. When a signal is written, the scheduler re-runs the signal's current
//!    dependents through step 1 again.
//!
//! # The Lane
//!
//! All reactive state (dependent sets, dependency sets, and the current
//! effect) is shared and mutable, so every reactive operation holds one
//! process-wide re-entrant lock, the lane. The thread holding the lane can
//! re-enter it freely: effect bodies read and write signals, and writes
//! re-run other effects, all on the same thread. Another thread blocks until
//! the outermost operation completes.
//!
//! An effect body must not wait on another thread that itself touches
//! signals; that thread would block on the lane forever.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use tracing::{debug, trace};

use super::config::RuntimeConfig;
use super::context::{ContextScope, ExecutionContext, Frame};
use super::effect::EffectCore;
use super::id::EffectId;
use super::scheduler;
use super::signal::Source;

type Lane = ReentrantMutex<RefCell<ExecutionContext>>;

/// Exclusive access to the reactive execution state for the current thread.
pub(crate) type LaneGuard = ReentrantMutexGuard<'static, RefCell<ExecutionContext>>;

static LANE: OnceLock<Lane> = OnceLock::new();
static CONFIG: OnceLock<RwLock<RuntimeConfig>> = OnceLock::new();

fn get_lane() -> &'static Lane {
    LANE.get_or_init(|| ReentrantMutex::new(RefCell::new(ExecutionContext::default())))
}

fn get_config() -> &'static RwLock<RuntimeConfig> {
    CONFIG.get_or_init(|| RwLock::new(RuntimeConfig::default()))
}

/// The global reactive runtime.
///
/// This is a singleton that serializes all reactive activity in the
/// process.
pub struct Runtime;

impl Runtime {
    /// Acquire the lane. Re-entrant on the current thread.
    pub(crate) fn enter() -> LaneGuard {
        get_lane().lock()
    }

    /// Record that the current effect, if any, read `source`.
    pub(crate) fn track_read(cx: &RefCell<ExecutionContext>, source: &Arc<dyn Source>) {
        let Some(effect) = cx.borrow().current().cloned() else {
            return;
        };

        // An effect that disposed itself mid-run must not re-subscribe.
        if effect.is_disposed() {
            return;
        }

        if effect.add_dependency(source.id(), Arc::downgrade(source)) {
            source.add_dependent(&effect);
            trace!(signal = %source.id(), effect = %effect.id(), "tracked read");
        }
    }

    /// Run an effect's body under tracking.
    ///
    /// Detaches the effect from its previous dependencies and disposes the
    /// effects it created last time, then runs the body with the effect as
    /// the current context. Disposed effects are ignored.
    pub(crate) fn run_effect(cx: &RefCell<ExecutionContext>, effect: &Arc<EffectCore>) {
        if effect.is_disposed() {
            return;
        }
        let Some(body) = effect.body() else {
            return;
        };

        effect.dispose_children();
        effect.detach_all();

        {
            let _scope = ContextScope::enter(cx, Frame::Tracking(Arc::clone(effect)));
            body();
        }

        let runs = effect.record_run();
        debug!(effect = %effect.id(), runs, "effect ran");
    }

    /// Get the effect currently being tracked, if any.
    pub fn current_effect() -> Option<EffectId> {
        let lane = Self::enter();
        let current = lane.borrow().current().map(|effect| effect.id());
        current
    }

    /// Check if signal reads are currently being tracked.
    pub fn is_tracking() -> bool {
        Self::current_effect().is_some()
    }

    /// Run `f` without attributing its signal reads to the current effect.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let lane = Self::enter();
        let _scope = ContextScope::enter(&lane, Frame::Untracked);
        f()
    }

    /// Run `f` with notifications deferred until the outermost batch ends.
    ///
    /// Every effect notified inside the batch re-runs exactly once when it
    /// closes, no matter how many of its dependencies were written.
    ///
    /// If a dispatch depth limit is configured and the closing flush would
    /// exceed it, the queued effects are dropped with a `warn` log. They
    /// re-run on the next write to one of their dependencies.
    pub fn batch<R>(f: impl FnOnce() -> R) -> R {
        let lane = Self::enter();
        scheduler::batch(&lane, f)
    }

    /// Replace the runtime configuration.
    pub fn configure(config: RuntimeConfig) {
        debug!(?config, "runtime configured");
        *get_config().write() = config;
    }

    /// Get the current runtime configuration.
    pub fn config() -> RuntimeConfig {
        *get_config().read()
    }

    /// Depth of the context stack on the current thread's lane.
    pub fn context_depth() -> usize {
        let lane = Self::enter();
        let depth = lane.borrow().depth();
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Signal};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn no_current_effect_outside_runs() {
        assert!(Runtime::current_effect().is_none());
        assert!(!Runtime::is_tracking());
    }

    #[test]
    fn current_effect_is_visible_inside_body() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();

        let effect = Effect::new(move || {
            *s.lock() = Runtime::current_effect();
        });

        assert_eq!(*seen.lock(), Some(effect.id()));
        assert_eq!(Runtime::context_depth(), 0);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let tracked = Signal::new(1);
        let ignored = Signal::new(2);

        let (t, i) = (tracked.clone(), ignored.clone());
        let effect = Effect::new(move || {
            t.get();
            Runtime::untracked(|| i.get());
        });

        assert_eq!(effect.dependencies(), vec![tracked.id()]);
        assert_eq!(ignored.dependent_count(), 0);
    }

    #[test]
    fn rerun_detaches_before_rebuilding() {
        let gate = Signal::new(true);
        let a = Signal::new(0);
        let b = Signal::new(0);

        let (g, ac, bc) = (gate.clone(), a.clone(), b.clone());
        let effect = Effect::new(move || {
            if g.get() {
                ac.get();
            } else {
                bc.get();
            }
        });

        assert!(a.has_dependent(effect.id()));
        gate.set(false);
        assert!(!a.has_dependent(effect.id()));
        assert!(b.has_dependent(effect.id()));
    }

    #[test]
    fn writes_from_other_threads_are_serialized() {
        let signal = Signal::new(0usize);
        let total = Arc::new(AtomicUsize::new(0));

        let (s, t) = (signal.clone(), total.clone());
        let effect = Effect::new(move || {
            t.fetch_add(s.get(), Ordering::SeqCst);
        });

        let handles: Vec<_> = (1..=4)
            .map(|n| {
                let s = signal.clone();
                std::thread::spawn(move || s.set(n))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(effect.run_count(), 5);
        assert_eq!(total.load(Ordering::SeqCst), 1 + 2 + 3 + 4);
        assert_eq!(effect.dependency_count(), 1);
    }
}
