//! Notification Dispatch
//!
//! The scheduler decides how a write's dependents are re-invoked.
//!
//! # Policy
//!
//! Dispatch is synchronous and sequential: each dependent re-runs in turn,
//! on the writer's own thread, before the write returns. Consequently:
//!
//! - no update is lost, because a write is fully propagated when `set`
//!   returns;
//! - two re-runs of the same effect never overlap;
//! - writes made by an effect body (chained reactivity) are propagated
//!   completely before the outer dispatch moves on to its next dependent.
//!
//! Dependents run in the order they first read the signal. An effect that
//! stops depending on the signal while a dispatch is in progress (because it
//! was disposed, or re-ran down a branch that no longer reads the signal) is
//! skipped.
//!
//! # Batching
//!
//! Inside [`Runtime::batch`](super::Runtime::batch), notifications are
//! queued instead of dispatched. When the outermost batch closes, every
//! queued effect re-runs exactly once, in first-notified order.

use std::cell::RefCell;

use tracing::{debug, trace, warn};

use super::context::ExecutionContext;
use super::id::SignalId;
use super::runtime::Runtime;
use super::signal::{Dependents, Source};
use crate::error::ReactiveError;

/// Re-run the dependents of `signal`, or queue them if a batch is open.
///
/// `dependents` is the snapshot taken at write time. Each entry is checked
/// against the signal's live dependent set right before it runs.
pub(crate) fn notify(
    cx: &RefCell<ExecutionContext>,
    signal: &dyn Source,
    dependents: Dependents,
) -> Result<(), ReactiveError> {
    if dependents.is_empty() {
        return Ok(());
    }

    {
        let mut state = cx.borrow_mut();
        if state.is_batching() {
            for effect in dependents {
                state.defer(effect);
            }
            return Ok(());
        }
    }

    let _dispatch = DispatchScope::enter(cx, signal.id())?;
    debug!(signal = %signal.id(), dependents = dependents.len(), "dispatch");

    for effect in &dependents {
        if !signal.has_dependent(effect.id()) {
            trace!(signal = %signal.id(), effect = %effect.id(), "detached mid-dispatch, skipped");
            continue;
        }
        Runtime::run_effect(cx, effect);
    }

    Ok(())
}

/// Run `f` with notifications deferred until the outermost batch closes.
pub(crate) fn batch<R>(cx: &RefCell<ExecutionContext>, f: impl FnOnce() -> R) -> R {
    cx.borrow_mut().enter_batch();
    let guard = BatchScope { cx };

    let result = f();

    drop(guard);
    if !cx.borrow().is_batching() {
        flush(cx);
    }
    result
}

/// Run every effect queued by a batch, including effects queued while
/// flushing.
///
/// A flush refused by the depth limit drops what it had taken from the
/// queue; those effects stay subscribed and run on their next notification.
fn flush(cx: &RefCell<ExecutionContext>) {
    loop {
        let pending = cx.borrow_mut().take_pending();
        if pending.is_empty() {
            break;
        }

        debug!(pending = pending.len(), "flushing batch");
        let dispatch = match DispatchScope::enter_flush(cx) {
            Ok(scope) => scope,
            Err(err) => {
                warn!(error = %err, dropped = pending.len(), "batch flush refused");
                break;
            }
        };

        for effect in pending.values() {
            Runtime::run_effect(cx, effect);
        }
        drop(dispatch);
    }
}

/// Tracks dispatch nesting and enforces the configured depth limit.
struct DispatchScope<'a> {
    cx: &'a RefCell<ExecutionContext>,
}

impl<'a> DispatchScope<'a> {
    fn enter(cx: &'a RefCell<ExecutionContext>, signal: SignalId) -> Result<Self, ReactiveError> {
        let mut state = cx.borrow_mut();
        let depth = state.dispatch_depth() + 1;

        if let Some(limit) = Runtime::config().max_dispatch_depth {
            if depth > limit {
                return Err(ReactiveError::DispatchDepthExceeded {
                    signal,
                    depth,
                    limit,
                });
            }
        }

        state.enter_dispatch();
        Ok(Self { cx })
    }

    fn enter_flush(cx: &'a RefCell<ExecutionContext>) -> Result<Self, ReactiveError> {
        let mut state = cx.borrow_mut();
        let depth = state.dispatch_depth() + 1;

        if let Some(limit) = Runtime::config().max_dispatch_depth {
            if depth > limit {
                return Err(ReactiveError::FlushDepthExceeded { depth, limit });
            }
        }

        state.enter_dispatch();
        Ok(Self { cx })
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        self.cx.borrow_mut().exit_dispatch();
    }
}

/// Closes a batch level, dropping queued work if the batch body panicked.
struct BatchScope<'a> {
    cx: &'a RefCell<ExecutionContext>,
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        let mut state = self.cx.borrow_mut();
        if state.exit_batch() && std::thread::panicking() {
            state.clear_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Signal};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn dependents_run_in_registration_order() {
        let signal = Signal::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let effects: Vec<Effect> = (0..4)
            .map(|n| {
                let s = signal.clone();
                let o = order.clone();
                Effect::new(move || {
                    s.get();
                    o.lock().push(n);
                })
            })
            .collect();

        order.lock().clear();
        signal.set(1);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);

        // Same order on every write
        order.lock().clear();
        signal.set(2);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
        assert_eq!(effects.len(), 4);
    }

    #[test]
    fn effect_disposed_mid_dispatch_is_skipped() {
        let signal = Signal::new(0);
        let second_runs = Arc::new(AtomicUsize::new(0));

        let victim: Arc<Mutex<Option<Effect>>> = Arc::new(Mutex::new(None));

        let s = signal.clone();
        let v = victim.clone();
        let _killer = Effect::new(move || {
            if s.get() > 0 {
                if let Some(effect) = v.lock().take() {
                    effect.dispose();
                }
            }
        });

        let s = signal.clone();
        let runs = second_runs.clone();
        let second = Effect::new(move || {
            s.get();
            runs.fetch_add(1, Ordering::SeqCst);
        });
        *victim.lock() = Some(second.clone());

        signal.set(1);
        assert!(second.is_disposed());
        assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_batches_flush_once() {
        let a = Signal::new(0);
        let b = Signal::new(0);
        let runs = Arc::new(AtomicUsize::new(0));

        let (ac, bc, r) = (a.clone(), b.clone(), runs.clone());
        let _effect = Effect::new(move || {
            ac.get();
            bc.get();
            r.fetch_add(1, Ordering::SeqCst);
        });

        Runtime::batch(|| {
            a.set(1);
            Runtime::batch(|| b.set(2));
            // Inner batch closing must not flush
            assert_eq!(runs.load(Ordering::SeqCst), 1);
            a.set(3);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn writes_during_flush_are_propagated() {
        let source = Signal::new(0);
        let mirror = Signal::new(0);
        let seen = Arc::new(AtomicUsize::new(0));

        let (s, m) = (source.clone(), mirror.clone());
        let _copy = Effect::new(move || m.set(s.get()));

        let (m, seen_clone) = (mirror.clone(), seen.clone());
        let _observe = Effect::new(move || {
            seen_clone.store(m.get(), Ordering::SeqCst);
        });

        Runtime::batch(|| source.set(9));
        assert_eq!(seen.load(Ordering::SeqCst), 9);
    }
}
