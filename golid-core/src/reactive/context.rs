//! Execution Context
//!
//! The execution context records which effect is currently running. This
//! is what lets a signal read be attributed to an effect without the caller
//! wiring anything up.
//!
//! # Implementation
//!
//! The context is a stack of frames that lives inside the runtime's lane
//! (see `runtime.rs`), so there is exactly one per process and all access
//! to it is serialized. Frames are only pushed through [`ContextScope`],
//! which pops its frame when dropped, so the stack stays balanced even if
//! an effect body panics.
//!
//! Nesting follows stack discipline: an effect created while another effect
//! runs pushes its own frame, and when it finishes the outer effect is
//! current again. A [`Frame::Untracked`] frame suspends tracking without
//! making any effect current.
//!
//! The context also carries the scheduler's bookkeeping (dispatch depth and
//! the batch queue), since both must be serialized by the same lane.

use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexMap;

use super::effect::EffectCore;
use super::id::EffectId;

/// One entry of the context stack.
pub(crate) enum Frame {
    /// Reads are attributed to this effect.
    Tracking(Arc<EffectCore>),
    /// Reads register nothing.
    Untracked,
}

/// Process-wide reactive execution state.
#[derive(Default)]
pub(crate) struct ExecutionContext {
    frames: Vec<Frame>,

    /// Number of nested synchronous dispatches currently in progress.
    dispatch_depth: usize,

    /// Number of open `batch` calls.
    batch_depth: usize,

    /// Effects notified while a batch was open, in first-notified order.
    pending: IndexMap<EffectId, Arc<EffectCore>>,
}

impl ExecutionContext {
    /// The effect reads should currently be attributed to, if any.
    pub(crate) fn current(&self) -> Option<&Arc<EffectCore>> {
        match self.frames.last() {
            Some(Frame::Tracking(effect)) => Some(effect),
            Some(Frame::Untracked) | None => None,
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn dispatch_depth(&self) -> usize {
        self.dispatch_depth
    }

    pub(crate) fn enter_dispatch(&mut self) -> usize {
        self.dispatch_depth += 1;
        self.dispatch_depth
    }

    pub(crate) fn exit_dispatch(&mut self) {
        self.dispatch_depth = self.dispatch_depth.saturating_sub(1);
    }

    pub(crate) fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    pub(crate) fn enter_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close one batch level. Returns true when the outermost batch closed.
    pub(crate) fn exit_batch(&mut self) -> bool {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.batch_depth == 0
    }

    /// Queue an effect for the end of the current batch.
    ///
    /// An effect already queued keeps its original position.
    pub(crate) fn defer(&mut self, effect: Arc<EffectCore>) {
        self.pending.entry(effect.id()).or_insert(effect);
    }

    pub(crate) fn take_pending(&mut self) -> IndexMap<EffectId, Arc<EffectCore>> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

/// Guard that pops a context frame when dropped.
pub(crate) struct ContextScope<'a> {
    cx: &'a RefCell<ExecutionContext>,
    depth: usize,
}

impl<'a> ContextScope<'a> {
    /// Push `frame` for the lifetime of the returned guard.
    pub(crate) fn enter(cx: &'a RefCell<ExecutionContext>, frame: Frame) -> Self {
        let mut state = cx.borrow_mut();
        state.frames.push(frame);
        let depth = state.frames.len();
        Self { cx, depth }
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        let mut state = self.cx.borrow_mut();

        // Scopes are strictly nested, so ours is always the top frame.
        debug_assert_eq!(
            state.frames.len(),
            self.depth,
            "ContextScope mismatch: expected depth {}, got {}",
            self.depth,
            state.frames.len()
        );
        state.frames.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect() -> Arc<EffectCore> {
        Arc::new(EffectCore::new(Arc::new(|| {})))
    }

    #[test]
    fn context_tracks_current_effect() {
        let cx = RefCell::new(ExecutionContext::default());
        let e = effect();

        assert!(cx.borrow().current().is_none());

        {
            let _scope = ContextScope::enter(&cx, Frame::Tracking(e.clone()));
            assert_eq!(cx.borrow().current().map(|c| c.id()), Some(e.id()));
        }

        // Context should be cleaned up after drop
        assert!(cx.borrow().current().is_none());
        assert_eq!(cx.borrow().depth(), 0);
    }

    #[test]
    fn nested_scopes_restore_outer_effect() {
        let cx = RefCell::new(ExecutionContext::default());
        let outer = effect();
        let inner = effect();

        let _outer = ContextScope::enter(&cx, Frame::Tracking(outer.clone()));
        {
            let _inner = ContextScope::enter(&cx, Frame::Tracking(inner.clone()));
            assert_eq!(cx.borrow().current().map(|c| c.id()), Some(inner.id()));
        }

        assert_eq!(cx.borrow().current().map(|c| c.id()), Some(outer.id()));
    }

    #[test]
    fn untracked_frame_hides_current_effect() {
        let cx = RefCell::new(ExecutionContext::default());
        let e = effect();

        let _tracking = ContextScope::enter(&cx, Frame::Tracking(e.clone()));
        {
            let _untracked = ContextScope::enter(&cx, Frame::Untracked);
            assert!(cx.borrow().current().is_none());
            assert_eq!(cx.borrow().depth(), 2);
        }
        assert!(cx.borrow().current().is_some());
    }

    #[test]
    fn deferred_effects_are_deduplicated_in_order() {
        let mut cx = ExecutionContext::default();
        let a = effect();
        let b = effect();

        cx.defer(a.clone());
        cx.defer(b.clone());
        cx.defer(a.clone());

        let pending: Vec<_> = cx.take_pending().into_keys().collect();
        assert_eq!(pending, vec![a.id(), b.id()]);
        assert!(cx.take_pending().is_empty());
    }

    #[test]
    fn batch_depth_reports_outermost_exit() {
        let mut cx = ExecutionContext::default();
        cx.enter_batch();
        cx.enter_batch();
        assert!(cx.is_batching());
        assert!(!cx.exit_batch());
        assert!(cx.exit_batch());
        assert!(!cx.is_batching());
    }
}
