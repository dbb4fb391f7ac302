//! Event Registration
//!
//! The rendering layer owns the actual event listeners. The core only keeps
//! a table of handlers keyed by target and event kind; the rendering layer
//! calls [`TargetRegistry::dispatch_event`] when an external event fires.
//!
//! Handlers are plain application code. They may read and write signals,
//! which enters the reactive graph exactly like any other caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::target::{TargetId, TargetRegistry};

pub(super) type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Kinds of external events a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Input,
}

/// An external event, as reported by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Event {
    Click,
    /// The input's new value.
    Input(String),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Click => EventKind::Click,
            Event::Input(_) => EventKind::Input,
        }
    }
}

impl TargetRegistry {
    /// Register `handler` for `kind` events on `target`.
    ///
    /// Replaces any handler previously registered for the same pair.
    pub fn on<F>(&self, target: TargetId, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.state
            .lock()
            .handlers
            .insert((target, kind), Arc::new(handler));
    }

    /// Register a click handler.
    pub fn on_click<F>(&self, target: TargetId, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(target, EventKind::Click, move |_| handler());
    }

    /// Register an input handler receiving the input's new value.
    pub fn on_input<F>(&self, target: TargetId, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on(target, EventKind::Input, move |event| {
            if let Event::Input(value) = event {
                handler(value.as_str());
            }
        });
    }

    /// Remove the handler for `kind` events on `target`.
    pub fn off(&self, target: TargetId, kind: EventKind) -> bool {
        self.state.lock().handlers.remove(&(target, kind)).is_some()
    }

    /// Invoke the handler registered for this event, if any.
    ///
    /// Returns false when no handler is registered.
    pub fn dispatch_event(&self, target: TargetId, event: &Event) -> bool {
        let handler = self
            .state
            .lock()
            .handlers
            .get(&(target, event.kind()))
            .cloned();

        match handler {
            Some(handler) => {
                trace!(target_id = %target, kind = ?event.kind(), "event dispatched");
                handler(event);
                true
            }
            None => false,
        }
    }
}
