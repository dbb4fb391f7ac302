//! Binding Adapters
//!
//! A binding adapter is an ordinary [`Effect`] whose body renders some
//! content and delivers it to an external target as a [`Patch`]. The core
//! does not treat it specially: dependencies are tracked while the body
//! renders, whether or not the target can take delivery yet.
//!
//! Each constructor allocates a fresh [`TargetId`] and returns a [`Binding`].
//! The rendering layer inserts a placeholder element carrying
//! `binding.target()` as its ID, then calls
//! [`TargetRegistry::attach`] once the element exists.

use super::event::{Event, EventKind};
use super::patch::Patch;
use super::target::{TargetId, TargetRegistry};
use crate::reactive::{Effect, Signal};

/// A live binding between reactive state and one external target.
#[derive(Debug, Clone)]
pub struct Binding {
    target: TargetId,
    effect: Effect,
    registry: TargetRegistry,
}

impl Binding {
    /// The target this binding keeps up to date.
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// The effect driving this binding.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Stop the binding and forget its target.
    ///
    /// Disposes the effect and removes the target's parked patch and event
    /// handlers from the registry.
    pub fn dispose(&self) {
        self.effect.dispose();
        self.registry.forget(self.target);
    }
}

/// Keep a target's outer markup in sync with `render`.
///
/// `render` returns serialized markup; the rendering layer replaces the
/// whole element with it, and must keep the element addressable by the
/// target ID.
pub fn bind_markup<F>(registry: &TargetRegistry, render: F) -> Binding
where
    F: Fn() -> String + Send + Sync + 'static,
{
    bind_with(registry, move |target| Patch::outer_html(target, render()))
}

/// Keep a target's text content in sync with `render`.
pub fn bind_text<F>(registry: &TargetRegistry, render: F) -> Binding
where
    F: Fn() -> String + Send + Sync + 'static,
{
    bind_with(registry, move |target| Patch::text(target, render()))
}

/// Two-way binding between a text input and a string signal.
///
/// Writes to `signal` set the input's value. Input events write the new
/// value back into `signal`, but only when it differs, so an echo from the
/// rendering layer does not trigger another round of updates.
pub fn bind_input(registry: &TargetRegistry, signal: Signal<String>) -> Binding {
    let source = signal.clone();
    let binding = bind_with(registry, move |target| {
        Patch::input_value(target, source.get())
    });

    registry.on(binding.target, EventKind::Input, move |event| {
        if let Event::Input(value) = event {
            if *value != signal.get_untracked() {
                signal.set(value.clone());
            }
        }
    });

    binding
}

fn bind_with<F>(registry: &TargetRegistry, render: F) -> Binding
where
    F: Fn(TargetId) -> Patch + Send + Sync + 'static,
{
    let target = TargetId::new();
    let sink = registry.clone();

    let effect = Effect::new(move || {
        sink.deliver(render(target));
    });

    Binding {
        target,
        effect,
        registry: registry.clone(),
    }
}
