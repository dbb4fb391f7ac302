//! Identifiers for reactive nodes.
//!
//! Signals and effects are compared by identity, never by value. Each node
//! gets a process-unique ID when created, and every dependency edge is keyed
//! by these IDs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    /// Generate a new unique signal ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

/// Unique identifier for an effect.
///
/// A signal's dependent set is keyed by this ID, so reading the same signal
/// twice in one run can never register the effect twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_ids_are_unique() {
        let id1 = SignalId::new();
        let id2 = SignalId::new();
        let id3 = SignalId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn effect_ids_increase() {
        let first = EffectId::new();
        let second = EffectId::new();
        assert!(second.raw() > first.raw());
    }

    #[test]
    fn ids_display_with_kind_prefix() {
        let id = SignalId::new();
        assert_eq!(id.to_string(), format!("signal#{}", id.raw()));

        let id = EffectId::new();
        assert_eq!(id.to_string(), format!("effect#{}", id.raw()));
    }
}
