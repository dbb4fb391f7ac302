//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::ReactiveError;

/// Tunables for the reactive runtime.
///
/// The defaults reproduce the unbounded behaviour: writes always dispatch,
/// and a write that re-triggers its own effect recurses without limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Maximum number of nested dispatches before a write is refused.
    ///
    /// `None` disables the check.
    pub max_dispatch_depth: Option<usize>,
}

impl RuntimeConfig {
    /// Parse a configuration from JSON, e.g. `{"max_dispatch_depth": 64}`.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ReactiveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the dispatch depth limit.
    pub fn with_max_dispatch_depth(mut self, depth: usize) -> Self {
        self.max_dispatch_depth = Some(depth);
        self
    }
}
