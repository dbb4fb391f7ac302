//! Patches
//!
//! A patch is the unit of output the core hands to the rendering layer:
//! "replace this target's content with that". The content itself is opaque
//! here; markup is produced and interpreted entirely by the rendering layer.
//!
//! Patches are serde types so a rendering layer living elsewhere (a browser
//! page, another process) can consume them as MessagePack or JSON.

use serde::{Deserialize, Serialize};

use super::target::TargetId;
use crate::error::BindError;

/// What to replace in a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PatchKind {
    /// Replace the whole element with this serialized markup. The markup is
    /// expected to carry the target's ID so it stays addressable.
    OuterHtml(String),

    /// Replace the element's text content.
    Text(String),

    /// Set the value of an input element.
    InputValue(String),
}

/// A single content replacement for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub target: TargetId,
    pub kind: PatchKind,
}

impl Patch {
    pub fn outer_html(target: TargetId, markup: impl Into<String>) -> Self {
        Self {
            target,
            kind: PatchKind::OuterHtml(markup.into()),
        }
    }

    pub fn text(target: TargetId, text: impl Into<String>) -> Self {
        Self {
            target,
            kind: PatchKind::Text(text.into()),
        }
    }

    pub fn input_value(target: TargetId, value: impl Into<String>) -> Self {
        Self {
            target,
            kind: PatchKind::InputValue(value.into()),
        }
    }

    /// The replacement content, whatever its kind.
    pub fn content(&self) -> &str {
        match &self.kind {
            PatchKind::OuterHtml(s) | PatchKind::Text(s) | PatchKind::InputValue(s) => s,
        }
    }

    /// Encode as MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, BindError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode from MessagePack.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, BindError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, BindError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_is_tagged() {
        let target = TargetId::new();
        let patch = Patch::text(target, "Count = 5");

        let json: serde_json::Value = serde_json::from_str(&patch.to_json().unwrap()).unwrap();
        assert_eq!(json["target"], target.raw());
        assert_eq!(json["kind"]["op"], "text");
        assert_eq!(json["kind"]["value"], "Count = 5");
    }

    #[test]
    fn msgpack_preserves_patch() {
        let patch = Patch::outer_html(TargetId::new(), "<div>ok</div>");
        let bytes = patch.to_msgpack().unwrap();
        assert_eq!(Patch::from_msgpack(&bytes).unwrap(), patch);
    }

    #[test]
    fn garbage_msgpack_is_a_decode_error() {
        let err = Patch::from_msgpack(&[0xc1]).unwrap_err();
        assert!(matches!(err, BindError::Decode(_)));
    }

    #[test]
    fn content_ignores_kind() {
        let target = TargetId::new();
        assert_eq!(Patch::input_value(target, "abc").content(), "abc");
        assert_eq!(Patch::outer_html(target, "<b/>").content(), "<b/>");
    }
}
