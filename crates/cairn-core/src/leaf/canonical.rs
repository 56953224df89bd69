//! Canonical serialization of v1 events.
//!
//! The log commits to the app-provided portion of a v1 event as
//! `"<len>:<json>"`: the compact JSON rendering of
//! `{"attributes": ..., "trails": ...}` prefixed by its decimal byte length
//! and a colon. Determinism relies on sorted object keys at every level;
//! `serde_json`'s default map is ordered, so parsing and re-serializing any
//! permutation of the same event converges on one byte sequence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::CanonicalError;

/// The app-provided fields of a v1 event, in canonical field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializableEvent {
    /// Application attributes; keys serialize lexicographically.
    #[serde(default)]
    pub attributes: Map<String, Value>,

    /// Trail names, kept in the order given.
    #[serde(default)]
    pub trails: Vec<String>,
}

impl SerializableEvent {
    /// Serializes the event to its canonical length-prefixed form.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::Json`] if an attribute value cannot be
    /// rendered (non-finite floats are the only such values).
    pub fn serialize_canonical(&self) -> Result<Vec<u8>, CanonicalError> {
        let json = serde_json::to_vec(self)?;
        let mut out = format!("{}:", json.len()).into_bytes();
        out.extend_from_slice(&json);
        Ok(out)
    }
}
