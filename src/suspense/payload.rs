//! # Dehydrated registry state.
//!
//! [`SuspensePayload`] is the serialized form of a registry that crosses the
//! server → client boundary: a map of label → settled value. Pending handles
//! and failures never cross it.
//!
//! ```text
//! server: registry.dehydrate() ──► SuspensePayload ──► JSON in the response
//! client: JSON ──► SuspensePayload ──► SuspenseRegistry::hydrate(payload, bus)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RegistryError;
use crate::utils::escape_script_json;

/// Settled registry entries, keyed by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuspensePayload {
    entries: BTreeMap<String, Value>,
}

impl SuspensePayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a settled value.
    pub fn insert(&mut self, label: impl Into<String>, value: Value) {
        self.entries.insert(label.into(), value);
    }

    /// Returns the value stored for `label`.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.entries.get(label)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encodes the payload as JSON.
    pub fn to_json(&self) -> Result<String, RegistryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the payload as JSON safe to embed inside an HTML `<script>` element.
    pub fn to_script_json(&self) -> Result<String, RegistryError> {
        Ok(escape_script_json(&self.to_json()?))
    }

    /// Decodes a payload produced by [`to_json`](Self::to_json) or
    /// [`to_script_json`](Self::to_script_json).
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<(String, Value)> for SuspensePayload {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SuspensePayload {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_plain_map() {
        let mut payload = SuspensePayload::new();
        payload.insert("categories", json!({"items": []}));
        assert_eq!(
            payload.to_json().expect("json"),
            r#"{"categories":{"items":[]}}"#
        );
    }

    #[test]
    fn test_script_json_is_reconstructed_exactly() {
        let mut payload = SuspensePayload::new();
        payload.insert("article", json!({"body": "</script><b>&</b>"}));

        let script = payload.to_script_json().expect("json");
        assert!(!script.contains("</script>"));
        assert!(!script.contains('&'));

        let back = SuspensePayload::from_json(&script).expect("decode");
        assert_eq!(back, payload);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = SuspensePayload::from_json("[1,2]").unwrap_err();
        assert_eq!(err.as_label(), "registry_payload");
    }
}
