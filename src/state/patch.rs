//! # Patches applied by [`StateContainer::update`](super::StateContainer::update).
//!
//! A patch turns the current state into the next one. Three flavours ship here:
//! - [`Replace`]: complete replacement
//! - [`JsonPatch`]: structural merge of a JSON object into the serialized state
//! - module-specific typed patches implementing [`Patch`] directly
//!
//! ## Merge rules ([`merge_json`])
//! ```text
//! object + object ─► keys merged recursively
//! anything else   ─► patch value replaces the target (arrays replaced wholesale)
//! ```

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::PatchError;

/// Produces the next state from the current one.
pub trait Patch<S>: Send {
    /// Applies the patch. Must not mutate `current`.
    fn apply(self, current: &S) -> Result<S, PatchError>;
}

/// Replaces the whole state.
#[derive(Debug, Clone)]
pub struct Replace<S>(pub S);

impl<S: Send> Patch<S> for Replace<S> {
    fn apply(self, _current: &S) -> Result<S, PatchError> {
        Ok(self.0)
    }
}

/// Merges a JSON object into the serialized state.
///
/// Rejected when the patch root is not an object or the merged document no
/// longer deserializes into the state type.
#[derive(Debug, Clone)]
pub struct JsonPatch<S> {
    patch: Value,
    _state: PhantomData<fn() -> S>,
}

impl<S> JsonPatch<S> {
    pub fn new(patch: Value) -> Self {
        Self {
            patch,
            _state: PhantomData,
        }
    }
}

impl<S> Patch<S> for JsonPatch<S>
where
    S: Serialize + DeserializeOwned,
{
    fn apply(self, current: &S) -> Result<S, PatchError> {
        if !self.patch.is_object() {
            return Err(PatchError::new("patch root must be an object"));
        }
        let mut doc = serde_json::to_value(current).map_err(|e| PatchError::new(e.to_string()))?;
        merge_json(&mut doc, self.patch);
        serde_json::from_value(doc).map_err(|e| PatchError::new(e.to_string()))
    }
}

/// Recursively merges `patch` into `target`.
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        waiting: bool,
        items: Vec<u32>,
        meta: Meta,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Meta {
        count: u32,
        source: String,
    }

    fn doc() -> Doc {
        Doc {
            waiting: false,
            items: vec![1, 2, 3],
            meta: Meta {
                count: 3,
                source: "seed".into(),
            },
        }
    }

    #[test]
    fn test_merge_objects_recursively_and_replace_arrays() {
        let mut target = json!({"a": {"b": 1, "c": 2}, "list": [1, 2]});
        merge_json(&mut target, json!({"a": {"c": 3}, "list": [9]}));
        assert_eq!(target, json!({"a": {"b": 1, "c": 3}, "list": [9]}));
    }

    #[test]
    fn test_json_patch_keeps_untouched_fields() {
        let next = JsonPatch::<Doc>::new(json!({"waiting": true, "meta": {"count": 0}}))
            .apply(&doc())
            .unwrap();
        assert!(next.waiting);
        assert_eq!(next.items, vec![1, 2, 3]);
        assert_eq!(next.meta.count, 0);
        assert_eq!(next.meta.source, "seed");
    }

    #[test]
    fn test_json_patch_rejects_type_mismatch() {
        let err = JsonPatch::<Doc>::new(json!({"items": "nope"}))
            .apply(&doc())
            .unwrap_err();
        assert!(err.0.contains("invalid type"));
    }

    #[test]
    fn test_json_patch_rejects_non_object_root() {
        let err = JsonPatch::<Doc>::new(json!([1])).apply(&doc()).unwrap_err();
        assert_eq!(err, PatchError::new("patch root must be an object"));
    }
}
