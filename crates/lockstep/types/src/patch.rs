//! Private state deltas, expressed as JSON merge patches.
//!
//! A patch records how one client's private view differs from the public
//! state it was derived from. Objects are diffed key by key; any other value
//! (arrays included) is replaced wholesale; a `null` member removes the key.

use crate::checked::ResourceState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatePatch(Value);

impl StatePatch {
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The patch that turns `prev` into `next`.
    pub fn diff(prev: &Value, next: &Value) -> Self {
        match diff_values(prev, next) {
            Some(delta) => Self(delta),
            None if prev.is_object() => Self::empty(),
            // `{}` would replace a non-object target, so restate it instead
            None => Self(next.clone()),
        }
    }

    /// Diffs two typed states through their JSON form.
    pub fn between<S: ResourceState>(prev: &S, next: &S) -> Result<Self, serde_json::Error> {
        Ok(Self::diff(
            &serde_json::to_value(prev)?,
            &serde_json::to_value(next)?,
        ))
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.0, Value::Object(map) if map.is_empty())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn apply_to(&self, target: &mut Value) {
        merge_patch(target, &self.0);
    }
}

/// Overlays `patches`, in order, on top of `state`.
pub fn apply_patches<S: ResourceState>(
    state: &S,
    patches: &[StatePatch],
) -> Result<S, serde_json::Error> {
    if patches.iter().all(StatePatch::is_empty) {
        return Ok(state.clone());
    }

    let mut value = serde_json::to_value(state)?;
    for patch in patches {
        patch.apply_to(&mut value);
    }
    serde_json::from_value(value)
}

fn diff_values(prev: &Value, next: &Value) -> Option<Value> {
    match (prev, next) {
        (Value::Object(prev), Value::Object(next)) => {
            let mut patch = Map::new();
            for (key, next_item) in next {
                match prev.get(key) {
                    Some(prev_item) => {
                        if let Some(delta) = diff_values(prev_item, next_item) {
                            patch.insert(key.clone(), delta);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), next_item.clone());
                    }
                }
            }
            for key in prev.keys() {
                if !next.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            (!patch.is_empty()).then_some(Value::Object(patch))
        }
        _ => (prev != next).then(|| next.clone()),
    }
}

fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(map) = target {
        for (key, value) in entries {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
