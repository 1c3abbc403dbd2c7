use crate::{StoreError, StoreResult};
use lockstep_types::{CheckedState, ResourceState, StatePatch};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A stored resource: canonical checked state plus private patch groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize",
    deserialize = "S: Serialize + DeserializeOwned"
))]
pub struct StoreItem<S> {
    pub id: String,
    pub state: CheckedState<S>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patches: BTreeMap<String, Vec<StatePatch>>,
}

impl<S> StoreItem<S> {
    pub fn new(id: impl Into<String>, state: CheckedState<S>) -> Self {
        Self {
            id: id.into(),
            state,
            patches: BTreeMap::new(),
        }
    }

    /// Patches recorded under `group`, oldest first.
    pub fn patches_for(&self, group: &str) -> &[StatePatch] {
        self.patches.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_patches(&self) -> bool {
        self.patches.values().any(|group| !group.is_empty())
    }
}

/// How `ResourceStore::update` derives the next canonical state.
pub enum StateUpdate<S> {
    /// Full replacement.
    Replace(S),
    /// JSON object shallow-merged over the previous state's top-level fields.
    Partial(Value),
    /// Pure function of the previous state.
    With(Box<dyn FnOnce(&S) -> S + Send>),
}

impl<S: ResourceState> StateUpdate<S> {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S + Send + 'static,
    {
        StateUpdate::With(Box::new(f))
    }

    /// Produces the next state from `prev`.
    pub fn resolve(self, prev: &S) -> StoreResult<S> {
        match self {
            StateUpdate::Replace(next) => Ok(next),
            StateUpdate::With(f) => Ok(f(prev)),
            StateUpdate::Partial(partial) => {
                let Value::Object(fields) = partial else {
                    return Err(StoreError::Serialization(
                        "partial update must be a JSON object".to_string(),
                    ));
                };

                let mut merged = serde_json::to_value(prev)?;
                let Value::Object(target) = &mut merged else {
                    return Err(StoreError::Serialization(
                        "partial update requires an object-shaped state".to_string(),
                    ));
                };
                target.extend(fields);

                Ok(serde_json::from_value(merged)?)
            }
        }
    }
}

impl<S> fmt::Debug for StateUpdate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateUpdate::Replace(_) => f.write_str("StateUpdate::Replace"),
            StateUpdate::Partial(value) => write!(f, "StateUpdate::Partial({value})"),
            StateUpdate::With(_) => f.write_str("StateUpdate::With(..)"),
        }
    }
}
