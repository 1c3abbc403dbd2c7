use crate::checked::Checksum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// An action a reducer understands.
///
/// Applications usually implement this on an enum tagged with
/// `#[serde(tag = "type", content = "payload")]` so the wire shape is
/// `{ "type": ..., "payload": ... }`.
pub trait Action: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The action type, used for logging and error reports.
    fn kind(&self) -> &str;

    /// Private actions only ever mutate the dispatching client's view.
    fn is_private(&self) -> bool {
        false
    }
}

/// An action as forwarded by the master, tagged with the checksum of the
/// state the recipient must reach after applying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedAction<A> {
    pub action: A,
    pub checksum: Checksum,
}

impl<A> CheckedAction<A> {
    pub fn new(action: A, checksum: Checksum) -> Self {
        Self { action, checksum }
    }
}

/// Untyped action for reducers that work over dynamic JSON payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_private: bool,
}

impl GenericAction {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            is_private: false,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

impl Action for GenericAction {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn is_private(&self) -> bool {
        self.is_private
    }
}
