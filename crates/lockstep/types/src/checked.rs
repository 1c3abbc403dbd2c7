//! Checked state: a state value bound to the checksum of its contents.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::fmt::Debug;

/// Bound satisfied by every state a resource can hold.
pub trait ResourceState:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> ResourceState for T where
    T: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Lowercase hex BLAKE3 digest of a state's canonical JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the checksum of any serializable value.
///
/// Object keys are sorted recursively before hashing, so structurally equal
/// states hash equally regardless of how their maps were built. A value that
/// cannot be represented as JSON (e.g. a map with non-string keys) hashes the
/// serializer's error text instead, which keeps this function total.
pub fn fingerprint<S: Serialize + ?Sized>(state: &S) -> Checksum {
    let canonical = match serde_json::to_value(state) {
        Ok(value) => {
            let mut out = Vec::new();
            write_canonical(&value, &mut out);
            out
        }
        Err(err) => {
            tracing::error!(error = %err, "state is not representable as JSON");
            format!("!unrepresentable:{err}").into_bytes()
        }
    };

    Checksum(blake3::hash(&canonical).to_hex().to_string())
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (index, (key, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::from(key.as_str()).to_string().as_bytes());
                out.push(b':');
                write_canonical(item, out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

/// An immutable `(state, checksum)` pair where `checksum == fingerprint(state)`.
///
/// Serialized as the two-element array `[state, checksum]`. Deserialization
/// recomputes the checksum and rejects pairs whose digest does not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedState<S> {
    state: S,
    checksum: Checksum,
}

impl<S: Serialize> CheckedState<S> {
    pub fn new(state: S) -> Self {
        let checksum = fingerprint(&state);
        Self { state, checksum }
    }
}

impl<S> CheckedState<S> {
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn matches(&self, checksum: &Checksum) -> bool {
        &self.checksum == checksum
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn into_parts(self) -> (S, Checksum) {
        (self.state, self.checksum)
    }
}

/// Builds the checked state of `state`.
pub fn compute_checked_state<S: Serialize>(state: S) -> CheckedState<S> {
    CheckedState::new(state)
}

impl<S: Serialize> Serialize for CheckedState<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        (&self.state, &self.checksum).serialize(serializer)
    }
}

impl<'de, S> Deserialize<'de> for CheckedState<S>
where
    S: Serialize + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (state, claimed) = <(S, Checksum)>::deserialize(deserializer)?;
        let checked = CheckedState::new(state);
        if checked.checksum != claimed {
            return Err(D::Error::custom(format!(
                "checksum mismatch: payload claims {claimed}, contents hash to {}",
                checked.checksum
            )));
        }
        Ok(checked)
    }
}
