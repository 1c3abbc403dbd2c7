use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between resource type and resource id in the store key.
pub const RESOURCE_ID_SEPARATOR: char = ':';

/// Address of an independently synchronized resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentifier {
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Store key, `"{resource_type}:{resource_id}"`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.resource_type, RESOURCE_ID_SEPARATOR, self.resource_id
        )
    }
}

impl FromStr for ResourceIdentifier {
    type Err = ResourceIdentifierError;

    /// Splits on the first separator; the resource id may itself contain `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource_type, resource_id) = s
            .split_once(RESOURCE_ID_SEPARATOR)
            .ok_or_else(|| ResourceIdentifierError::MissingSeparator(s.to_string()))?;

        if resource_type.is_empty() {
            return Err(ResourceIdentifierError::EmptyResourceType(s.to_string()));
        }

        Ok(Self::new(resource_type, resource_id))
    }
}

/// Errors parsing a serialized resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdentifierError {
    #[error("resource identifier '{0}' has no ':' separator")]
    MissingSeparator(String),

    #[error("resource identifier '{0}' has an empty resource type")]
    EmptyResourceType(String),
}

/// Identity of a connected client. Doubles as its private patch group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
