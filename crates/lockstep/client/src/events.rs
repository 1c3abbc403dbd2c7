use serde::Serialize;

/// Published on every local public dispatch. This is the only event meant to
/// be broadcast through the master to peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchedEvent<A> {
    pub action: A,
    /// Set when the action accompanies a private dispatch.
    pub private_companion: bool,
}

/// Published on every local private dispatch. The action is addressed to the
/// master alone and must never be forwarded to peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrivateDispatchedEvent<A> {
    pub action: A,
}
