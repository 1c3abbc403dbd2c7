use crate::model::{StateUpdate, StoreItem};
use crate::StoreResult;
use async_trait::async_trait;
use lockstep_types::{ResourceIdentifier, ResourceState, StatePatch};

/// Keyed store of checked states, addressed by `"{type}:{id}"`.
///
/// Any backend must report the same failures as the in-memory reference:
/// `NotExistent` for unknown keys, `Backend`/`Serialization` for everything
/// the backend itself cannot complete.
#[async_trait]
pub trait ResourceStore<S: ResourceState>: Send + Sync {
    async fn get(&self, rid: &ResourceIdentifier) -> StoreResult<StoreItem<S>>;

    /// Stores `initial` unconditionally; re-creating overwrites.
    async fn create(&self, rid: &ResourceIdentifier, initial: S) -> StoreResult<StoreItem<S>>;

    /// Recomputes the checksum of the produced state and stores it.
    async fn update(
        &self,
        rid: &ResourceIdentifier,
        update: StateUpdate<S>,
    ) -> StoreResult<StoreItem<S>>;

    /// Appends `patch` to `group` without touching canonical state.
    async fn add_private_patch(
        &self,
        rid: &ResourceIdentifier,
        group: &str,
        patch: StatePatch,
    ) -> StoreResult<StoreItem<S>>;

    /// Drops every patch recorded under `group`.
    async fn clear_private_patches(
        &self,
        rid: &ResourceIdentifier,
        group: &str,
    ) -> StoreResult<StoreItem<S>>;

    /// Applies all patch groups (groups by key, patches by insertion) onto
    /// canonical state, then clears them.
    async fn fold_private_patches(&self, rid: &ResourceIdentifier) -> StoreResult<StoreItem<S>>;

    /// Deletes unconditionally; removing an absent resource succeeds.
    async fn remove(&self, rid: &ResourceIdentifier) -> StoreResult<()>;

    async fn clear_all(&self) -> StoreResult<()>;
}
