//! In-memory reference implementation of [`ResourceStore`].
//!
//! Deterministic and test-friendly; every other backend is measured against
//! its observable behavior.

use crate::model::{StateUpdate, StoreItem};
use crate::traits::ResourceStore;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use lockstep_types::{
    apply_patches, compute_checked_state, ResourceIdentifier, ResourceState, StatePatch,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// In-memory resource store.
pub struct InMemoryResourceStore<S> {
    items: RwLock<HashMap<String, StoreItem<S>>>,
}

impl<S: ResourceState> InMemoryResourceStore<S> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds the store with initial states, keyed by identifier.
    pub fn with_resources<I>(resources: I) -> Self
    where
        I: IntoIterator<Item = (ResourceIdentifier, S)>,
    {
        let items = resources
            .into_iter()
            .map(|(rid, state)| {
                let key = rid.key();
                (key.clone(), StoreItem::new(key, compute_checked_state(state)))
            })
            .collect();

        Self {
            items: RwLock::new(items),
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, StoreItem<S>>>> {
        self.items
            .read()
            .map_err(|_| StoreError::Backend("resource store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, StoreItem<S>>>> {
        self.items
            .write()
            .map_err(|_| StoreError::Backend("resource store lock poisoned".to_string()))
    }

    /// Replaces the canonical state of `item`, recomputing its checksum.
    fn commit(item: &mut StoreItem<S>, next: S) {
        item.state = compute_checked_state(next);
    }
}

impl<S: ResourceState> Default for InMemoryResourceStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn existing<'a, S>(
    guard: &'a mut HashMap<String, StoreItem<S>>,
    key: &str,
) -> StoreResult<&'a mut StoreItem<S>> {
    guard
        .get_mut(key)
        .ok_or_else(|| StoreError::NotExistent(key.to_string()))
}

#[async_trait]
impl<S: ResourceState> ResourceStore<S> for InMemoryResourceStore<S> {
    async fn get(&self, rid: &ResourceIdentifier) -> StoreResult<StoreItem<S>> {
        let key = rid.key();
        self.read()?
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotExistent(key))
    }

    async fn create(&self, rid: &ResourceIdentifier, initial: S) -> StoreResult<StoreItem<S>> {
        let key = rid.key();
        let item = StoreItem::new(key.clone(), compute_checked_state(initial));

        let mut guard = self.write()?;
        if guard.insert(key, item.clone()).is_some() {
            debug!(resource = %rid, "resource re-created, previous state overwritten");
        }
        Ok(item)
    }

    async fn update(
        &self,
        rid: &ResourceIdentifier,
        update: StateUpdate<S>,
    ) -> StoreResult<StoreItem<S>> {
        let mut guard = self.write()?;
        let item = existing(&mut guard, &rid.key())?;

        let next = update.resolve(item.state.state())?;
        Self::commit(item, next);
        Ok(item.clone())
    }

    async fn add_private_patch(
        &self,
        rid: &ResourceIdentifier,
        group: &str,
        patch: StatePatch,
    ) -> StoreResult<StoreItem<S>> {
        let mut guard = self.write()?;
        let item = existing(&mut guard, &rid.key())?;

        item.patches.entry(group.to_string()).or_default().push(patch);
        Ok(item.clone())
    }

    async fn clear_private_patches(
        &self,
        rid: &ResourceIdentifier,
        group: &str,
    ) -> StoreResult<StoreItem<S>> {
        let mut guard = self.write()?;
        let item = existing(&mut guard, &rid.key())?;

        item.patches.remove(group);
        Ok(item.clone())
    }

    async fn fold_private_patches(&self, rid: &ResourceIdentifier) -> StoreResult<StoreItem<S>> {
        let mut guard = self.write()?;
        let item = existing(&mut guard, &rid.key())?;

        if !item.has_patches() {
            return Ok(item.clone());
        }

        let ordered: Vec<StatePatch> = item.patches.values().flatten().cloned().collect();
        let next = apply_patches(item.state.state(), &ordered)?;
        Self::commit(item, next);
        item.patches = BTreeMap::new();

        debug!(
            resource = %rid,
            patches = ordered.len(),
            checksum = %item.state.checksum().short(),
            "folded private patches into public state"
        );
        Ok(item.clone())
    }

    async fn remove(&self, rid: &ResourceIdentifier) -> StoreResult<()> {
        if self.write()?.remove(&rid.key()).is_none() {
            debug!(resource = %rid, "remove of absent resource ignored");
        }
        Ok(())
    }

    async fn clear_all(&self) -> StoreResult<()> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_types::fingerprint;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: i64,
        #[serde(default)]
        label: String,
    }

    fn counter(count: i64) -> Counter {
        Counter {
            count,
            label: String::new(),
        }
    }

    fn rid() -> ResourceIdentifier {
        ResourceIdentifier::new("counter", "1")
    }

    #[tokio::test]
    async fn unknown_resource_is_not_existent() {
        let store = InMemoryResourceStore::<Counter>::new();
        let err = store.get(&rid()).await.unwrap_err();
        assert_eq!(err, StoreError::NotExistent("counter:1".to_string()));
        assert_eq!(err.kind(), "NOT_EXISTENT");

        let err = store
            .update(&rid(), StateUpdate::Replace(counter(1)))
            .await
            .unwrap_err();
        assert!(err.is_not_existent());
    }

    #[tokio::test]
    async fn create_then_get_is_idempotent() {
        let store = InMemoryResourceStore::new();
        let created = store.create(&rid(), counter(0)).await.unwrap();
        assert_eq!(created.id, "counter:1");
        assert_eq!(created.state.checksum(), &fingerprint(&counter(0)));

        let first = store.get(&rid()).await.unwrap();
        let second = store.get(&rid()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, created);
    }

    #[tokio::test]
    async fn recreate_overwrites() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(1)).await.unwrap();
        store
            .add_private_patch(&rid(), "a", StatePatch::from_value(json!({"count": 9})))
            .await
            .unwrap();

        let item = store.create(&rid(), counter(5)).await.unwrap();
        assert_eq!(item.state.state(), &counter(5));
        assert!(!item.has_patches());
    }

    #[tokio::test]
    async fn seeded_resources_are_readable() {
        let store = InMemoryResourceStore::with_resources([
            (rid(), counter(3)),
            (ResourceIdentifier::new("counter", "2"), counter(4)),
        ]);
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get(&rid()).await.unwrap().state.state(), &counter(3));
    }

    #[tokio::test]
    async fn updates_recompute_the_checksum() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(0)).await.unwrap();

        let replaced = store
            .update(&rid(), StateUpdate::Replace(counter(2)))
            .await
            .unwrap();
        assert_eq!(replaced.state.checksum(), &fingerprint(&counter(2)));

        let derived = store
            .update(
                &rid(),
                StateUpdate::with(|prev: &Counter| counter(prev.count + 3)),
            )
            .await
            .unwrap();
        assert_eq!(derived.state.state().count, 5);
        assert_eq!(derived.state.checksum(), &fingerprint(&counter(5)));
    }

    #[tokio::test]
    async fn partial_update_merges_top_level_fields() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(7)).await.unwrap();

        let item = store
            .update(&rid(), StateUpdate::Partial(json!({"label": "seven"})))
            .await
            .unwrap();
        assert_eq!(
            item.state.state(),
            &Counter {
                count: 7,
                label: "seven".to_string()
            }
        );

        let err = store
            .update(&rid(), StateUpdate::Partial(json!([1, 2])))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "STORE_BACKEND_FAILURE");
        assert_eq!(store.get(&rid()).await.unwrap().state.state().count, 7);
    }

    #[tokio::test]
    async fn private_patches_keep_insertion_order_per_group() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(0)).await.unwrap();

        for count in [1, 2, 3] {
            store
                .add_private_patch(&rid(), "white", StatePatch::from_value(json!({"count": count})))
                .await
                .unwrap();
        }
        let item = store
            .add_private_patch(&rid(), "black", StatePatch::from_value(json!({"label": "b"})))
            .await
            .unwrap();

        let white: Vec<_> = item
            .patches_for("white")
            .iter()
            .map(|patch| patch.as_value()["count"].clone())
            .collect();
        assert_eq!(white, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(item.patches_for("black").len(), 1);
        assert!(item.patches_for("nobody").is_empty());

        // canonical state is untouched
        assert_eq!(item.state.state(), &counter(0));
    }

    #[tokio::test]
    async fn clearing_one_group_leaves_the_others() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(0)).await.unwrap();
        store
            .add_private_patch(&rid(), "white", StatePatch::from_value(json!({"count": 1})))
            .await
            .unwrap();
        store
            .add_private_patch(&rid(), "black", StatePatch::from_value(json!({"count": 2})))
            .await
            .unwrap();

        let item = store.clear_private_patches(&rid(), "white").await.unwrap();
        assert!(item.patches_for("white").is_empty());
        assert_eq!(item.patches_for("black").len(), 1);
    }

    #[tokio::test]
    async fn fold_applies_groups_in_key_order() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(0)).await.unwrap();
        store
            .add_private_patch(&rid(), "white", StatePatch::from_value(json!({"count": 2})))
            .await
            .unwrap();
        store
            .add_private_patch(&rid(), "black", StatePatch::from_value(json!({"count": 1, "label": "b"})))
            .await
            .unwrap();

        let folded = store.fold_private_patches(&rid()).await.unwrap();
        assert_eq!(
            folded.state.state(),
            &Counter {
                count: 2,
                label: "b".to_string()
            }
        );
        assert_eq!(folded.state.checksum(), &fingerprint(folded.state.state()));
        assert!(!folded.has_patches());
    }

    #[tokio::test]
    async fn fold_without_patches_is_a_no_op() {
        let store = InMemoryResourceStore::new();
        let created = store.create(&rid(), counter(4)).await.unwrap();
        let folded = store.fold_private_patches(&rid()).await.unwrap();
        assert_eq!(created, folded);
    }

    #[tokio::test]
    async fn remove_and_clear_all() {
        let store = InMemoryResourceStore::new();
        store.create(&rid(), counter(0)).await.unwrap();
        store
            .create(&ResourceIdentifier::new("counter", "2"), counter(0))
            .await
            .unwrap();

        store.remove(&rid()).await.unwrap();
        assert!(store.get(&rid()).await.unwrap_err().is_not_existent());
        assert_eq!(store.len().unwrap(), 1);

        // deletion is unconditional
        store.remove(&rid()).await.unwrap();
        store
            .remove(&ResourceIdentifier::new("counter", "absent"))
            .await
            .unwrap();
        assert_eq!(store.len().unwrap(), 1);

        store.clear_all().await.unwrap();
        assert!(store.is_empty().unwrap());
    }
}
