use crate::{MasterConfig, MasterResult};
use dashmap::DashMap;
use lockstep_store::{ResourceStore, StateUpdate, StoreItem};
use lockstep_types::{
    apply_patches, compute_checked_state, Action, CheckedAction, CheckedState, ClientId, Reducer,
    ResourceIdentifier, StatePatch,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

/// A checked action addressed to one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Forward<A> {
    pub recipient: ClientId,
    pub checked_action: CheckedAction<A>,
}

/// Result of applying one inbound action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome<S, A> {
    /// Canonical state after the action.
    pub public: CheckedState<S>,
    /// Forwards for the transport to deliver, in subscriber order.
    pub forwards: Vec<Forward<A>>,
    /// Whether private patches were folded into canonical state.
    pub folded: bool,
}

/// Authoritative orchestrator for every resource held by one store.
pub struct MasterResource<R: Reducer, St> {
    reducer: Arc<R>,
    store: Arc<St>,
    config: MasterConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<R, St> MasterResource<R, St>
where
    R: Reducer,
    St: ResourceStore<R::State>,
{
    pub fn new(reducer: R, store: St) -> Self {
        Self::with_config(reducer, store, MasterConfig::default())
    }

    pub fn with_config(reducer: R, store: St, config: MasterConfig) -> Self {
        Self::from_shared(Arc::new(reducer), Arc::new(store), config)
    }

    pub fn from_shared(reducer: Arc<R>, store: Arc<St>, config: MasterConfig) -> Self {
        Self {
            reducer,
            store,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn reducer(&self) -> &Arc<R> {
        &self.reducer
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Creates (or overwrites) a resource.
    #[instrument(skip(self, initial), fields(rid = %rid))]
    pub async fn create(
        &self,
        rid: &ResourceIdentifier,
        initial: R::State,
    ) -> MasterResult<CheckedState<R::State>> {
        let lock = self.lock_for(rid);
        let _guard = lock.lock().await;

        let item = self
            .store
            .create(rid, initial)
            .await
            .inspect_err(|err| error!(error = %err, "failed to create resource"))?;

        debug!(checksum = %item.state.checksum().short(), "resource created");
        Ok(item.state)
    }

    /// Canonical state, without any private patches.
    pub async fn get_public(
        &self,
        rid: &ResourceIdentifier,
    ) -> MasterResult<CheckedState<R::State>> {
        Ok(self.store.get(rid).await?.state)
    }

    /// Canonical state overlaid with `client`'s own private patches.
    pub async fn get_client_state(
        &self,
        rid: &ResourceIdentifier,
        client: &ClientId,
    ) -> MasterResult<CheckedState<R::State>> {
        let item = self.store.get(rid).await?;
        visible_state(&item, client)
    }

    /// Serves an explicit resync request with the client's visible state.
    #[instrument(skip(self), fields(rid = %rid, client = %client))]
    pub async fn resync(
        &self,
        rid: &ResourceIdentifier,
        client: &ClientId,
    ) -> MasterResult<CheckedState<R::State>> {
        let checked = self
            .get_client_state(rid, client)
            .await
            .inspect_err(|err| error!(error = %err, "resync failed"))?;

        debug!(checksum = %checked.checksum().short(), "resync served");
        Ok(checked)
    }

    /// Deletes the resource; removing an absent one succeeds.
    ///
    /// The per-resource lock outlives the resource, so tasks still queued on
    /// it stay serialized with whatever re-creates the same identifier.
    #[instrument(skip(self), fields(rid = %rid))]
    pub async fn remove(&self, rid: &ResourceIdentifier) -> MasterResult<()> {
        let lock = self.lock_for(rid);
        let _guard = lock.lock().await;

        self.store
            .remove(rid)
            .await
            .inspect_err(|err| error!(error = %err, "failed to remove resource"))?;
        Ok(())
    }

    /// Applies an action from `sender` and addresses forwards to
    /// `subscribers`.
    ///
    /// Actions on the same resource are applied one at a time, in the order
    /// their lock was acquired.
    #[instrument(
        skip(self, action, subscribers),
        fields(rid = %rid, client = %sender, action = action.kind())
    )]
    pub async fn apply_action(
        &self,
        rid: &ResourceIdentifier,
        sender: &ClientId,
        action: R::Action,
        subscribers: &[ClientId],
    ) -> MasterResult<ActionOutcome<R::State, R::Action>> {
        let lock = self.lock_for(rid);
        let _guard = lock.lock().await;

        let outcome = if action.is_private() {
            self.apply_private(rid, sender, &action).await
        } else {
            self.apply_public(rid, sender, action, subscribers).await
        };

        outcome.inspect_err(|err| error!(error = %err, kind = err.kind(), "action rejected"))
    }

    async fn apply_private(
        &self,
        rid: &ResourceIdentifier,
        sender: &ClientId,
        action: &R::Action,
    ) -> MasterResult<ActionOutcome<R::State, R::Action>> {
        let item = self.store.get(rid).await?;
        let visible = visible_state(&item, sender)?;

        let next = self.reducer.reduce(visible.state(), action);
        let patch = StatePatch::between(visible.state(), &next)?;
        if patch.is_empty() {
            debug!("private action left the sender's view unchanged");
            return Ok(ActionOutcome {
                public: item.state,
                forwards: Vec::new(),
                folded: false,
            });
        }

        let item = self
            .store
            .add_private_patch(rid, sender.as_str(), patch)
            .await?;

        debug!(
            patches = item.patches_for(sender.as_str()).len(),
            "private patch recorded"
        );
        Ok(ActionOutcome {
            public: item.state,
            forwards: Vec::new(),
            folded: false,
        })
    }

    async fn apply_public(
        &self,
        rid: &ResourceIdentifier,
        sender: &ClientId,
        action: R::Action,
        subscribers: &[ClientId],
    ) -> MasterResult<ActionOutcome<R::State, R::Action>> {
        let reducer = Arc::clone(&self.reducer);
        let applied = action.clone();
        let mut item = self
            .store
            .update(
                rid,
                StateUpdate::with(move |prev: &R::State| reducer.reduce(prev, &applied)),
            )
            .await?;

        let mut folded = false;
        if self.config.fold_private_patches
            && item.has_patches()
            && self.reducer.should_fold_private_patches(&item.state)
        {
            item = self.store.fold_private_patches(rid).await?;
            folded = true;
        }

        let include_sender = folded && self.config.forward_on_fold_to_sender;
        let forwards = subscribers
            .iter()
            .filter(|recipient| include_sender || *recipient != sender)
            .map(|recipient| -> MasterResult<Forward<R::Action>> {
                let visible = visible_state(&item, recipient)?;
                Ok(Forward {
                    recipient: recipient.clone(),
                    checked_action: CheckedAction::new(action.clone(), visible.checksum().clone()),
                })
            })
            .collect::<MasterResult<Vec<_>>>()?;

        if folded {
            warn!(
                checksum = %item.state.checksum().short(),
                recipients = forwards.len(),
                "private patches folded into public state"
            );
        } else {
            debug!(
                checksum = %item.state.checksum().short(),
                recipients = forwards.len(),
                "public action applied"
            );
        }

        Ok(ActionOutcome {
            public: item.state,
            forwards,
            folded,
        })
    }

    fn lock_for(&self, rid: &ResourceIdentifier) -> Arc<Mutex<()>> {
        self.locks.entry(rid.key()).or_default().clone()
    }
}

/// Canonical state overlaid with the patches grouped under `client`.
fn visible_state<S: lockstep_types::ResourceState>(
    item: &StoreItem<S>,
    client: &ClientId,
) -> MasterResult<CheckedState<S>> {
    let patches = item.patches_for(client.as_str());
    if patches.is_empty() {
        return Ok(item.state.clone());
    }
    Ok(compute_checked_state(apply_patches(item.state.state(), patches)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_store::InMemoryResourceStore;
    use lockstep_types::{fingerprint, Checksum};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct Board {
        count: i64,
        #[serde(default)]
        notes: BTreeMap<String, Vec<i64>>,
        #[serde(default)]
        revealed: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "payload", rename_all = "camelCase")]
    enum BoardAction {
        Increment,
        Change(i64),
        Note { player: String, value: i64 },
        Reveal,
    }

    impl Action for BoardAction {
        fn kind(&self) -> &str {
            match self {
                BoardAction::Increment => "increment",
                BoardAction::Change(_) => "change",
                BoardAction::Note { .. } => "note",
                BoardAction::Reveal => "reveal",
            }
        }

        fn is_private(&self) -> bool {
            matches!(self, BoardAction::Note { .. })
        }
    }

    struct BoardReducer;

    impl Reducer for BoardReducer {
        type State = Board;
        type Action = BoardAction;

        fn reduce(&self, state: &Board, action: &BoardAction) -> Board {
            let mut next = state.clone();
            match action {
                BoardAction::Increment => next.count += 1,
                BoardAction::Change(count) => next.count = *count,
                BoardAction::Note { player, value } => {
                    next.notes.entry(player.clone()).or_default().push(*value)
                }
                BoardAction::Reveal => next.revealed = true,
            }
            next
        }

        fn should_fold_private_patches(&self, public: &CheckedState<Board>) -> bool {
            public.state().revealed
        }
    }

    type Master = MasterResource<BoardReducer, InMemoryResourceStore<Board>>;

    fn rid() -> ResourceIdentifier {
        ResourceIdentifier::new("board", "1")
    }

    fn clients() -> Vec<ClientId> {
        vec!["white".into(), "black".into(), "spectator".into()]
    }

    fn note(player: &str, value: i64) -> BoardAction {
        BoardAction::Note {
            player: player.to_string(),
            value,
        }
    }

    async fn master() -> Master {
        let master = MasterResource::new(BoardReducer, InMemoryResourceStore::new());
        master.create(&rid(), Board::default()).await.unwrap();
        master
    }

    fn recipients<A>(forwards: &[Forward<A>]) -> Vec<&str> {
        forwards.iter().map(|f| f.recipient.as_str()).collect()
    }

    #[tokio::test]
    async fn public_action_is_forwarded_to_everyone_but_the_sender() {
        let master = master().await;
        let white = ClientId::new("white");

        let outcome = master
            .apply_action(&rid(), &white, BoardAction::Change(5), &clients())
            .await
            .unwrap();

        let expected = compute_checked_state(Board {
            count: 5,
            ..Board::default()
        });
        assert_eq!(outcome.public, expected);
        assert_eq!(master.get_public(&rid()).await.unwrap(), expected);
        assert!(!outcome.folded);
        assert_eq!(recipients(&outcome.forwards), vec!["black", "spectator"]);
        for forward in &outcome.forwards {
            assert_eq!(forward.checked_action.action, BoardAction::Change(5));
            assert_eq!(&forward.checked_action.checksum, expected.checksum());
        }
    }

    #[tokio::test]
    async fn unknown_resource_is_surfaced() {
        let master = MasterResource::new(BoardReducer, InMemoryResourceStore::new());
        let err = master
            .apply_action(&rid(), &"white".into(), BoardAction::Increment, &clients())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_EXISTENT");

        let err = master.get_public(&rid()).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_EXISTENT");
    }

    #[tokio::test]
    async fn private_action_only_touches_the_sender_view() {
        let master = master().await;
        let white = ClientId::new("white");
        let black = ClientId::new("black");

        let outcome = master
            .apply_action(&rid(), &white, note("white", 7), &clients())
            .await
            .unwrap();

        assert!(outcome.forwards.is_empty());
        assert_eq!(outcome.public, compute_checked_state(Board::default()));
        assert_eq!(master.get_public(&rid()).await.unwrap(), outcome.public);
        assert_eq!(master.get_client_state(&rid(), &black).await.unwrap(), outcome.public);

        let white_view = master.get_client_state(&rid(), &white).await.unwrap();
        assert_eq!(white_view.state().notes["white"], vec![7]);
        assert_eq!(white_view.checksum(), &fingerprint(white_view.state()));
    }

    #[tokio::test]
    async fn forward_checksums_follow_each_recipient_view() {
        let master = master().await;
        let white = ClientId::new("white");
        let black = ClientId::new("black");

        master
            .apply_action(&rid(), &white, note("white", 1), &clients())
            .await
            .unwrap();
        master
            .apply_action(&rid(), &black, note("black", 2), &clients())
            .await
            .unwrap();

        let outcome = master
            .apply_action(&rid(), &"spectator".into(), BoardAction::Increment, &clients())
            .await
            .unwrap();

        let checksums: BTreeMap<&str, Checksum> = outcome
            .forwards
            .iter()
            .map(|f| (f.recipient.as_str(), f.checked_action.checksum.clone()))
            .collect();

        let white_view = master.get_client_state(&rid(), &white).await.unwrap();
        let black_view = master.get_client_state(&rid(), &black).await.unwrap();
        assert_eq!(&checksums["white"], white_view.checksum());
        assert_eq!(&checksums["black"], black_view.checksum());
        assert_ne!(white_view.checksum(), black_view.checksum());
        assert_eq!(white_view.state().count, 1);
        assert!(!white_view.state().notes.contains_key("black"));
    }

    #[tokio::test]
    async fn reveal_folds_patches_and_includes_the_sender() {
        let master = master().await;
        let white = ClientId::new("white");

        master
            .apply_action(&rid(), &white, note("white", 1), &clients())
            .await
            .unwrap();
        master
            .apply_action(&rid(), &"black".into(), note("black", 2), &clients())
            .await
            .unwrap();

        let outcome = master
            .apply_action(&rid(), &white, BoardAction::Reveal, &clients())
            .await
            .unwrap();

        assert!(outcome.folded);
        assert_eq!(recipients(&outcome.forwards), vec!["white", "black", "spectator"]);

        let public = outcome.public.state();
        assert_eq!(public.notes["white"], vec![1]);
        assert_eq!(public.notes["black"], vec![2]);
        for forward in &outcome.forwards {
            assert_eq!(&forward.checked_action.checksum, outcome.public.checksum());
        }
        assert!(!master.store().get(&rid()).await.unwrap().has_patches());
    }

    #[tokio::test]
    async fn folding_can_be_disabled() {
        let master = MasterResource::with_config(
            BoardReducer,
            InMemoryResourceStore::new(),
            MasterConfig {
                fold_private_patches: false,
                ..MasterConfig::default()
            },
        );
        master.create(&rid(), Board::default()).await.unwrap();
        let white = ClientId::new("white");

        master
            .apply_action(&rid(), &white, note("white", 1), &clients())
            .await
            .unwrap();
        let outcome = master
            .apply_action(&rid(), &white, BoardAction::Reveal, &clients())
            .await
            .unwrap();

        assert!(!outcome.folded);
        assert!(outcome.public.state().notes.is_empty());
        assert_eq!(recipients(&outcome.forwards), vec!["black", "spectator"]);
    }

    #[tokio::test]
    async fn resync_serves_the_visible_state() {
        let master = master().await;
        let white = ClientId::new("white");
        master
            .apply_action(&rid(), &white, note("white", 3), &clients())
            .await
            .unwrap();

        let resynced = master.resync(&rid(), &white).await.unwrap();
        assert_eq!(resynced, master.get_client_state(&rid(), &white).await.unwrap());
    }

    #[tokio::test]
    async fn remove_drops_the_resource() {
        let master = master().await;
        master.remove(&rid()).await.unwrap();
        assert_eq!(master.get_public(&rid()).await.unwrap_err().kind(), "NOT_EXISTENT");

        master.remove(&rid()).await.unwrap();
        master
            .remove(&ResourceIdentifier::new("board", "never-created"))
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn recreated_resource_keeps_its_lock() {
        let master = Arc::new(master().await);
        let held = master.lock_for(&rid());

        master.remove(&rid()).await.unwrap();
        master.create(&rid(), Board::default()).await.unwrap();
        let guard = held.lock().await;

        let pending = {
            let master = Arc::clone(&master);
            tokio::spawn(async move {
                master
                    .apply_action(&rid(), &ClientId::new("white"), BoardAction::Increment, &[])
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!pending.is_finished());

        drop(guard);
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome.public.state().count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_actions_on_one_resource_never_lose_updates() {
        let master = Arc::new(master().await);

        let tasks: Vec<_> = (0..64)
            .map(|n| {
                let master = Arc::clone(&master);
                tokio::spawn(async move {
                    let sender = ClientId::new(format!("client-{n}"));
                    master
                        .apply_action(&rid(), &sender, BoardAction::Increment, &[])
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(master.get_public(&rid()).await.unwrap().state().count, 64);
    }
}
