//! In-process loopback standing in for the transport between clients and the
//! master.
//!
//! Clients enqueue actions with [`MasterClient::emit_action`]; nothing reaches
//! the master until [`MasterEnv::settle`] drains the queue, in emission order,
//! and hands each forward to the addressed client's `on_fwd_action`
//! listeners. Tests therefore control exactly when delivery happens.

use lockstep_client::ClientResource;
use lockstep_master::{MasterResource, MasterResult};
use lockstep_store::{InMemoryResourceStore, ResourceStore};
use lockstep_types::{
    Action, CheckedAction, CheckedState, ClientId, ObserverHandle, Observers, Reducer,
    ResourceIdentifier,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

type Envelope<A> = (ClientId, A);

/// One client's end of the loopback.
pub struct MasterClient<A> {
    id: ClientId,
    outbox: mpsc::UnboundedSender<Envelope<A>>,
    forwarded: Observers<CheckedAction<A>>,
}

impl<A> Clone for MasterClient<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            outbox: self.outbox.clone(),
            forwarded: self.forwarded.clone(),
        }
    }
}

impl<A: Action> MasterClient<A> {
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Queues `action` for the master. Returns `false` if the environment is
    /// gone.
    pub fn emit_action(&self, action: A) -> bool {
        let kind = action.kind().to_string();
        match self.outbox.send((self.id.clone(), action)) {
            Ok(()) => true,
            Err(_) => {
                warn!(client = %self.id, action = kind, "master env dropped, action discarded");
                false
            }
        }
    }

    pub fn on_fwd_action<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnMut(&CheckedAction<A>) + Send + 'static,
    {
        self.forwarded.subscribe(listener)
    }

    /// Routes an engine's outbound events to the master: private
    /// submissions and public actions alike, in the order the engine
    /// publishes them.
    pub fn attach<R>(&self, engine: &ClientResource<R>) -> [ObserverHandle; 2]
    where
        R: Reducer<Action = A>,
    {
        let private = {
            let client = self.clone();
            engine.on_private_dispatched(move |event| {
                client.emit_action(event.action.clone());
            })
        };
        let public = {
            let client = self.clone();
            engine.on_dispatched(move |event| {
                client.emit_action(event.action.clone());
            })
        };
        [private, public]
    }
}

/// A master for one resource, subscribed to by a fixed set of clients.
pub struct MasterEnv<R: Reducer, St = InMemoryResourceStore<<R as Reducer>::State>> {
    master: Arc<MasterResource<R, St>>,
    rid: ResourceIdentifier,
    clients: Vec<MasterClient<R::Action>>,
    subscribers: Vec<ClientId>,
    inbox: mpsc::UnboundedReceiver<Envelope<R::Action>>,
}

impl<R: Reducer> MasterEnv<R> {
    /// Builds an environment over a fresh in-memory store with the resource
    /// already created.
    pub async fn in_memory<I, C>(
        reducer: R,
        rid: ResourceIdentifier,
        initial: R::State,
        client_ids: I,
    ) -> MasterResult<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<ClientId>,
    {
        let master = MasterResource::new(reducer, InMemoryResourceStore::new());
        master.create(&rid, initial).await?;
        Ok(Self::new(Arc::new(master), rid, client_ids))
    }
}

impl<R, St> MasterEnv<R, St>
where
    R: Reducer,
    St: ResourceStore<R::State>,
{
    pub fn new<I, C>(master: Arc<MasterResource<R, St>>, rid: ResourceIdentifier, client_ids: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClientId>,
    {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let clients: Vec<_> = client_ids
            .into_iter()
            .map(|id| MasterClient {
                id: id.into(),
                outbox: outbox.clone(),
                forwarded: Observers::new(),
            })
            .collect();
        let subscribers = clients.iter().map(|client| client.id.clone()).collect();

        Self {
            master,
            rid,
            clients,
            subscribers,
            inbox,
        }
    }

    pub fn master(&self) -> &Arc<MasterResource<R, St>> {
        &self.master
    }

    pub fn rid(&self) -> &ResourceIdentifier {
        &self.rid
    }

    pub fn clients(&self) -> &[MasterClient<R::Action>] {
        &self.clients
    }

    pub fn client(&self, id: &str) -> Option<&MasterClient<R::Action>> {
        self.clients.iter().find(|client| client.id.as_str() == id)
    }

    pub async fn get_public(&self) -> MasterResult<CheckedState<R::State>> {
        self.master.get_public(&self.rid).await
    }

    pub async fn get_client_state(&self, id: &ClientId) -> MasterResult<CheckedState<R::State>> {
        self.master.get_client_state(&self.rid, id).await
    }

    pub async fn resync(&self, id: &ClientId) -> MasterResult<CheckedState<R::State>> {
        self.master.resync(&self.rid, id).await
    }

    /// Delivers every queued action to the master and every resulting
    /// forward to its recipient. Returns the number of actions applied.
    ///
    /// Stops at the first rejected action; later actions stay queued.
    pub async fn settle(&mut self) -> MasterResult<usize> {
        let mut applied = 0;

        while let Ok((sender, action)) = self.inbox.try_recv() {
            let outcome = self
                .master
                .apply_action(&self.rid, &sender, action, &self.subscribers)
                .await?;
            applied += 1;

            for forward in outcome.forwards {
                match self.clients.iter().find(|c| c.id == forward.recipient) {
                    Some(client) => client.forwarded.notify(&forward.checked_action),
                    None => debug!(client = %forward.recipient, "forward for unknown client dropped"),
                }
            }
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CounterAction, CounterReducer, CounterState};
    use parking_lot::Mutex;

    #[tokio::test]
    async fn nothing_is_applied_before_settle() {
        let mut env = MasterEnv::in_memory(
            CounterReducer,
            ResourceIdentifier::new("counter", "1"),
            CounterState::default(),
            ["a", "b"],
        )
        .await
        .unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        {
            let received = received.clone();
            env.client("b")
                .unwrap()
                .on_fwd_action(move |fwd| received.lock().push(fwd.clone()));
        }

        assert!(env.clients()[0].emit_action(CounterAction::IncrementBy(2)));
        assert_eq!(env.get_public().await.unwrap().state().count, 0);

        assert_eq!(env.settle().await.unwrap(), 1);
        assert_eq!(env.get_public().await.unwrap().state().count, 2);

        assert_eq!(env.settle().await.unwrap(), 0);

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].action, CounterAction::IncrementBy(2));
    }
}
