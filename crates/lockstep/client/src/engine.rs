use crate::error::{ReconcileError, ReconcileResult};
use crate::events::{DispatchedEvent, PrivateDispatchedEvent};
use lockstep_types::{Action, CheckedAction, CheckedState, ObserverHandle, Observers, Reducer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether local state is known to match the master's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Last change came from the master (reconciled action or full state).
    #[default]
    Synced,
    /// Local dispatches have been applied that the master has not confirmed.
    Speculative,
}

/// Successful reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome<S> {
    pub checked: CheckedState<S>,
}

/// Optimistic state machine for one client's copy of one resource.
///
/// All operations are synchronous; dispatch order is application order.
/// Listeners run inline, in registration order, before the triggering call
/// returns.
pub struct ClientResource<R: Reducer> {
    reducer: Arc<R>,
    checked: CheckedState<R::State>,
    status: SyncStatus,
    dispatched: Observers<DispatchedEvent<R::Action>>,
    private_dispatched: Observers<PrivateDispatchedEvent<R::Action>>,
    updated: Observers<CheckedState<R::State>>,
}

impl<R: Reducer> ClientResource<R> {
    pub fn new(reducer: R, initial: CheckedState<R::State>) -> Self {
        Self::with_shared_reducer(Arc::new(reducer), initial)
    }

    pub fn with_shared_reducer(reducer: Arc<R>, initial: CheckedState<R::State>) -> Self {
        Self {
            reducer,
            checked: initial,
            status: SyncStatus::Synced,
            dispatched: Observers::new(),
            private_dispatched: Observers::new(),
            updated: Observers::new(),
        }
    }

    pub fn get(&self) -> &CheckedState<R::State> {
        &self.checked
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn reducer(&self) -> &Arc<R> {
        &self.reducer
    }

    /// Applies `action` locally and publishes it.
    ///
    /// Public actions go to `on_dispatched` listeners. A private action goes
    /// to `on_private_dispatched` listeners only.
    pub fn dispatch(&mut self, action: R::Action) -> &CheckedState<R::State> {
        let next = self.reducer.apply(&self.checked, &action);
        self.replace(next, SyncStatus::Speculative);

        debug!(
            action = action.kind(),
            private = action.is_private(),
            checksum = %self.checked.checksum().short(),
            "local dispatch"
        );

        if action.is_private() {
            self.private_dispatched
                .notify(&PrivateDispatchedEvent { action });
        } else {
            self.dispatched.notify(&DispatchedEvent {
                action,
                private_companion: false,
            });
        }
        &self.checked
    }

    /// Applies `private` then `public` locally. Only `public` reaches the
    /// `on_dispatched` listeners; `private` is published to the master-bound
    /// `on_private_dispatched` listeners first, so a transport that preserves
    /// order delivers the submission before its companion.
    pub fn dispatch_private(
        &mut self,
        private: R::Action,
        public: R::Action,
    ) -> &CheckedState<R::State> {
        let intermediate = self.reducer.reduce(self.checked.state(), &private);
        let next = CheckedState::new(self.reducer.reduce(&intermediate, &public));
        self.replace(next, SyncStatus::Speculative);

        debug!(
            private = private.kind(),
            public = public.kind(),
            checksum = %self.checked.checksum().short(),
            "local private dispatch"
        );

        self.private_dispatched
            .notify(&PrivateDispatchedEvent { action: private });
        self.dispatched.notify(&DispatchedEvent {
            action: public,
            private_companion: true,
        });
        &self.checked
    }

    /// Applies an action forwarded by the master and checks that the result
    /// hashes to the checksum the master computed for this client.
    ///
    /// On any error local state is left untouched; recovery (typically a
    /// resync followed by [`reconciliate_state`](Self::reconciliate_state))
    /// is up to the caller.
    pub fn reconciliate_action(
        &mut self,
        forwarded: &CheckedAction<R::Action>,
    ) -> ReconcileResult<ReconcileOutcome<R::State>> {
        let kind = forwarded.action.kind();

        if !self.reducer.can_reconcile_state(&self.checked, forwarded) {
            warn!(
                action = kind,
                expected = %forwarded.checksum.short(),
                "forwarded action rejected by reconcile predicate"
            );
            return Err(ReconcileError::ResyncRequired {
                action: kind.to_string(),
            });
        }

        let candidate = self.reducer.apply(&self.checked, &forwarded.action);
        if !candidate.matches(&forwarded.checksum) {
            warn!(
                action = kind,
                expected = %forwarded.checksum.short(),
                actual = %candidate.checksum().short(),
                "reconciliation mismatch"
            );
            return Err(ReconcileError::Mismatch {
                action: kind.to_string(),
                expected: forwarded.checksum.clone(),
                actual: candidate.checksum().clone(),
            });
        }

        self.replace(candidate, SyncStatus::Synced);
        debug!(action = kind, checksum = %self.checked.checksum().short(), "reconciled");

        Ok(ReconcileOutcome {
            checked: self.checked.clone(),
        })
    }

    /// Replaces local state with a master-provided one. Returns `true` when
    /// unconfirmed local dispatches may have been overwritten.
    pub fn reconciliate_state(&mut self, checked: CheckedState<R::State>) -> bool {
        let overwrote = self.status == SyncStatus::Speculative;
        if overwrote {
            warn!(
                from = %self.checked.checksum().short(),
                to = %checked.checksum().short(),
                "full state replaced speculative local state"
            );
        }

        self.replace(checked, SyncStatus::Synced);
        overwrote
    }

    pub fn on_dispatched<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnMut(&DispatchedEvent<R::Action>) + Send + 'static,
    {
        self.dispatched.subscribe(listener)
    }

    pub fn on_private_dispatched<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnMut(&PrivateDispatchedEvent<R::Action>) + Send + 'static,
    {
        self.private_dispatched.subscribe(listener)
    }

    pub fn on_updated<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnMut(&CheckedState<R::State>) + Send + 'static,
    {
        self.updated.subscribe(listener)
    }

    fn replace(&mut self, next: CheckedState<R::State>, status: SyncStatus) {
        self.checked = next;
        self.status = status;
        self.updated.notify(&self.checked);
    }
}
