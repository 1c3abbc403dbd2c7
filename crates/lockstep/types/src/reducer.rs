//! The pure transition contract supplied by the consuming application.

use crate::action::{Action, CheckedAction};
use crate::checked::{CheckedState, ResourceState};
use std::marker::PhantomData;

/// A pure, total state transition.
///
/// `reduce` must return the state unchanged for actions it does not
/// recognize; it never fails.
pub trait Reducer: Send + Sync + 'static {
    type State: ResourceState;
    type Action: Action;

    fn reduce(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    /// Whether a client may apply `incoming` directly on top of `current`.
    ///
    /// Returning `false` makes the client engine leave its state alone and
    /// report that a resync from the master is required.
    fn can_reconcile_state(
        &self,
        _current: &CheckedState<Self::State>,
        _incoming: &CheckedAction<Self::Action>,
    ) -> bool {
        true
    }

    /// Whether the master should fold every private patch group into the
    /// canonical state after a public action produced `public`.
    fn should_fold_private_patches(&self, _public: &CheckedState<Self::State>) -> bool {
        false
    }

    /// Applies `action` and checksums the result.
    fn apply(
        &self,
        checked: &CheckedState<Self::State>,
        action: &Self::Action,
    ) -> CheckedState<Self::State> {
        CheckedState::new(self.reduce(checked.state(), action))
    }

    /// Overrides the reconciliation predicate of this reducer.
    fn with_reconcile_predicate<P>(self, predicate: P) -> WithReconcilePredicate<Self, P>
    where
        Self: Sized,
        P: Fn(&CheckedState<Self::State>, &CheckedAction<Self::Action>) -> bool
            + Send
            + Sync
            + 'static,
    {
        WithReconcilePredicate {
            inner: self,
            predicate,
        }
    }
}

/// A reducer backed by a plain function or closure.
pub struct ReducerFn<S, A, F> {
    reduce: F,
    _marker: PhantomData<fn(&S, &A) -> S>,
}

impl<S, A, F> ReducerFn<S, A, F>
where
    F: Fn(&S, &A) -> S,
{
    pub fn new(reduce: F) -> Self {
        Self {
            reduce,
            _marker: PhantomData,
        }
    }
}

impl<S, A, F> Reducer for ReducerFn<S, A, F>
where
    S: ResourceState,
    A: Action,
    F: Fn(&S, &A) -> S + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &S, action: &A) -> S {
        (self.reduce)(state, action)
    }
}

/// See [`Reducer::with_reconcile_predicate`].
pub struct WithReconcilePredicate<R, P> {
    inner: R,
    predicate: P,
}

impl<R, P> WithReconcilePredicate<R, P> {
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R, P> Reducer for WithReconcilePredicate<R, P>
where
    R: Reducer,
    P: Fn(&CheckedState<R::State>, &CheckedAction<R::Action>) -> bool + Send + Sync + 'static,
{
    type State = R::State;
    type Action = R::Action;

    fn reduce(&self, state: &R::State, action: &R::Action) -> R::State {
        self.inner.reduce(state, action)
    }

    fn can_reconcile_state(
        &self,
        current: &CheckedState<R::State>,
        incoming: &CheckedAction<R::Action>,
    ) -> bool {
        (self.predicate)(current, incoming)
    }

    fn should_fold_private_patches(&self, public: &CheckedState<R::State>) -> bool {
        self.inner.should_fold_private_patches(public)
    }
}
