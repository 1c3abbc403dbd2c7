//! Lockstep core data model.
//!
//! This crate defines the vocabulary shared by the master and every client:
//! - resource identifiers and their `"{type}:{id}"` store keys
//! - checked state: a state value bound to the checksum of its contents
//! - the action and reducer contract supplied by the consuming application
//! - private state patches accumulated per group on the master
//! - an ordered observer registry used for engine events
//!
//! Design stance:
//! - `CheckedState::new` is the only way to pair a state with a checksum.
//! - Checksums depend on structure only, never on map insertion order.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod action;
mod checked;
mod identifier;
mod observers;
mod patch;
mod reducer;

pub use action::{Action, CheckedAction, GenericAction};
pub use checked::{compute_checked_state, fingerprint, CheckedState, Checksum, ResourceState};
pub use identifier::{ClientId, ResourceIdentifier, ResourceIdentifierError, RESOURCE_ID_SEPARATOR};
pub use observers::{ObserverHandle, Observers};
pub use patch::{apply_patches, StatePatch};
pub use reducer::{Reducer, ReducerFn, WithReconcilePredicate};
