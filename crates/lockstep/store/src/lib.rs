//! Lockstep resource store.
//!
//! The store is the master's source of truth. It keeps, per resource key:
//! - the canonical checked state
//! - private patches grouped by an opaque key (conventionally a client id)
//!
//! Design stance:
//! - Every write that changes canonical state recomputes its checksum in one
//!   place, so a stored checksum always matches its state.
//! - Calls are atomic individually; read-derive-write sequences across calls
//!   are serialized by the caller (the master), not by the store.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryResourceStore;
pub use model::{StateUpdate, StoreItem};
pub use traits::ResourceStore;
