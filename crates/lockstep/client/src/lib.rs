//! Lockstep client resource engine.
//!
//! One engine per `(client, resource)`. Local dispatches apply immediately
//! and are published to listeners for the transport to carry to the master;
//! actions forwarded back by the master are reconciled by checksum.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod engine;
mod error;
mod events;

pub use engine::{ClientResource, ReconcileOutcome, SyncStatus};
pub use error::{ReconcileError, ReconcileResult};
pub use events::{DispatchedEvent, PrivateDispatchedEvent};
