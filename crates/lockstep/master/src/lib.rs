//! Lockstep master orchestrator.
//!
//! The master is the single authority for each resource. For every inbound
//! action it:
//! - serializes application per resource identifier
//! - writes public actions to canonical state, private ones to the sender's
//!   patch group
//! - addresses one checked forward per recipient, carrying the checksum of
//!   the state that recipient will see

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod config;
mod error;
mod master;

pub use config::MasterConfig;
pub use error::{MasterError, MasterResult};
pub use master::{ActionOutcome, Forward, MasterResource};
