//! Test support for lockstep.
//!
//! - [`CounterReducer`]: the minimal public-only reducer
//! - [`GameReducer`]: private move submission with an optional reveal
//! - [`MasterEnv`]: master plus loopback clients, standing in for a transport

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod counter;
pub mod env;
pub mod game;

pub use counter::{CounterAction, CounterReducer, CounterState};
pub use env::{MasterClient, MasterEnv};
pub use game::{Color, GameAction, GameReducer, GameState, PlayerSubmission, Submission, SubmissionStatus};
