//! Test doubles for the session seams and wait helpers.

#![allow(dead_code)]

mod mock_observer;
mod mock_transport;

pub use mock_capture::*;
pub use mock_observer::*;
pub use mock_peer::*;
pub use mock_transport::*;
pub use signal_helpers::*;
pub use test_participant::*;
