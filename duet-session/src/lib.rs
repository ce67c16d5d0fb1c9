//! Two-party call sessions: relay signaling, offer/answer negotiation and
//! the media path behind pluggable transports.

pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::*;
pub use error::*;
pub use media::*;
pub use negotiation::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
