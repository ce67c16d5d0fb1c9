use duet_core::{MemberId, TrackKind};
use std::time::Duration;
use thiserror::Error;

/// Failures that abort [`SessionController::start`](crate::SessionController::start).
///
/// Startup never leaves a partial session behind: whatever was acquired before
/// the failing step is released again.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no room identifier configured; pick a room first")]
    MissingRoom,

    #[error("local media capture unavailable: {0}")]
    CaptureUnavailable(#[from] CaptureError),

    #[error("login to the relay failed")]
    LoginFailed(#[source] TransportError),

    #[error("joining the signaling channel failed")]
    ChannelJoinFailed(#[source] TransportError),
}

/// Ends the current negotiation attempt (it moves to `Closed`), never the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("malformed session description: {0}")]
    MalformedDescription(String),

    #[error("session description rejected: {0}")]
    IncompatibleDescription(String),

    #[error("could not create a local session description: {0}")]
    DescriptionFailed(String),

    #[error("could not create a peer connection: {0}")]
    PeerConnection(String),

    #[error("path candidate rejected: {0}")]
    CandidateRejected(String),

    #[error("network path failed")]
    PathFailed,

    #[error("attempt did not connect within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("not logged in to the relay")]
    NotLoggedIn,

    #[error("not joined to a channel")]
    NotJoined,

    #[error("identity {0} is already logged in")]
    IdentityInUse(MemberId),

    #[error("peer {0} is not reachable through the relay")]
    PeerUnreachable(MemberId),

    #[error("failed to encode signaling message: {0}")]
    Encode(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("leaving the channel failed: {0}")]
    LeaveFailed(String),

    #[error("relay connection closed")]
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture device for {0}")]
    DeviceUnavailable(TrackKind),

    #[error("capture backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced through [`SessionHandle`](crate::SessionHandle).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no local {0} track")]
    TrackUnavailable(TrackKind),

    #[error("session already ended")]
    Ended,
}
