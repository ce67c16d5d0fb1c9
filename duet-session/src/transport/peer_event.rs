use crate::negotiation::AttemptId;
use duet_core::{PathCandidate, TrackKind};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl From<RTCPeerConnectionState> for PathState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Connecting => PathState::Connecting,
            RTCPeerConnectionState::Connected => PathState::Connected,
            RTCPeerConnectionState::Disconnected => PathState::Disconnected,
            RTCPeerConnectionState::Failed => PathState::Failed,
            RTCPeerConnectionState::Closed => PathState::Closed,
            _ => PathState::New,
        }
    }
}

/// Events a peer connection raises for the negotiation loop.
///
/// Every event names the attempt whose connection produced it, so events from
/// a torn-down connection can be recognised and dropped.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local candidate was gathered and has to reach the remote member.
    CandidateDiscovered(AttemptId, PathCandidate),

    PathStateChanged(AttemptId, PathState),

    /// Remote media started arriving.
    RemoteTrack(AttemptId, TrackKind),
}

impl PeerEvent {
    pub fn attempt(&self) -> AttemptId {
        match self {
            PeerEvent::CandidateDiscovered(attempt, _)
            | PeerEvent::PathStateChanged(attempt, _)
            | PeerEvent::RemoteTrack(attempt, _) => *attempt,
        }
    }
}
