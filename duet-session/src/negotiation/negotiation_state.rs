use std::fmt;

/// Where the current negotiation attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    /// Offerer: the connection exists and the local offer is being produced.
    AwaitingLocalOffer,
    /// Offerer: the offer went out, waiting for the answer.
    AwaitingRemoteAnswer,
    /// Answerer: applying the remote offer and answering it, until the path connects.
    AwaitingRemoteOffer,
    Connected,
    /// The attempt failed; nothing more happens until the member leaves or rejoins.
    Closed,
}

impl NegotiationState {
    /// States in which an attempt owns a live peer connection.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            NegotiationState::AwaitingLocalOffer
                | NegotiationState::AwaitingRemoteAnswer
                | NegotiationState::AwaitingRemoteOffer
                | NegotiationState::Connected
        )
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Idle => "idle",
            NegotiationState::AwaitingLocalOffer => "awaiting-local-offer",
            NegotiationState::AwaitingRemoteAnswer => "awaiting-remote-answer",
            NegotiationState::AwaitingRemoteOffer => "awaiting-remote-offer",
            NegotiationState::Connected => "connected",
            NegotiationState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Identity of one negotiation attempt. Strictly increasing per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(pub u64);

impl AttemptId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}
