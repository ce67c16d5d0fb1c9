use crate::error::{NegotiationError, TransportError};
use crate::negotiation::NegotiationState;
use async_trait::async_trait;
use duet_core::{MemberId, TrackKind};

/// How many participants the UI should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Solo,
    Pair { remote: MemberId },
}

/// Application hooks called from the session loop.
///
/// Calls are made in order from a single task; a slow observer delays the
/// negotiation behind it.
#[async_trait]
pub trait SessionObserver: Send + Sync + 'static {
    async fn on_layout_change(&self, layout: Layout);

    async fn on_state_change(&self, _state: NegotiationState) {}

    async fn on_negotiation_failed(&self, _member: &MemberId, _error: &NegotiationError) {}

    async fn on_transport_error(&self, _error: &TransportError) {}

    async fn on_remote_track(&self, _member: &MemberId, _kind: TrackKind) {}

    async fn on_session_ended(&self) {}
}
