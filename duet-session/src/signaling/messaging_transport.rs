use crate::error::TransportError;
use async_trait::async_trait;
use duet_core::{MemberId, RoomId, TextEnvelope};
use tokio::sync::mpsc;

/// What the relay delivers to a joined member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    MemberJoined(MemberId),
    MemberLeft(MemberId),
    MessageFromPeer {
        from: MemberId,
        envelope: TextEnvelope,
    },
}

/// Relayed channel membership plus point-to-point text messages.
///
/// Delivery is at-least-once and not ordered relative to other senders; the
/// negotiation layer tolerates duplicates and reordering.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// `token` is `None` for anonymous logins.
    async fn login(&self, identity: &MemberId, token: Option<&str>) -> Result<(), TransportError>;

    /// Joins the channel. Membership changes of *other* members and messages
    /// addressed to us arrive on the returned stream until `leave`.
    async fn join(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError>;

    async fn send_to_peer(
        &self,
        to: &MemberId,
        envelope: TextEnvelope,
    ) -> Result<(), TransportError>;

    async fn leave(&self) -> Result<(), TransportError>;

    async fn logout(&self) -> Result<(), TransportError>;
}
