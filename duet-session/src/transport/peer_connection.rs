use crate::error::NegotiationError;
use crate::media::LocalMedia;
use crate::negotiation::AttemptId;
use crate::transport::PeerEvent;
use async_trait::async_trait;
use duet_core::{MemberId, PathCandidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One negotiation attempt's connection to the remote member.
///
/// Implementations must be safe to call concurrently: description steps run
/// on spawned tasks while candidates are added from the session loop.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: SessionDescription)
    -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_candidate(&self, candidate: PathCandidate) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

/// What a factory needs to build a connection for one attempt.
pub struct PeerContext {
    pub attempt: AttemptId,
    pub member: MemberId,
    pub media: LocalMedia,
    pub events: mpsc::UnboundedSender<PeerEvent>,
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(&self, ctx: PeerContext) -> Result<Arc<dyn PeerConnection>, NegotiationError>;
}
