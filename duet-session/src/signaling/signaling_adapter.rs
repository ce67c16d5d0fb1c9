use crate::error::TransportError;
use crate::signaling::MessagingTransport;
use duet_core::{MemberId, SignalMessage, TextEnvelope};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns [`SignalMessage`]s into relay envelopes and back.
#[derive(Clone)]
pub struct SignalingAdapter {
    transport: Arc<dyn MessagingTransport>,
}

impl SignalingAdapter {
    pub fn new(transport: Arc<dyn MessagingTransport>) -> Self {
        Self { transport }
    }

    pub async fn send(&self, to: &MemberId, msg: &SignalMessage) -> Result<(), TransportError> {
        let envelope =
            TextEnvelope::encode(msg).map_err(|e| TransportError::Encode(e.to_string()))?;
        debug!("Sending {} to {}", msg.kind(), to);
        self.transport.send_to_peer(to, envelope).await
    }

    /// Undecodable envelopes are logged and dropped.
    pub fn decode(from: &MemberId, envelope: &TextEnvelope) -> Option<SignalMessage> {
        match envelope.decode() {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("Invalid signaling message from {}: {}", from, e);
                None
            }
        }
    }
}
