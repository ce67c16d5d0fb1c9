use crate::config::SessionConfig;
use crate::error::{StartupError, TransportError};
use crate::media::{LocalMedia, MediaCapture};
use crate::signaling::{MessagingTransport, TransportEvent};
use duet_core::{MemberId, RoomId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Resources held for the lifetime of one call: the captured media and the
/// relay login plus channel membership.
pub struct Session {
    identity: MemberId,
    room: RoomId,
    media: LocalMedia,
    transport: Arc<dyn MessagingTransport>,
    capture: Arc<dyn MediaCapture>,
}

impl Session {
    /// Captures media, logs in and joins the room, in that order. On failure
    /// everything acquired so far is given back.
    pub(crate) async fn open(
        config: &SessionConfig,
        transport: Arc<dyn MessagingTransport>,
        capture: Arc<dyn MediaCapture>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), StartupError> {
        let room = config.room()?.clone();
        let identity = config.local_identity.clone();

        let media = capture.acquire(&config.capture).await?;

        if let Err(e) = transport.login(&identity, config.token.as_deref()).await {
            capture.release(&media).await;
            return Err(StartupError::LoginFailed(e));
        }

        let events = match transport.join(&room).await {
            Ok(events) => events,
            Err(e) => {
                if let Err(logout) = transport.logout().await {
                    warn!("Logout after failed join: {}", logout);
                }
                capture.release(&media).await;
                return Err(StartupError::ChannelJoinFailed(e));
            }
        };

        info!("{} joined room '{}'", identity, room);
        let session = Self {
            identity,
            room,
            media,
            transport,
            capture,
        };
        Ok((session, events))
    }

    pub fn identity(&self) -> &MemberId {
        &self.identity
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn media(&self) -> &LocalMedia {
        &self.media
    }

    /// Leaves the channel, logs out and releases capture. Every step runs even
    /// if an earlier one fails; the first error is returned.
    pub(crate) async fn close(&self) -> Result<(), TransportError> {
        let left = self
            .transport
            .leave()
            .await
            .map_err(|e| TransportError::LeaveFailed(e.to_string()));
        let logged_out = self.transport.logout().await;
        self.capture.release(&self.media).await;
        info!("{} left room '{}'", self.identity, self.room);
        left.and(logged_out)
    }
}
