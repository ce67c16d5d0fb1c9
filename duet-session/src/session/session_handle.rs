use crate::error::SessionError;
use crate::media::LocalMedia;
use crate::negotiation::NegotiationState;
use crate::session::SessionCommand;
use duet_core::{MemberId, RoomId, TrackKind};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// Control surface of a running session.
///
/// Dropping the handle leaves the room as if [`leave`](Self::leave) had been
/// called, without waiting for it.
pub struct SessionHandle {
    identity: MemberId,
    room: RoomId,
    media: LocalMedia,
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<NegotiationState>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) fn new(
        identity: MemberId,
        room: RoomId,
        media: LocalMedia,
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<NegotiationState>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            identity,
            room,
            media,
            commands,
            state,
            task,
        }
    }

    pub fn local_identity(&self) -> &MemberId {
        &self.identity
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn local_media(&self) -> &LocalMedia {
        &self.media
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.state.clone()
    }

    /// Resolves once the negotiation reaches `target`.
    pub async fn wait_for_state(&self, target: NegotiationState) -> Result<(), SessionError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Ended)
    }

    /// Mutes or unmutes a local track in place; the negotiated session is
    /// untouched. Returns whether the track is now enabled.
    pub fn toggle_local_track(&self, kind: TrackKind) -> Result<bool, SessionError> {
        let enabled = self
            .media
            .toggle(kind)
            .ok_or(SessionError::TrackUnavailable(kind))?;
        info!(
            "Local {} track {}",
            kind,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(enabled)
    }

    /// Sends the current local description to the remote member again.
    /// `Ok(false)` means there was nothing to send yet.
    pub async fn resend_local_description(&self) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::ResendDescription { reply })
            .await
            .map_err(|_| SessionError::Ended)?;
        Ok(rx.await.map_err(|_| SessionError::Ended)??)
    }

    /// Leaves the channel, logs out and waits for the session loop to finish.
    pub async fn leave(self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Leave { reply })
            .await
            .map_err(|_| SessionError::Ended)?;
        let result = rx.await.map_err(|_| SessionError::Ended)?;
        let _ = self.task.await;
        Ok(result?)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
