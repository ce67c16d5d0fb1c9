use crate::negotiation::{AttemptId, Role};
use crate::transport::PeerConnection;
use duet_core::{MemberId, PathCandidate, SessionDescription};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Progress of the remote description on the attempt's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteDescription {
    Unset,
    Applying,
    Set,
}

/// Everything owned by one negotiation attempt. Dropped as a unit on teardown.
pub(crate) struct Attempt {
    pub id: AttemptId,
    pub member: MemberId,
    pub role: Role,
    pub pc: Arc<dyn PeerConnection>,
    pub remote: RemoteDescription,
    /// ICE ufrag of the remote description being applied.
    pub remote_ufrag: Option<String>,
    /// Local description once it has been handed to the relay.
    pub local: Option<SessionDescription>,
    /// Local candidates gathered before `local` went out.
    pub outbound: Vec<PathCandidate>,
    pub deadline: Option<JoinHandle<()>>,
}

impl Attempt {
    pub fn new(id: AttemptId, member: MemberId, role: Role, pc: Arc<dyn PeerConnection>) -> Self {
        Self {
            id,
            member,
            role,
            pc,
            remote: RemoteDescription::Unset,
            remote_ufrag: None,
            local: None,
            outbound: Vec::new(),
            deadline: None,
        }
    }

    pub fn cancel_deadline(&mut self) {
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        self.cancel_deadline();
    }
}
