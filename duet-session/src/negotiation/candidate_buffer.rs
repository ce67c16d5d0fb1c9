use crate::transport::PeerConnection;
use duet_core::{MemberId, PathCandidate};
use tracing::{debug, warn};

/// Remote path candidates that arrived before a remote description was set.
///
/// All buffered candidates come from one member. A candidate from someone else
/// replaces the contents: only one remote member is ever negotiated with.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    owner: Option<MemberId>,
    pending: Vec<PathCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, from: &MemberId, candidate: PathCandidate) {
        if self.owner.as_ref() != Some(from) {
            if !self.pending.is_empty() {
                debug!(
                    "Dropping {} buffered candidates from {:?}, {} took over",
                    self.pending.len(),
                    self.owner,
                    from
                );
            }
            self.pending.clear();
            self.owner = Some(from.clone());
        }
        self.pending.push(candidate);
    }

    /// Applies every buffered candidate in arrival order and empties the buffer.
    ///
    /// With a `ufrag`, candidates tagged for another ICE session are dropped
    /// unapplied. A candidate the connection rejects is logged and skipped;
    /// the rest are still applied. Returns how many were accepted.
    pub async fn drain_into(&mut self, pc: &dyn PeerConnection, ufrag: Option<&str>) -> usize {
        let pending = std::mem::take(&mut self.pending);
        self.owner = None;

        let mut applied = 0;
        for candidate in pending {
            if ufrag.is_some_and(|u| !candidate.matches_ufrag(u)) {
                debug!(
                    "Dropping candidate of an earlier ICE session: {}",
                    candidate.candidate
                );
                continue;
            }
            match pc.add_candidate(candidate).await {
                Ok(()) => applied += 1,
                Err(e) => warn!("Buffered candidate rejected: {}", e),
            }
        }
        applied
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.owner = None;
    }

    /// Keeps the contents only if they came from `member`.
    pub fn retain_for(&mut self, member: &MemberId) {
        if self.owner.as_ref() != Some(member) {
            self.clear();
        }
    }

    pub fn owner(&self) -> Option<&MemberId> {
        self.owner.as_ref()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
