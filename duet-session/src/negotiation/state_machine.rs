use crate::error::{NegotiationError, TransportError};
use crate::media::LocalMedia;
use crate::negotiation::attempt::{Attempt, RemoteDescription};
use crate::negotiation::step::{self, StepOutcome};
use crate::negotiation::{AttemptId, CandidateBuffer, NegotiationState, Role, local_wins_glare};
use crate::signaling::SignalingAdapter;
use crate::transport::{PathState, PeerConnectionFactory, PeerContext, PeerEvent};
use duet_core::{MemberId, PathCandidate, SdpKind, SessionDescription, SignalMessage, TrackKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Something the session layer has to hear about after the machine acted.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationReport {
    StateChanged(NegotiationState),
    Failed {
        member: MemberId,
        error: NegotiationError,
    },
    SendFailed {
        member: MemberId,
        error: TransportError,
    },
    RemoteTrack {
        member: MemberId,
        kind: TrackKind,
    },
}

/// Receivers the owning loop polls and feeds back into the machine.
pub(crate) struct NegotiationInbox {
    pub steps: mpsc::UnboundedReceiver<StepOutcome>,
    pub peer_events: mpsc::UnboundedReceiver<PeerEvent>,
}

/// Drives offer/answer exchange with at most one remote member.
///
/// Owned by a single task. Slow work (creating and applying descriptions) runs
/// on spawned tasks whose [`StepOutcome`]s come back through the inbox; every
/// outcome and every [`PeerEvent`] carries the [`AttemptId`] it belongs to and
/// is ignored unless that attempt is still the current one.
pub struct NegotiationStateMachine {
    local_id: MemberId,
    signaling: SignalingAdapter,
    factory: Arc<dyn PeerConnectionFactory>,
    media: LocalMedia,
    timeout: Option<Duration>,

    state_tx: watch::Sender<NegotiationState>,
    steps_tx: mpsc::UnboundedSender<StepOutcome>,
    peer_events_tx: mpsc::UnboundedSender<PeerEvent>,

    last_attempt: AttemptId,
    attempt: Option<Attempt>,
    /// Remote member of the latest attempt; kept while `Closed`.
    member: Option<MemberId>,
    /// Offer the latest answerer attempt was started from.
    last_offer: Option<(MemberId, String)>,
    buffer: CandidateBuffer,
    reports: Vec<NegotiationReport>,
}

impl NegotiationStateMachine {
    pub(crate) fn new(
        local_id: MemberId,
        signaling: SignalingAdapter,
        factory: Arc<dyn PeerConnectionFactory>,
        media: LocalMedia,
        timeout: Option<Duration>,
    ) -> (Self, NegotiationInbox, watch::Receiver<NegotiationState>) {
        let (state_tx, state_rx) = watch::channel(NegotiationState::Idle);
        let (steps_tx, steps) = mpsc::unbounded_channel();
        let (peer_events_tx, peer_events) = mpsc::unbounded_channel();

        let machine = Self {
            local_id,
            signaling,
            factory,
            media,
            timeout,
            state_tx,
            steps_tx,
            peer_events_tx,
            last_attempt: AttemptId(0),
            attempt: None,
            member: None,
            last_offer: None,
            buffer: CandidateBuffer::new(),
            reports: Vec::new(),
        };
        (machine, NegotiationInbox { steps, peer_events }, state_rx)
    }

    pub fn state(&self) -> NegotiationState {
        *self.state_tx.borrow()
    }

    pub fn current_member(&self) -> Option<&MemberId> {
        self.member.as_ref()
    }

    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.attempt.as_ref().map(|a| a.id)
    }

    pub fn buffered_candidates(&self) -> usize {
        self.buffer.len()
    }

    pub fn drain_reports(&mut self) -> Vec<NegotiationReport> {
        std::mem::take(&mut self.reports)
    }

    /// Starts a fresh attempt as the offerer towards `member`.
    pub async fn begin_offer(&mut self, member: MemberId) {
        self.teardown().await;
        self.buffer.clear();
        self.member = Some(member.clone());

        let Some(attempt) = self.open_attempt(member, Role::Offerer).await else {
            return;
        };
        let id = attempt.id;
        let pc = attempt.pc.clone();
        self.attempt = Some(attempt);
        self.set_state(NegotiationState::AwaitingLocalOffer);
        self.arm_deadline();

        let tx = self.steps_tx.clone();
        tokio::spawn(async move {
            let result = step::create_local_offer(pc).await;
            let _ = tx.send(StepOutcome::OfferCreated {
                attempt: id,
                result,
            });
        });
    }

    async fn begin_answer(&mut self, member: MemberId, offer: SessionDescription) {
        self.teardown().await;
        self.buffer.retain_for(&member);
        self.member = Some(member.clone());
        self.last_offer = Some((member.clone(), offer.sdp.clone()));

        let Some(mut attempt) = self.open_attempt(member, Role::Answerer).await else {
            return;
        };
        attempt.remote = RemoteDescription::Applying;
        attempt.remote_ufrag = offer.ice_ufrag().map(str::to_owned);
        let id = attempt.id;
        let pc = attempt.pc.clone();
        self.attempt = Some(attempt);
        self.set_state(NegotiationState::AwaitingRemoteOffer);
        self.arm_deadline();

        let tx = self.steps_tx.clone();
        tokio::spawn(async move {
            let result = step::apply_remote(pc, offer).await;
            let _ = tx.send(StepOutcome::RemoteOfferApplied {
                attempt: id,
                result,
            });
        });
    }

    /// Creates the connection for a new attempt. A factory failure closes the
    /// attempt before it ever becomes current.
    async fn open_attempt(&mut self, member: MemberId, role: Role) -> Option<Attempt> {
        let id = self.last_attempt.next();
        self.last_attempt = id;
        info!("Starting attempt {} with {} as {:?}", id, member, role);

        let ctx = PeerContext {
            attempt: id,
            member: member.clone(),
            media: self.media.clone(),
            events: self.peer_events_tx.clone(),
        };
        match self.factory.create(ctx).await {
            Ok(pc) => Some(Attempt::new(id, member, role, pc)),
            Err(e) => {
                error!("Peer connection for {} failed: {}", member, e);
                self.set_state(NegotiationState::Closed);
                self.buffer.clear();
                self.reports.push(NegotiationReport::Failed { member, error: e });
                None
            }
        }
    }

    fn arm_deadline(&mut self) {
        let (Some(timeout), Some(attempt)) = (self.timeout, self.attempt.as_mut()) else {
            return;
        };
        let id = attempt.id;
        let tx = self.steps_tx.clone();
        attempt.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(StepOutcome::DeadlineElapsed { attempt: id });
        }));
    }

    /// Routes one decoded message from `from`.
    pub async fn handle_signal(&mut self, from: MemberId, msg: SignalMessage) {
        debug!("Received {} from {} in {}", msg.kind(), from, self.state());
        match msg {
            SignalMessage::Offer { offer } => self.on_offer(from, offer).await,
            SignalMessage::Answer { answer } => self.on_answer(from, answer).await,
            SignalMessage::Candidate { candidate } => self.on_candidate(from, candidate).await,
        }
    }

    async fn on_offer(&mut self, from: MemberId, offer: SessionDescription) {
        if offer.kind != SdpKind::Offer {
            warn!("Offer message from {} carries an {:?}", from, offer.kind);
            return;
        }
        if self.last_offer.as_ref() == Some(&(from.clone(), offer.sdp.clone())) {
            debug!("Duplicate offer from {} ignored", from);
            return;
        }

        if let Some(attempt) = self.active_attempt() {
            if attempt.member != from {
                warn!(
                    "Offer from {} ignored, negotiating with {}",
                    from, attempt.member
                );
                return;
            }
            if attempt.role == Role::Offerer {
                if attempt.remote != RemoteDescription::Unset {
                    debug!("Late offer from {} ignored, answer already in", from);
                    return;
                }
                if local_wins_glare(&self.local_id, &from) {
                    info!("Offer collision with {}: keeping our offer", from);
                    return;
                }
                info!("Offer collision with {}: answering theirs", from);
            } else {
                info!("{} restarted negotiation", from);
            }
        }

        self.begin_answer(from, offer).await;
    }

    async fn on_answer(&mut self, from: MemberId, answer: SessionDescription) {
        if answer.kind != SdpKind::Answer {
            warn!("Answer message from {} carries an {:?}", from, answer.kind);
            return;
        }
        let state = self.state();
        let tx = self.steps_tx.clone();
        let Some(attempt) = self.active_attempt_mut() else {
            debug!("Answer from {} without an attempt ignored", from);
            return;
        };
        if attempt.member != from || attempt.role != Role::Offerer {
            debug!("Unexpected answer from {} ignored", from);
            return;
        }
        if attempt.remote != RemoteDescription::Unset {
            debug!("Duplicate answer from {} ignored", from);
            return;
        }
        if state != NegotiationState::AwaitingRemoteAnswer {
            debug!("Answer from {} arrived in {} and was ignored", from, state);
            return;
        }

        attempt.remote = RemoteDescription::Applying;
        attempt.remote_ufrag = answer.ice_ufrag().map(str::to_owned);
        let id = attempt.id;
        let pc = attempt.pc.clone();
        tokio::spawn(async move {
            let result = step::apply_remote(pc, answer).await;
            let _ = tx.send(StepOutcome::RemoteAnswerApplied {
                attempt: id,
                result,
            });
        });
    }

    async fn on_candidate(&mut self, from: MemberId, candidate: PathCandidate) {
        let Some(attempt) = self.active_attempt() else {
            debug!("Holding candidate from {} until its offer arrives", from);
            self.buffer.enqueue(&from, candidate);
            return;
        };
        if attempt.member != from {
            debug!(
                "Candidate from {} ignored, negotiating with {}",
                from, attempt.member
            );
            return;
        }
        let remote = attempt.remote;
        let pc = attempt.pc.clone();
        let ufrag = attempt.remote_ufrag.clone();

        if remote != RemoteDescription::Set {
            self.buffer.enqueue(&from, candidate);
            return;
        }
        if let Some(ufrag) = ufrag.as_deref()
            && !candidate.matches_ufrag(ufrag)
        {
            debug!("Candidate from {} belongs to an earlier ICE session", from);
            return;
        }
        if let Err(e) = pc.add_candidate(candidate).await {
            warn!("Candidate from {} rejected: {}", from, e);
        }
    }

    /// Feeds the result of a spawned step back into the machine.
    pub(crate) async fn handle_step(&mut self, outcome: StepOutcome) {
        if !self.is_current(outcome.attempt()) {
            debug!("Stale step for attempt {} ignored", outcome.attempt());
            return;
        }

        match outcome {
            StepOutcome::OfferCreated { result, .. } => match result {
                Ok(offer) => {
                    self.set_state(NegotiationState::AwaitingRemoteAnswer);
                    self.publish_local(offer).await;
                }
                Err(e) => self.fail(e).await,
            },

            StepOutcome::RemoteOfferApplied { attempt, result } => match result {
                Ok(()) => {
                    self.remote_applied().await;
                    let Some(pc) = self.attempt.as_ref().map(|a| a.pc.clone()) else {
                        return;
                    };
                    let tx = self.steps_tx.clone();
                    tokio::spawn(async move {
                        let result = step::create_local_answer(pc).await;
                        let _ = tx.send(StepOutcome::AnswerCreated { attempt, result });
                    });
                }
                Err(e) => self.fail(e).await,
            },

            StepOutcome::AnswerCreated { result, .. } => match result {
                Ok(answer) => self.publish_local(answer).await,
                Err(e) => self.fail(e).await,
            },

            StepOutcome::RemoteAnswerApplied { result, .. } => match result {
                Ok(()) => self.remote_applied().await,
                Err(e) => self.fail(e).await,
            },

            StepOutcome::DeadlineElapsed { .. } => {
                if self.state() != NegotiationState::Connected {
                    let timeout = self.timeout.unwrap_or_default();
                    self.fail(NegotiationError::Timeout(timeout)).await;
                }
            }
        }
    }

    /// Marks the remote description as set and applies what was buffered for it.
    async fn remote_applied(&mut self) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        attempt.remote = RemoteDescription::Set;
        let pc = attempt.pc.clone();
        let member = attempt.member.clone();
        let ufrag = attempt.remote_ufrag.clone();

        self.buffer.retain_for(&member);
        if !self.buffer.is_empty() {
            let applied = self
                .buffer
                .drain_into(pc.as_ref(), ufrag.as_deref())
                .await;
            debug!("Applied {} buffered candidates from {}", applied, member);
        }
    }

    /// Sends the local description, then every candidate gathered before it.
    async fn publish_local(&mut self, desc: SessionDescription) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        attempt.local = Some(desc.clone());
        let outbound = std::mem::take(&mut attempt.outbound);
        let member = attempt.member.clone();

        let msg = match desc.kind {
            SdpKind::Offer => SignalMessage::Offer { offer: desc },
            SdpKind::Answer => SignalMessage::Answer { answer: desc },
        };
        self.send(&member, msg).await;
        for candidate in outbound {
            self.send(&member, SignalMessage::Candidate { candidate }).await;
        }
    }

    async fn send(&mut self, member: &MemberId, msg: SignalMessage) {
        if let Err(e) = self.signaling.send(member, &msg).await {
            warn!("Sending {} to {} failed: {}", msg.kind(), member, e);
            self.reports.push(NegotiationReport::SendFailed {
                member: member.clone(),
                error: e,
            });
        }
    }

    pub(crate) async fn handle_peer_event(&mut self, event: PeerEvent) {
        if !self.is_current(event.attempt()) {
            debug!("Event for stale attempt {} ignored", event.attempt());
            return;
        }

        match event {
            PeerEvent::CandidateDiscovered(_, candidate) => {
                let Some(attempt) = self.attempt.as_mut() else {
                    return;
                };
                if attempt.local.is_none() {
                    attempt.outbound.push(candidate);
                    return;
                }
                let member = attempt.member.clone();
                self.send(&member, SignalMessage::Candidate { candidate })
                    .await;
            }

            PeerEvent::PathStateChanged(_, path) => match path {
                PathState::Connected => {
                    if let Some(attempt) = self.attempt.as_mut() {
                        attempt.cancel_deadline();
                        info!("Connected to {} ({})", attempt.member, attempt.id);
                    }
                    self.set_state(NegotiationState::Connected);
                }
                PathState::Failed => self.fail(NegotiationError::PathFailed).await,
                PathState::Disconnected => warn!("Path to the remote member dropped"),
                other => debug!("Path state {:?}", other),
            },

            PeerEvent::RemoteTrack(_, kind) => {
                if let Some(member) = self.member.clone() {
                    self.reports
                        .push(NegotiationReport::RemoteTrack { member, kind });
                }
            }
        }
    }

    /// Sends the current attempt's local description again. Returns `false`
    /// when none has been produced yet.
    pub async fn resend_local_description(&mut self) -> Result<bool, TransportError> {
        let Some(attempt) = self.attempt.as_ref() else {
            return Ok(false);
        };
        let Some(desc) = attempt.local.clone() else {
            return Ok(false);
        };
        let msg = match desc.kind {
            SdpKind::Offer => SignalMessage::Offer { offer: desc },
            SdpKind::Answer => SignalMessage::Answer { answer: desc },
        };
        info!("Resending {} to {}", msg.kind(), attempt.member);
        self.signaling.send(&attempt.member, &msg).await?;
        Ok(true)
    }

    /// Drops the attempt (if any) and returns to `Idle`.
    pub async fn reset(&mut self) {
        self.teardown().await;
        self.buffer.clear();
        self.member = None;
        self.last_offer = None;
        self.set_state(NegotiationState::Idle);
    }

    /// Forgets candidates held for a member that went away.
    pub fn discard_candidates_from(&mut self, member: &MemberId) {
        if self.buffer.owner() == Some(member) {
            self.buffer.clear();
        }
    }

    /// Closes the current attempt and reports `error`. Not retried.
    pub async fn fail(&mut self, error: NegotiationError) {
        let member = self.attempt.as_ref().map(|a| a.member.clone());
        error!("Negotiation with {:?} failed: {}", member, error);

        self.teardown().await;
        self.buffer.clear();
        self.set_state(NegotiationState::Closed);
        if let Some(member) = member {
            self.reports.push(NegotiationReport::Failed { member, error });
        }
    }

    async fn teardown(&mut self) {
        let Some(attempt) = self.attempt.take() else {
            return;
        };
        debug!("Tearing down attempt {} with {}", attempt.id, attempt.member);
        if let Err(e) = attempt.pc.close().await {
            warn!("Closing connection of attempt {}: {}", attempt.id, e);
        }
    }

    fn is_current(&self, id: AttemptId) -> bool {
        self.state().is_active() && self.current_attempt() == Some(id)
    }

    fn active_attempt(&self) -> Option<&Attempt> {
        if self.state().is_active() {
            self.attempt.as_ref()
        } else {
            None
        }
    }

    fn active_attempt_mut(&mut self) -> Option<&mut Attempt> {
        if self.state().is_active() {
            self.attempt.as_mut()
        } else {
            None
        }
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state() == state {
            return;
        }
        debug!("Negotiation state {} -> {}", self.state(), state);
        self.state_tx.send_replace(state);
        self.reports.push(NegotiationReport::StateChanged(state));
    }
}
