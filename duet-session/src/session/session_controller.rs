use crate::config::SessionConfig;
use crate::error::{StartupError, TransportError};
use crate::media::MediaCapture;
use crate::negotiation::{NegotiationInbox, NegotiationReport, NegotiationStateMachine};
use crate::session::{Layout, Session, SessionCommand, SessionHandle, SessionObserver};
use crate::signaling::{MessagingTransport, SignalingAdapter, TransportEvent};
use crate::transport::PeerConnectionFactory;
use duet_core::MemberId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The collaborators a session is wired to.
#[derive(Clone)]
pub struct SessionServices {
    pub transport: Arc<dyn MessagingTransport>,
    pub capture: Arc<dyn MediaCapture>,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub observer: Arc<dyn SessionObserver>,
}

/// Session loop: reacts to membership changes, routes signaling messages into
/// the negotiation state machine and serves [`SessionHandle`] commands.
pub struct SessionController {
    session: Session,
    machine: NegotiationStateMachine,
    inbox: NegotiationInbox,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    commands: mpsc::Receiver<SessionCommand>,
    observer: Arc<dyn SessionObserver>,
    layout: Layout,
}

impl SessionController {
    /// Opens the session and spawns its loop.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn start(
        config: SessionConfig,
        services: SessionServices,
    ) -> Result<SessionHandle, StartupError> {
        let SessionServices {
            transport,
            capture,
            peers,
            observer,
        } = services;

        let (session, events) = Session::open(&config, transport.clone(), capture).await?;

        let (machine, inbox, state) = NegotiationStateMachine::new(
            session.identity().clone(),
            SignalingAdapter::new(transport),
            peers,
            session.media().clone(),
            config.negotiation_timeout(),
        );
        let (commands_tx, commands) = mpsc::channel(32);

        let identity = session.identity().clone();
        let room = session.room().clone();
        let media = session.media().clone();

        let controller = Self {
            session,
            machine,
            inbox,
            events,
            commands,
            observer,
            layout: Layout::Solo,
        };
        let task = tokio::spawn(controller.run());

        Ok(SessionHandle::new(
            identity,
            room,
            media,
            commands_tx,
            state,
            task,
        ))
    }

    async fn run(mut self) {
        info!(
            "Session loop for {} in '{}' started",
            self.session.identity(),
            self.session.room()
        );

        let mut leave_reply = None;
        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Leave { reply }) => {
                            leave_reply = Some(reply);
                            break;
                        }
                        Some(SessionCommand::ResendDescription { reply }) => {
                            let result = self.machine.resend_local_description().await;
                            if let Err(e) = &result {
                                self.observer.on_transport_error(e).await;
                            }
                            let _ = reply.send(result);
                        }
                        None => {
                            info!("Session handle dropped. Leaving.");
                            break;
                        }
                    }
                }

                evt = self.events.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Relay stream closed. Ending session.");
                            self.observer.on_transport_error(&TransportError::Closed).await;
                            break;
                        }
                    }
                }

                Some(step) = self.inbox.steps.recv() => {
                    self.machine.handle_step(step).await;
                }

                Some(evt) = self.inbox.peer_events.recv() => {
                    self.machine.handle_peer_event(evt).await;
                }
            }

            self.publish().await;
        }

        let result = self.shutdown().await;
        if let Some(reply) = leave_reply {
            let _ = reply.send(result);
        }
        info!("Session loop finished");
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::MemberJoined(member) => self.on_member_joined(member).await,
            TransportEvent::MemberLeft(member) => self.on_member_left(member).await,
            TransportEvent::MessageFromPeer { from, envelope } => {
                if let Some(msg) = SignalingAdapter::decode(&from, &envelope) {
                    self.machine.handle_signal(from, msg).await;
                }
            }
        }
    }

    async fn on_member_joined(&mut self, member: MemberId) {
        if self.machine.state().is_active() {
            info!(
                "{} joined while negotiating with {:?}; ignored",
                member,
                self.machine.current_member()
            );
            return;
        }
        info!("{} joined. Calling them.", member);
        self.machine.begin_offer(member).await;
    }

    async fn on_member_left(&mut self, member: MemberId) {
        if self.machine.current_member() == Some(&member) {
            info!("{} left. Hanging up.", member);
            self.machine.reset().await;
        } else {
            debug!("{} left", member);
            self.machine.discard_candidates_from(&member);
        }
    }

    /// Forwards what the machine reported to the observer and updates the layout.
    async fn publish(&mut self) {
        for report in self.machine.drain_reports() {
            match report {
                NegotiationReport::StateChanged(state) => {
                    self.observer.on_state_change(state).await;
                }
                NegotiationReport::Failed { member, error } => {
                    self.observer.on_negotiation_failed(&member, &error).await;
                }
                NegotiationReport::SendFailed { error, .. } => {
                    self.observer.on_transport_error(&error).await;
                }
                NegotiationReport::RemoteTrack { member, kind } => {
                    self.observer.on_remote_track(&member, kind).await;
                }
            }
        }

        let layout = match self.machine.current_member() {
            Some(remote) => Layout::Pair {
                remote: remote.clone(),
            },
            None => Layout::Solo,
        };
        if layout != self.layout {
            self.layout = layout.clone();
            self.observer.on_layout_change(layout).await;
        }
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.machine.reset().await;
        self.publish().await;

        let result = self.session.close().await;
        if let Err(e) = &result {
            warn!("Leaving the room failed: {}", e);
            self.observer.on_transport_error(e).await;
        }
        self.observer.on_session_ended().await;
        result
    }
}
