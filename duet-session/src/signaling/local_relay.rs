use crate::error::TransportError;
use crate::signaling::{MessagingTransport, TransportEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use duet_core::{MemberId, RoomId, TextEnvelope};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

struct Membership {
    room: RoomId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

struct RelayInner {
    app_id: String,
    /// Logged-in identities; `Some` once joined to a channel.
    members: DashMap<MemberId, Option<Membership>>,
    channels: DashMap<RoomId, Vec<MemberId>>,
    redeliver: AtomicBool,
}

/// In-process relay: channel membership broadcast and point-to-point messages.
///
/// Every participant talks to it through its own [`LocalRelayClient`].
#[derive(Clone)]
pub struct LocalRelay {
    inner: Arc<RelayInner>,
}

impl LocalRelay {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                app_id: app_id.into(),
                members: DashMap::new(),
                channels: DashMap::new(),
                redeliver: AtomicBool::new(false),
            }),
        }
    }

    pub fn client(&self) -> LocalRelayClient {
        LocalRelayClient {
            relay: self.clone(),
            identity: Mutex::new(None),
        }
    }

    /// Delivers every peer message twice, exercising at-least-once handling.
    pub fn set_redelivery(&self, enabled: bool) {
        self.inner.redeliver.store(enabled, Ordering::Relaxed);
    }

    pub fn members_of(&self, room: &RoomId) -> Vec<MemberId> {
        self.inner
            .channels
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    fn broadcast(&self, room: &RoomId, except: &MemberId, event: TransportEvent) {
        for member in self.members_of(room) {
            if &member == except {
                continue;
            }
            let Some(entry) = self.inner.members.get(&member) else {
                continue;
            };
            if let Some(membership) = entry.value() {
                let _ = membership.tx.send(event.clone());
            }
        }
    }

    fn detach(&self, identity: &MemberId) -> Result<(), TransportError> {
        let membership = {
            let mut entry = self
                .inner
                .members
                .get_mut(identity)
                .ok_or(TransportError::NotLoggedIn)?;
            entry.value_mut().take().ok_or(TransportError::NotJoined)?
        };

        if let Some(mut members) = self.inner.channels.get_mut(&membership.room) {
            members.retain(|m| m != identity);
        }
        self.inner
            .channels
            .remove_if(&membership.room, |_, members| members.is_empty());

        info!("{} left channel '{}'", identity, membership.room);
        self.broadcast(
            &membership.room,
            identity,
            TransportEvent::MemberLeft(identity.clone()),
        );
        Ok(())
    }
}

/// One participant's connection to a [`LocalRelay`].
pub struct LocalRelayClient {
    relay: LocalRelay,
    identity: Mutex<Option<MemberId>>,
}

impl LocalRelayClient {
    async fn identity(&self) -> Result<MemberId, TransportError> {
        self.identity
            .lock()
            .await
            .clone()
            .ok_or(TransportError::NotLoggedIn)
    }
}

#[async_trait]
impl MessagingTransport for LocalRelayClient {
    async fn login(&self, identity: &MemberId, token: Option<&str>) -> Result<(), TransportError> {
        let mut current = self.identity.lock().await;
        if current.is_some() {
            return Err(TransportError::IdentityInUse(identity.clone()));
        }

        let inner = &self.relay.inner;
        match inner.members.entry(identity.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(TransportError::IdentityInUse(identity.clone()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(None);
            }
        }

        debug!(
            "{} logged in to '{}' ({})",
            identity,
            inner.app_id,
            if token.is_some() { "token" } else { "anonymous" }
        );
        *current = Some(identity.clone());
        Ok(())
    }

    async fn join(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        let identity = self.identity().await?;
        let (tx, rx) = mpsc::unbounded_channel();

        if self.relay.detach(&identity).is_ok() {
            warn!("{} switched to '{}' without leaving first", identity, room);
        }

        {
            let mut entry = self
                .relay
                .inner
                .members
                .get_mut(&identity)
                .ok_or(TransportError::NotLoggedIn)?;
            *entry.value_mut() = Some(Membership {
                room: room.clone(),
                tx,
            });
        }

        self.relay
            .inner
            .channels
            .entry(room.clone())
            .or_default()
            .push(identity.clone());

        info!("{} joined channel '{}'", identity, room);
        self.relay
            .broadcast(room, &identity, TransportEvent::MemberJoined(identity.clone()));
        Ok(rx)
    }

    async fn send_to_peer(
        &self,
        to: &MemberId,
        envelope: TextEnvelope,
    ) -> Result<(), TransportError> {
        let from = self.identity().await?;
        let entry = self
            .relay
            .inner
            .members
            .get(to)
            .ok_or_else(|| TransportError::PeerUnreachable(to.clone()))?;
        let membership = entry
            .value()
            .as_ref()
            .ok_or_else(|| TransportError::PeerUnreachable(to.clone()))?;

        let copies = if self.relay.inner.redeliver.load(Ordering::Relaxed) {
            2
        } else {
            1
        };
        for _ in 0..copies {
            let event = TransportEvent::MessageFromPeer {
                from: from.clone(),
                envelope: envelope.clone(),
            };
            membership
                .tx
                .send(event)
                .map_err(|_| TransportError::PeerUnreachable(to.clone()))?;
        }
        Ok(())
    }

    async fn leave(&self) -> Result<(), TransportError> {
        let identity = self.identity().await?;
        self.relay.detach(&identity)
    }

    async fn logout(&self) -> Result<(), TransportError> {
        let mut current = self.identity.lock().await;
        let identity = current.take().ok_or(TransportError::NotLoggedIn)?;

        match self.relay.detach(&identity) {
            Ok(()) | Err(TransportError::NotJoined) => {}
            Err(e) => return Err(e),
        }
        self.relay.inner.members.remove(&identity);
        debug!("{} logged out", identity);
        Ok(())
    }
}
