use async_trait::async_trait;
use duet_core::{MemberId, RoomId, TextEnvelope};
use duet_session::{LocalRelayClient, MessagingTransport, TransportError, TransportEvent};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Relay client wrapper that can refuse login, join or sends, and counts logouts.
pub struct FlakyTransport {
    inner: LocalRelayClient,
    fail_login: bool,
    fail_join: bool,
    fail_sends: AtomicBool,
    logged_in: AtomicBool,
    logouts: AtomicUsize,
}

impl FlakyTransport {
    pub fn new(inner: LocalRelayClient) -> Self {
        Self {
            inner,
            fail_login: false,
            fail_join: false,
            fail_sends: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
            logouts: AtomicUsize::new(0),
        }
    }

    pub fn failing_login(inner: LocalRelayClient) -> Self {
        Self {
            fail_login: true,
            ..Self::new(inner)
        }
    }

    pub fn failing_join(inner: LocalRelayClient) -> Self {
        Self {
            fail_join: true,
            ..Self::new(inner)
        }
    }

    /// While set, every `send_to_peer` fails without reaching the relay.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingTransport for FlakyTransport {
    async fn login(&self, identity: &MemberId, token: Option<&str>) -> Result<(), TransportError> {
        if self.fail_login {
            return Err(TransportError::IdentityInUse(identity.clone()));
        }
        self.inner.login(identity, token).await?;
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn join(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        if self.fail_join {
            return Err(TransportError::NotJoined);
        }
        self.inner.join(room).await
    }

    async fn send_to_peer(
        &self,
        to: &MemberId,
        envelope: TextEnvelope,
    ) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("relay offline".into()));
        }
        self.inner.send_to_peer(to, envelope).await
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.inner.leave().await
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.inner.logout().await?;
        self.logged_in.store(false, Ordering::SeqCst);
        Ok(())
    }
}
