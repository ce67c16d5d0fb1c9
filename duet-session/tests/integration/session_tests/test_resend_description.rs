use std::sync::Arc;

use duet_core::RoomId;
use duet_session::{
    LocalRelay, NegotiationState, SessionConfig, SessionController, SessionServices,
    TransportError,
};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{
    FlakyTransport, MockBehavior, MockCapture, MockPeerFactory, NEGOTIATION_TIMEOUT_MS, PeerCall,
    QUIET_WINDOW_MS, RecordingObserver, SIGNAL_TIMEOUT_MS, TestParticipant, wait_for_state,
};

#[tokio::test]
async fn test_resend_repeats_the_same_offer() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("resend");
    let peers = MockPeerFactory::new(MockBehavior::silent());
    let observer = RecordingObserver::new();

    let session = start_test_session(&relay, "1", &room, &peers, &observer)
        .await
        .unwrap();

    // Nothing negotiated yet.
    assert!(!session.resend_local_description().await.unwrap());

    let mut remote = TestParticipant::join(&relay, "2", &room).await.unwrap();
    let (_, first) = remote.expect_offer(SIGNAL_TIMEOUT_MS).await.unwrap();

    assert!(session.resend_local_description().await.unwrap());
    let (_, again) = remote.expect_offer(SIGNAL_TIMEOUT_MS).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(peers.connections().len(), 1);
    let creates = peers
        .latest()
        .unwrap()
        .calls()
        .iter()
        .filter(|c| matches!(c, PeerCall::CreateOffer))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_failed_send_keeps_the_offer_for_resend() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("send-failure");
    let peers = MockPeerFactory::new(MockBehavior::silent());
    let observer = RecordingObserver::new();
    let transport = Arc::new(FlakyTransport::new(relay.client()));

    let services = SessionServices {
        transport: transport.clone(),
        capture: Arc::new(MockCapture::working()),
        peers: Arc::new(peers.clone()),
        observer: Arc::new(observer.clone()),
    };
    let session = SessionController::start(
        SessionConfig::new(room.clone()).with_identity("1"),
        services,
    )
    .await
    .unwrap();

    transport.set_fail_sends(true);
    let mut remote = TestParticipant::join(&relay, "2", &room).await.unwrap();

    wait_for_state(&session, NegotiationState::AwaitingRemoteAnswer, NEGOTIATION_TIMEOUT_MS)
        .await
        .unwrap();
    assert!(
        observer
            .wait_for(NEGOTIATION_TIMEOUT_MS, |events| {
                events.iter().any(|e| {
                    matches!(
                        e,
                        crate::utils::ObservedEvent::Transport(TransportError::SendFailed(_))
                    )
                })
            })
            .await
    );
    assert!(remote.drain_signals(QUIET_WINDOW_MS).await.is_empty());
    // Nothing rolled back.
    assert_eq!(session.state(), NegotiationState::AwaitingRemoteAnswer);

    transport.set_fail_sends(false);
    assert!(session.resend_local_description().await.unwrap());
    let (_, offer) = remote.expect_offer(SIGNAL_TIMEOUT_MS).await.unwrap();

    let pc = peers.latest().unwrap();
    assert_eq!(offer.sdp, format!("v=0 mock 0 {} {}", pc.member, pc.attempt));
    assert_eq!(peers.connections().len(), 1);
    let creates = pc
        .calls()
        .iter()
        .filter(|c| matches!(c, PeerCall::CreateOffer))
        .count();
    assert_eq!(creates, 1);
    assert_eq!(session.state(), NegotiationState::AwaitingRemoteAnswer);
}
