use std::sync::Arc;

use duet_core::RoomId;
use duet_session::{
    LocalRelay, MessagingTransport, SessionConfig, SessionController, SessionServices,
    TransportError, TransportEvent,
};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{
    FlakyTransport, MockBehavior, MockCapture, MockPeerFactory, NEGOTIATION_TIMEOUT_MS,
    ObservedEvent, RecordingObserver, SIGNAL_TIMEOUT_MS, TestParticipant, eventually,
};

#[tokio::test]
async fn test_dropping_the_handle_leaves_the_room() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("drop");
    let peers = MockPeerFactory::new(MockBehavior::silent());
    let observer = RecordingObserver::new();

    let session = start_test_session(&relay, "1", &room, &peers, &observer)
        .await
        .unwrap();
    let identity = session.local_identity().clone();

    let mut remote = TestParticipant::join(&relay, "2", &room).await.unwrap();
    remote.expect_offer(SIGNAL_TIMEOUT_MS).await.unwrap();

    drop(session);

    loop {
        match remote.next_event(SIGNAL_TIMEOUT_MS).await.unwrap() {
            TransportEvent::MemberLeft(id) => {
                assert_eq!(id, identity);
                break;
            }
            _ => continue,
        }
    }

    assert!(
        observer
            .wait_for(NEGOTIATION_TIMEOUT_MS, |events| events
                .contains(&ObservedEvent::Ended))
            .await
    );
    assert!(eventually(NEGOTIATION_TIMEOUT_MS, || peers.live() == 0).await);
    assert_eq!(relay.members_of(&room), vec![remote.id.clone()]);
}

#[tokio::test]
async fn test_leave_reports_session_end() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("leave");
    let peers = MockPeerFactory::new(MockBehavior::silent());
    let observer = RecordingObserver::new();

    let session = start_test_session(&relay, "1", &room, &peers, &observer)
        .await
        .unwrap();
    session.leave().await.expect("leave failed");

    assert!(observer.has_ended().await);
    assert!(observer.transport_errors().await.is_empty());
    assert!(relay.members_of(&room).is_empty());
}

#[tokio::test]
async fn test_lost_channel_ends_session_and_reports_leave_failure() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("lost");
    let observer = RecordingObserver::new();
    let capture = Arc::new(MockCapture::working());
    let transport = Arc::new(FlakyTransport::new(relay.client()));

    let services = SessionServices {
        transport: transport.clone(),
        capture: capture.clone(),
        peers: Arc::new(MockPeerFactory::new(MockBehavior::silent())),
        observer: Arc::new(observer.clone()),
    };
    let session = SessionController::start(
        SessionConfig::new(room.clone()).with_identity("1"),
        services,
    )
    .await
    .unwrap();

    // Drop the membership behind the session's back: its event stream closes
    // and its own leave then has nothing to leave.
    transport.leave().await.unwrap();

    assert!(
        observer
            .wait_for(NEGOTIATION_TIMEOUT_MS, |events| events
                .contains(&ObservedEvent::Ended))
            .await
    );
    let errors = observer.transport_errors().await;
    assert_eq!(errors.first(), Some(&TransportError::Closed));
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TransportError::LeaveFailed(_))),
        "leave failure not reported: {errors:?}"
    );
    assert_eq!(transport.logouts(), 1);
    assert_eq!(capture.released(), 1);
    assert!(eventually(NEGOTIATION_TIMEOUT_MS, || session.is_finished()).await);
}
