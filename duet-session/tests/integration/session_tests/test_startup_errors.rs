use std::sync::Arc;

use duet_core::{MemberId, RoomId, TrackKind};
use duet_session::{
    CaptureError, LocalRelay, MessagingTransport, SessionConfig, SessionController,
    SessionServices, StartupError, TransportError,
};

use crate::integration::init_tracing;
use crate::utils::{FlakyTransport, MockBehavior, MockCapture, MockPeerFactory, RecordingObserver};

fn services(
    transport: Arc<dyn MessagingTransport>,
    capture: Arc<MockCapture>,
) -> SessionServices {
    SessionServices {
        transport,
        capture,
        peers: Arc::new(MockPeerFactory::new(MockBehavior::silent())),
        observer: Arc::new(RecordingObserver::new()),
    }
}

#[tokio::test]
async fn test_missing_room_is_fatal_before_capture() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let capture = Arc::new(MockCapture::working());
    let config = SessionConfig::default();

    let result = SessionController::start(
        config,
        services(Arc::new(relay.client()), capture.clone()),
    )
    .await;

    assert!(matches!(result, Err(StartupError::MissingRoom)));
    assert_eq!(capture.acquired(), 0);
}

#[tokio::test]
async fn test_capture_failure_never_logs_in() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("no-camera");
    let capture = Arc::new(MockCapture::failing(CaptureError::DeviceUnavailable(
        TrackKind::Video,
    )));
    let transport = Arc::new(FlakyTransport::new(relay.client()));

    let result = SessionController::start(
        SessionConfig::new(room.clone()).with_identity("1"),
        services(transport.clone(), capture),
    )
    .await;

    assert!(matches!(
        result,
        Err(StartupError::CaptureUnavailable(CaptureError::DeviceUnavailable(
            TrackKind::Video
        )))
    ));
    assert!(!transport.is_logged_in());
    assert!(relay.members_of(&room).is_empty());
}

#[tokio::test]
async fn test_login_failure_releases_capture() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let capture = Arc::new(MockCapture::working());
    let transport = Arc::new(FlakyTransport::failing_login(relay.client()));

    let result = SessionController::start(
        SessionConfig::new("room").with_identity("1"),
        services(transport, capture.clone()),
    )
    .await;

    assert!(matches!(result, Err(StartupError::LoginFailed(TransportError::IdentityInUse(_)))));
    assert_eq!(capture.acquired(), 1);
    assert_eq!(capture.released(), 1);
}

#[tokio::test]
async fn test_join_failure_logs_out_and_releases_capture() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let capture = Arc::new(MockCapture::working());
    let transport = Arc::new(FlakyTransport::failing_join(relay.client()));

    let result = SessionController::start(
        SessionConfig::new("room").with_identity("1"),
        services(transport.clone(), capture.clone()),
    )
    .await;

    assert!(matches!(result, Err(StartupError::ChannelJoinFailed(TransportError::NotJoined))));
    assert_eq!(transport.logouts(), 1);
    assert!(!transport.is_logged_in());
    assert_eq!(capture.released(), 1);

    // The identity is free again.
    relay
        .client()
        .login(&MemberId::from("1"), None)
        .await
        .expect("identity still held after failed start");
}
