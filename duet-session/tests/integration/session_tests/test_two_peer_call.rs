use duet_core::{MemberId, RoomId, TrackKind};
use duet_session::{Layout, LocalRelay, NegotiationState};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{
    MockBehavior, MockPeerFactory, NEGOTIATION_TIMEOUT_MS, ObservedEvent, RecordingObserver,
    eventually, wait_for_state,
};

#[tokio::test]
async fn test_two_sessions_connect() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("R1");
    let (peers_x, peers_y) = (
        MockPeerFactory::new(MockBehavior::connecting()),
        MockPeerFactory::new(MockBehavior::connecting()),
    );
    let (observer_x, observer_y) = (RecordingObserver::new(), RecordingObserver::new());

    let x = start_test_session(&relay, "1", &room, &peers_x, &observer_x)
        .await
        .expect("Failed to start X");

    // Alone in the room: nothing to negotiate.
    assert_eq!(x.state(), NegotiationState::Idle);
    assert!(peers_x.connections().is_empty());

    let y = start_test_session(&relay, "2", &room, &peers_y, &observer_y)
        .await
        .expect("Failed to start Y");

    wait_for_state(&x, NegotiationState::Connected, NEGOTIATION_TIMEOUT_MS)
        .await
        .unwrap();
    wait_for_state(&y, NegotiationState::Connected, NEGOTIATION_TIMEOUT_MS)
        .await
        .unwrap();
    for observer in [&observer_x, &observer_y] {
        assert!(
            observer
                .wait_for(NEGOTIATION_TIMEOUT_MS, |events| {
                    events.contains(&ObservedEvent::State(NegotiationState::Connected))
                })
                .await
        );
    }

    assert_eq!(
        observer_x.states().await,
        vec![
            NegotiationState::AwaitingLocalOffer,
            NegotiationState::AwaitingRemoteAnswer,
            NegotiationState::Connected,
        ]
    );
    assert_eq!(
        observer_y.states().await,
        vec![
            NegotiationState::AwaitingRemoteOffer,
            NegotiationState::Connected,
        ]
    );
    assert_eq!(
        observer_x.layouts().await,
        vec![Layout::Pair {
            remote: MemberId::from("2")
        }]
    );
    assert_eq!(
        observer_y.layouts().await,
        vec![Layout::Pair {
            remote: MemberId::from("1")
        }]
    );

    let (pc_x, pc_y) = (peers_x.latest().unwrap(), peers_y.latest().unwrap());
    assert_eq!(pc_x.remote_descriptions(), 1);
    assert_eq!(pc_y.remote_descriptions(), 1);
    assert!(
        eventually(NEGOTIATION_TIMEOUT_MS, || {
            pc_x.added_candidates().len() == 2 && pc_y.added_candidates().len() == 2
        })
        .await,
        "candidates were not exchanged"
    );

    x.leave().await.unwrap();
    y.leave().await.unwrap();
}

#[tokio::test]
async fn test_toggling_a_track_does_not_renegotiate() {
    init_tracing();

    let relay = LocalRelay::new("test");
    let room = RoomId::from("R-toggle");
    let (peers_x, peers_y) = (
        MockPeerFactory::new(MockBehavior::connecting()),
        MockPeerFactory::new(MockBehavior::connecting()),
    );
    let observer = RecordingObserver::new();

    let x = start_test_session(&relay, "1", &room, &peers_x, &observer)
        .await
        .unwrap();
    let y = start_test_session(&relay, "2", &room, &peers_y, &RecordingObserver::new())
        .await
        .unwrap();
    wait_for_state(&x, NegotiationState::Connected, NEGOTIATION_TIMEOUT_MS)
        .await
        .unwrap();

    assert_eq!(x.toggle_local_track(TrackKind::Audio).unwrap(), false);
    let audio = x.local_media().track(TrackKind::Audio).unwrap();
    assert!(!audio.is_enabled());
    assert!(x.local_media().track(TrackKind::Video).unwrap().is_enabled());

    assert_eq!(x.toggle_local_track(TrackKind::Audio).unwrap(), true);
    assert!(audio.is_enabled());

    assert_eq!(x.state(), NegotiationState::Connected);
    assert_eq!(peers_x.connections().len(), 1);
    assert_eq!(peers_y.connections().len(), 1);

    x.leave().await.unwrap();
    y.leave().await.unwrap();
}
