use async_trait::async_trait;
use duet_core::{MemberId, TrackKind};
use duet_session::{Layout, NegotiationError, NegotiationState, SessionObserver, TransportError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Event types recorded by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    Layout(Layout),
    State(NegotiationState),
    Failed {
        member: MemberId,
        error: NegotiationError,
    },
    Transport(TransportError),
    RemoteTrack {
        member: MemberId,
        kind: TrackKind,
    },
    Ended,
}

/// A SessionObserver that records every callback.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObservedEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_events(&self) -> Vec<ObservedEvent> {
        self.events.lock().await.clone()
    }

    pub async fn layouts(&self) -> Vec<Layout> {
        self.filter(|e| match e {
            ObservedEvent::Layout(l) => Some(l.clone()),
            _ => None,
        })
        .await
    }

    pub async fn states(&self) -> Vec<NegotiationState> {
        self.filter(|e| match e {
            ObservedEvent::State(s) => Some(*s),
            _ => None,
        })
        .await
    }

    pub async fn failures(&self) -> Vec<NegotiationError> {
        self.filter(|e| match e {
            ObservedEvent::Failed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .await
    }

    pub async fn transport_errors(&self) -> Vec<TransportError> {
        self.filter(|e| match e {
            ObservedEvent::Transport(error) => Some(error.clone()),
            _ => None,
        })
        .await
    }

    pub async fn has_ended(&self) -> bool {
        self.events.lock().await.contains(&ObservedEvent::Ended)
    }

    /// Polls until `predicate` holds for the recorded events or the timeout passes.
    pub async fn wait_for<F>(&self, timeout_ms: u64, predicate: F) -> bool
    where
        F: Fn(&[ObservedEvent]) -> bool,
    {
        let wait = async {
            loop {
                if predicate(&self.events.lock().await) {
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), wait)
            .await
            .is_ok()
    }

    async fn filter<T>(&self, f: impl Fn(&ObservedEvent) -> Option<T>) -> Vec<T> {
        self.events.lock().await.iter().filter_map(f).collect()
    }

    async fn push(&self, event: ObservedEvent) {
        self.events.lock().await.push(event);
    }
}

#[async_trait]
impl SessionObserver for RecordingObserver {
    async fn on_layout_change(&self, layout: Layout) {
        self.push(ObservedEvent::Layout(layout)).await;
    }

    async fn on_state_change(&self, state: NegotiationState) {
        self.push(ObservedEvent::State(state)).await;
    }

    async fn on_negotiation_failed(&self, member: &MemberId, error: &NegotiationError) {
        self.push(ObservedEvent::Failed {
            member: member.clone(),
            error: error.clone(),
        })
        .await;
    }

    async fn on_transport_error(&self, error: &TransportError) {
        self.push(ObservedEvent::Transport(error.clone())).await;
    }

    async fn on_remote_track(&self, member: &MemberId, kind: TrackKind) {
        self.push(ObservedEvent::RemoteTrack {
            member: member.clone(),
            kind,
        })
        .await;
    }

    async fn on_session_ended(&self) {
        self.push(ObservedEvent::Ended).await;
    }
}
