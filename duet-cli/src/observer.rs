use async_trait::async_trait;
use colored::*;
use duet_core::{MemberId, TrackKind};
use duet_session::{Layout, NegotiationError, NegotiationState, SessionObserver, TransportError};

/// Prints what a session reports, one line per event, prefixed with its label.
pub struct ColoredObserver {
    label: String,
}

impl ColoredObserver {
    pub fn new(label: &str) -> Self {
        Self {
            label: format!("[{label}]"),
        }
    }

    fn line(&self, text: impl std::fmt::Display) {
        println!("{} {}", self.label.bold(), text);
    }
}

#[async_trait]
impl SessionObserver for ColoredObserver {
    async fn on_layout_change(&self, layout: Layout) {
        match layout {
            Layout::Solo => self.line("📺 waiting alone in the room".dimmed()),
            Layout::Pair { remote } => self.line(format!("📺 paired with {remote}").cyan()),
        }
    }

    async fn on_state_change(&self, state: NegotiationState) {
        let text = format!("state → {state}");
        match state {
            NegotiationState::Connected => self.line(text.green().bold()),
            NegotiationState::Closed => self.line(text.red()),
            _ => self.line(text.yellow()),
        }
    }

    async fn on_negotiation_failed(&self, member: &MemberId, error: &NegotiationError) {
        self.line(format!("✗ negotiation with {member} failed: {error}").red().bold());
    }

    async fn on_transport_error(&self, error: &TransportError) {
        self.line(format!("✗ relay: {error}").red());
    }

    async fn on_remote_track(&self, member: &MemberId, kind: TrackKind) {
        self.line(format!("🔊 receiving {kind} from {member}").green());
    }

    async fn on_session_ended(&self) {
        self.line("session ended".dimmed());
    }
}
