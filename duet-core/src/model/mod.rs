mod envelope;
mod member;
mod room;
mod signaling;
mod track;

pub use envelope::TextEnvelope;
pub use member::MemberId;
pub use room::RoomId;
pub use signaling::{IceServerConfig, PathCandidate, SdpKind, SessionDescription, SignalMessage};
pub use track::TrackKind;
