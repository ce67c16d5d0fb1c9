mod peer_connection;
mod peer_event;
mod transport_config;
mod webrtc_connection;

pub use peer_connection::*;
pub use peer_event::*;
pub use transport_config::*;
pub use webrtc_connection::*;
