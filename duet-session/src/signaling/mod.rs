mod local_relay;
mod messaging_transport;
mod signaling_adapter;

pub use local_relay::*;
pub use messaging_transport::*;
pub use signaling_adapter::*;
