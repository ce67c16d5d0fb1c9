pub use duet_core::model::{MemberId, RoomId};

pub mod model {
    pub use duet_core::model::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use duet_session::*;
}
