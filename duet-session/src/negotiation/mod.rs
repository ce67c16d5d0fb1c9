mod attempt;
mod candidate_buffer;
mod glare;
mod negotiation_state;
mod state_machine;
pub(crate) mod step;

pub use candidate_buffer::*;
pub use glare::*;
pub use negotiation_state::*;
pub use state_machine::*;
