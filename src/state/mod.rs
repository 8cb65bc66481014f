mod accumulator;
mod controller;
mod session;

pub use accumulator::DeltaAccumulator;
pub use controller::{ChatController, ChatUpdate, PendingTurn, TurnPhase};
pub use session::SessionState;
