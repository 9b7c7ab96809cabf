mod controller;
mod events;
mod state;

pub use controller::SessionController;
pub use events::SessionEvent;
pub use state::{CaptureState, SessionPhase};
