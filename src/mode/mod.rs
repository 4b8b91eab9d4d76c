pub mod controller;
pub mod dialog;
pub mod messages;
pub mod state;

pub use controller::{EngineConfig, EngineServices, ModeController};
pub use messages::{EngineSnapshot, EngineUpdate, Remediation, UserNotice};
pub use state::{CursorHighlightState, HighlightStyle, Mode, SpotlightState};
