pub mod annotation;
pub mod capture;
pub mod compositor;
pub mod error;
pub mod geometry;
pub mod hotkey;
pub mod input;
pub mod logging;
pub mod magnifier;
pub mod mode;
pub mod overlay;
pub mod pointer;
pub mod settings;
pub mod settings_store;
pub mod timer;

pub use error::{EngineError, EngineResult, Permission};
pub use mode::{EngineConfig, EngineServices, ModeController};
