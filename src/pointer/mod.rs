pub mod governor;
pub mod intercept;
pub mod tracker;

pub use governor::PointerSpeedGovernor;
pub use intercept::{InputInterceptor, InterceptRule, PointerEvent, PointerEventKind};
pub use tracker::{CursorSample, CursorSource, PointerTracker};
