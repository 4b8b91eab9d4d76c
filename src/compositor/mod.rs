pub mod annotation;
pub mod font;
pub mod frame;
pub mod highlight;
pub mod raster;
pub mod spotlight;

pub use frame::{compose_frame, FrameBase, FrameLayers, HighlightLayer, SpotlightLayer};
pub use raster::{Rgba, RgbaBuffer};
