pub mod surface;
pub mod window;

pub use surface::{
    MockSurfaceFactory, MockSurfaceHandle, OverlaySet, OverlaySurface, SurfaceFactory,
    SurfaceRole,
};
pub use window::LayeredWindowFactory;
