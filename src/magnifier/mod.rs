pub mod follow;
pub mod transform;
pub mod view;

pub use transform::ViewTransform;
pub use view::MagnifierSession;
