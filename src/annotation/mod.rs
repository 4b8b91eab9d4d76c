pub mod gesture;
pub mod history;
pub mod model;

pub use gesture::DrawingSession;
pub use history::AnnotationHistory;
pub use model::{AnnotationElement, BackgroundBoard, Tool, ToolSelection};
