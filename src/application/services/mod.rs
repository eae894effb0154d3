//! Application services
//!
//! Interaction rules that operate on the document tree and the camera.
//! The [`Session`](crate::application::Session) decides when layout and
//! reconciliation run after a service has changed something.

pub mod camera;
pub mod collapse;
pub mod drag;
pub mod edit;

pub use camera::Camera;
pub use collapse::{collapse_all, expand_all, toggle};
pub use drag::{DragSession, PanDirection, PanTask, TempLink};
pub use edit::{apply as apply_edit, fields_of, EditOutcome};
