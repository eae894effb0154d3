//! Infrastructure layer: boundary implementations and service wiring

pub mod di;
pub mod error;
pub mod surface;
pub mod traits;

pub use error::{InfraError, InfraResult};
pub use surface::{RecordingSurface, SurfaceEvent};
