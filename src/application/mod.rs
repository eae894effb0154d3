//! Application layer: layout, reconciliation and the interactive session
//!
//! This layer orchestrates domain logic and talks to the outside world only
//! through the boundary traits in `infrastructure::traits`.

pub mod error;
pub mod layout;
pub mod reconcile;
pub mod services;
pub mod session;

pub use error::{ApplicationError, ApplicationResult};
pub use layout::{compute_layout, LabelMetrics, Layout};
pub use reconcile::{LinkChange, NodeChange, Phase, Reconciler, RenderPlan, Transition};
pub use session::Session;
