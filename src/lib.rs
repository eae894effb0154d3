//! xmlflux: interactive XML hierarchy diagrams
//!
//! An XML document is imported into an arena-backed tree, laid out as a
//! tidy node-link diagram and edited through a [`Session`]: collapse and
//! expand, field edits, drag-and-drop re-parenting with boundary panning.
//! Every change is reconciled against what was drawn before and handed to a
//! [`DrawingSurface`] as enter/update/exit transitions. The model can be
//! exported back to XML at any time.
//!
//! Layers, innermost first:
//! - [`domain`]: document model, XML import/export, ordering
//! - [`application`]: layout, reconciliation, interaction services, sessions
//! - [`infrastructure`]: boundary traits and their implementations
//! - [`cli`]: the `xmlflux` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::layout::compute_layout;
pub use application::{ApplicationError, ApplicationResult, Session};
pub use config::Settings;
pub use domain::{export, import, DomainError, NodeId, Point, TreeArena, Viewport};
pub use infrastructure::traits::DrawingSurface;
