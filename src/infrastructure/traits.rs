//! Boundary traits for testability
//!
//! The library never draws or touches the disk itself. A collaborator
//! implements [`DrawingSurface`] to put reconciliation results on screen,
//! and the CLI reads documents through [`FileSystem`].

use std::io;
use std::path::Path;

use crate::application::reconcile::{LinkChange, NodeChange};
use crate::application::services::{Camera, TempLink};
use crate::domain::{NodeId, Point};

/// Receiver of rendering instructions.
///
/// Every call describes a complete animation; the surface decides how to
/// sample it over time. Calls for one pass arrive nodes first, then links.
pub trait DrawingSurface {
    /// A node appears, growing out of `change.transition.from`.
    fn enter_node(&mut self, change: &NodeChange);

    fn update_node(&mut self, change: &NodeChange);

    /// A node disappears into `change.transition.to` and is removed afterwards.
    fn exit_node(&mut self, change: &NodeChange);

    fn enter_link(&mut self, change: &LinkChange);

    fn update_link(&mut self, change: &LinkChange);

    fn exit_link(&mut self, change: &LinkChange);

    /// Place a node immediately, without animation (drag feedback).
    fn move_node(&mut self, id: NodeId, position: Point);

    /// Redraw the link into `target` between two points, without animation.
    fn move_link(&mut self, target: NodeId, start: Point, end: Point);

    /// Show the line to the current drop candidate, or hide it with `None`.
    fn draw_temp_link(&mut self, link: Option<&TempLink>);

    /// Move the camera, animated over `duration` (0 for immediate).
    fn set_camera(&mut self, camera: &Camera, duration: f64);
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
