//! Drag-and-drop re-parenting and boundary panning
//!
//! A [`DragSession`] exists from pointer-down on a non-root node until the
//! drop. It owns the [`PanTask`] that scrolls the camera while the pointer
//! sits near a viewport edge, so ending the drag always stops panning.

use std::time::Duration;

use generational_arena::Index;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::application::services::camera::Camera;
use crate::config::CameraConfig;
use crate::domain::{DomainError, DomainResult, Point, Scope, TreeArena, Viewport};

/// Edge of the viewport the pointer is pressing against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

impl PanDirection {
    /// Edge under a pointer in viewport coordinates, checked left, right, up, down.
    pub fn detect(pointer: (f64, f64), viewport: Viewport, boundary: f64) -> Option<Self> {
        let (x, y) = pointer;
        if x < boundary {
            Some(PanDirection::Left)
        } else if x > viewport.width - boundary {
            Some(PanDirection::Right)
        } else if y < boundary {
            Some(PanDirection::Up)
        } else if y > viewport.height - boundary {
            Some(PanDirection::Down)
        } else {
            None
        }
    }

    /// Translation applied by one step.
    fn offset(self, speed: f64) -> (f64, f64) {
        match self {
            PanDirection::Left => (speed, 0.0),
            PanDirection::Right => (-speed, 0.0),
            PanDirection::Up => (0.0, speed),
            PanDirection::Down => (0.0, -speed),
        }
    }
}

/// Periodic camera shift while the pointer stays in a boundary zone.
#[derive(Debug, Clone)]
pub struct PanTask {
    direction: PanDirection,
    speed: f64,
    interval: Duration,
    pending: Duration,
    ticks: u64,
    cancelled: bool,
}

impl PanTask {
    pub fn start(direction: PanDirection, config: &CameraConfig) -> Self {
        debug!("pan: start {:?}", direction);
        Self {
            direction,
            speed: config.pan_speed,
            interval: config.pan_interval(),
            pending: Duration::ZERO,
            ticks: 0,
            cancelled: false,
        }
    }

    pub fn direction(&self) -> PanDirection {
        self.direction
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn cancel(&mut self) {
        if !self.cancelled {
            debug!("pan: cancel {:?} after {} ticks", self.direction, self.ticks);
        }
        self.cancelled = true;
    }

    /// One pan step. Returns false once cancelled.
    pub fn tick(&mut self, camera: &mut Camera) -> bool {
        if self.cancelled {
            return false;
        }
        let (dx, dy) = self.direction.offset(self.speed);
        camera.pan_by(dx, dy);
        self.ticks += 1;
        trace!("pan: tick {} translate=({}, {})", self.ticks, camera.tx, camera.ty);
        true
    }

    /// Let `elapsed` time pass, firing one step per full interval.
    pub fn advance(&mut self, elapsed: Duration, camera: &mut Camera) -> u32 {
        if self.cancelled || self.interval.is_zero() {
            return 0;
        }
        self.pending += elapsed;
        let mut fired = 0;
        while self.pending >= self.interval && self.tick(camera) {
            self.pending -= self.interval;
            fired += 1;
        }
        fired
    }
}

/// Line drawn between the dragged node and the node it would be dropped on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempLink {
    /// Candidate parent
    pub from: Point,
    /// Dragged node
    pub to: Point,
}

/// State of one drag gesture.
#[derive(Debug)]
pub struct DragSession {
    node: Index,
    candidate: Option<Index>,
    pan: Option<PanTask>,
}

impl DragSession {
    /// Begin dragging `idx`. The root stays where it is.
    #[instrument(level = "debug", skip(tree))]
    pub fn start(tree: &TreeArena, idx: Index) -> DomainResult<Self> {
        tree.node(idx)?;
        if tree.is_root(idx) {
            return Err(DomainError::RootNotDraggable);
        }
        Ok(Self {
            node: idx,
            candidate: None,
            pan: None,
        })
    }

    pub fn node(&self) -> Index {
        self.node
    }

    pub fn candidate(&self) -> Option<Index> {
        self.candidate
    }

    /// The dragged node and its shown descendants.
    pub fn payload(&self, tree: &TreeArena) -> Vec<Index> {
        tree.iter_from(self.node, Scope::Visible)
            .map(|(i, _)| i)
            .collect()
    }

    /// Move the payload by a screen delta and re-evaluate panning.
    ///
    /// Screen x runs along depth, so `dx` moves `y0` and `dy` moves `x0`.
    /// Collapsed descendants are not drawn and keep their cached positions.
    pub fn move_by(
        &mut self,
        tree: &mut TreeArena,
        dx: f64,
        dy: f64,
        pointer: (f64, f64),
        viewport: Viewport,
        config: &CameraConfig,
    ) -> DomainResult<Option<PanDirection>> {
        for idx in self.payload(tree) {
            let node = tree.node_mut(idx)?;
            node.x0 += dy;
            node.y0 += dx;
        }

        let direction = PanDirection::detect(pointer, viewport, config.pan_boundary);
        let running = self
            .pan
            .as_ref()
            .filter(|task| task.is_active())
            .map(PanTask::direction);
        if direction != running {
            self.stop_panning();
            self.pan = direction.map(|d| PanTask::start(d, config));
        }
        Ok(direction)
    }

    /// Offer `candidate` as the new parent.
    pub fn hover(&mut self, tree: &TreeArena, candidate: Index) -> DomainResult<()> {
        tree.node(candidate)?;
        if tree.is_within(candidate, self.node) {
            return Err(DomainError::InvalidDropTarget(format!(
                "<{}> is the dragged node or one of its descendants",
                tree.name_of(candidate)
            )));
        }
        trace!("drag: hover <{}>", tree.name_of(candidate));
        self.candidate = Some(candidate);
        Ok(())
    }

    pub fn leave_hover(&mut self) {
        self.candidate = None;
    }

    pub fn temp_link(&self, tree: &TreeArena) -> Option<TempLink> {
        let candidate = tree.get_node(self.candidate?)?;
        let dragged = tree.get_node(self.node)?;
        Some(TempLink {
            from: candidate.position(),
            to: dragged.position(),
        })
    }

    pub fn pan_task(&self) -> Option<&PanTask> {
        self.pan.as_ref()
    }

    pub fn pan_task_mut(&mut self) -> Option<&mut PanTask> {
        self.pan.as_mut()
    }

    fn stop_panning(&mut self) {
        if let Some(task) = self.pan.as_mut() {
            task.cancel();
        }
    }

    /// End the gesture, returning the drop target if one is hovered.
    pub fn finish(mut self) -> Option<Index> {
        self.stop_panning();
        self.candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import;
    use rstest::rstest;

    #[rstest]
    #[case((5.0, 300.0), Some(PanDirection::Left))]
    #[case((790.0, 300.0), Some(PanDirection::Right))]
    #[case((400.0, 10.0), Some(PanDirection::Up))]
    #[case((400.0, 590.0), Some(PanDirection::Down))]
    #[case((5.0, 5.0), Some(PanDirection::Left))]
    #[case((400.0, 300.0), None)]
    fn test_detect_direction(#[case] pointer: (f64, f64), #[case] expected: Option<PanDirection>) {
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(PanDirection::detect(pointer, viewport, 20.0), expected);
    }

    #[test]
    fn test_pan_task_moves_translate_only() {
        let config = CameraConfig::default();
        let mut camera = Camera::new(&config);
        let mut task = PanTask::start(PanDirection::Down, &config);

        assert_eq!(task.advance(Duration::from_millis(120), &mut camera), 2);
        assert_eq!((camera.tx, camera.ty), (0.0, -400.0));
        assert_eq!(camera.scale, 1.0);

        task.cancel();
        assert!(!task.tick(&mut camera));
        assert_eq!(task.advance(Duration::from_millis(500), &mut camera), 0);
        assert_eq!(camera.ty, -400.0);
    }

    #[test]
    fn test_root_cannot_start_drag() {
        let tree = import("<r><a/></r>").unwrap();
        let root = tree.root().unwrap();
        assert!(matches!(
            DragSession::start(&tree, root),
            Err(DomainError::RootNotDraggable)
        ));
    }

    #[test]
    fn test_hover_rejects_own_subtree() {
        let tree = import("<r><a><b/></a><c/></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        let b = tree.find_path("r/a/b").unwrap();
        let c = tree.find_path("r/c").unwrap();
        let mut drag = DragSession::start(&tree, a).unwrap();

        assert!(drag.hover(&tree, a).is_err());
        assert!(drag.hover(&tree, b).is_err());
        assert_eq!(drag.candidate(), None);
        drag.hover(&tree, c).unwrap();
        assert_eq!(drag.finish(), Some(c));
    }

    #[test]
    fn test_move_by_swaps_axes_and_starts_panning() {
        let mut tree = import("<r><a/></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        let config = CameraConfig::default();
        let viewport = Viewport::new(800.0, 600.0);
        let mut drag = DragSession::start(&tree, a).unwrap();

        let dir = drag
            .move_by(&mut tree, 10.0, 3.0, (400.0, 300.0), viewport, &config)
            .unwrap();
        assert_eq!(dir, None);
        assert_eq!(tree.node(a).unwrap().position(), Point::new(3.0, 10.0));

        drag.move_by(&mut tree, 0.0, 0.0, (795.0, 300.0), viewport, &config)
            .unwrap();
        assert_eq!(drag.pan_task().map(PanTask::direction), Some(PanDirection::Right));

        drag.move_by(&mut tree, 0.0, 0.0, (400.0, 300.0), viewport, &config)
            .unwrap();
        assert!(drag.pan_task().is_none());
    }

    #[test]
    fn test_move_by_carries_shown_descendants() {
        let mut tree = import("<r><a><b/><c><d/></c></a><e/></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        let c = tree.find_path("r/a/c").unwrap();
        let d = tree.find_path("r/a/c/d").unwrap();
        let e = tree.find_path("r/e").unwrap();
        tree.node_mut(c).unwrap().branch.collapse();
        let mut drag = DragSession::start(&tree, a).unwrap();

        drag.move_by(
            &mut tree,
            4.0,
            2.0,
            (400.0, 300.0),
            Viewport::new(800.0, 600.0),
            &CameraConfig::default(),
        )
        .unwrap();

        assert_eq!(drag.payload(&tree).len(), 3);
        for path in ["r/a", "r/a/b", "r/a/c"] {
            let idx = tree.find_path(path).unwrap();
            assert_eq!(tree.node(idx).unwrap().position(), Point::new(2.0, 4.0), "{path}");
        }
        assert_eq!(tree.node(d).unwrap().position(), Point::default());
        assert_eq!(tree.node(e).unwrap().position(), Point::default());
    }
}
