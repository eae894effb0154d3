//! In-memory drawing surface
//!
//! Records every instruction it receives. Used by the CLI to report what a
//! pass would draw, and by tests to observe the session from the outside.

use serde::Serialize;

use crate::application::reconcile::{LinkChange, NodeChange};
use crate::application::services::{Camera, TempLink};
use crate::domain::{NodeId, Point};
use crate::infrastructure::traits::DrawingSurface;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    EnterNode(NodeChange),
    UpdateNode(NodeChange),
    ExitNode(NodeChange),
    EnterLink(LinkChange),
    UpdateLink(LinkChange),
    ExitLink(LinkChange),
    MoveNode { id: NodeId, position: Point },
    MoveLink { target: NodeId, start: Point, end: Point },
    TempLink { link: Option<TempLink> },
    Camera { camera: Camera, duration: f64 },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Most recent camera instruction.
    pub fn last_camera(&self) -> Option<&Camera> {
        self.events.iter().rev().find_map(|e| match e {
            SurfaceEvent::Camera { camera, .. } => Some(camera),
            _ => None,
        })
    }

    /// Most recent temporary link state; `Some(None)` means it was hidden.
    pub fn last_temp_link(&self) -> Option<Option<&TempLink>> {
        self.events.iter().rev().find_map(|e| match e {
            SurfaceEvent::TempLink { link } => Some(link.as_ref()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl DrawingSurface for RecordingSurface {
    fn enter_node(&mut self, change: &NodeChange) {
        self.events.push(SurfaceEvent::EnterNode(change.clone()));
    }

    fn update_node(&mut self, change: &NodeChange) {
        self.events.push(SurfaceEvent::UpdateNode(change.clone()));
    }

    fn exit_node(&mut self, change: &NodeChange) {
        self.events.push(SurfaceEvent::ExitNode(change.clone()));
    }

    fn enter_link(&mut self, change: &LinkChange) {
        self.events.push(SurfaceEvent::EnterLink(change.clone()));
    }

    fn update_link(&mut self, change: &LinkChange) {
        self.events.push(SurfaceEvent::UpdateLink(change.clone()));
    }

    fn exit_link(&mut self, change: &LinkChange) {
        self.events.push(SurfaceEvent::ExitLink(change.clone()));
    }

    fn move_node(&mut self, id: NodeId, position: Point) {
        self.events.push(SurfaceEvent::MoveNode { id, position });
    }

    fn move_link(&mut self, target: NodeId, start: Point, end: Point) {
        self.events.push(SurfaceEvent::MoveLink { target, start, end });
    }

    fn draw_temp_link(&mut self, link: Option<&TempLink>) {
        self.events.push(SurfaceEvent::TempLink {
            link: link.copied(),
        });
    }

    fn set_camera(&mut self, camera: &Camera, duration: f64) {
        self.events.push(SurfaceEvent::Camera {
            camera: *camera,
            duration,
        });
    }
}
