//! Interactive editing session over one document
//!
//! A `Session` owns the tree, the camera and the render bookkeeping. Every
//! operation runs to completion and reports what changed on screen through
//! a [`DrawingSurface`]. Transitions are returned as data; nothing here
//! waits for an animation to finish.

use std::time::Duration;

use generational_arena::Index;
use tracing::{debug, info, instrument};

use crate::application::error::ApplicationResult;
use crate::application::layout::{compute_layout, LabelMetrics, Layout};
use crate::application::reconcile::{Reconciler, RenderPlan};
use crate::application::services::{
    apply_edit, collapse, fields_of, Camera, DragSession, EditOutcome, PanDirection,
};
use crate::config::Settings;
use crate::domain::{
    export, import, DomainError, FieldSet, NodeId, Point, Scope, TreeArena, Viewport,
};
use crate::infrastructure::traits::DrawingSurface;

#[derive(Debug)]
pub struct Session {
    tree: TreeArena,
    settings: Settings,
    viewport: Viewport,
    metrics: LabelMetrics,
    reconciler: Reconciler,
    camera: Camera,
    selection: Option<Index>,
    drag: Option<DragSession>,
}

impl Session {
    /// Parse `xml` and prepare it for a first [`render`](Self::render).
    #[instrument(level = "debug", skip(xml, settings))]
    pub fn import(xml: &str, viewport: Viewport, settings: Settings) -> ApplicationResult<Self> {
        let tree = import(xml)?;
        let camera = Camera::new(&settings.camera);
        let mut session = Self {
            tree,
            settings,
            viewport,
            metrics: LabelMetrics::default(),
            reconciler: Reconciler::new(),
            camera,
            selection: None,
            drag: None,
        };
        session.prepare();
        info!("session: imported {} nodes", session.tree.node_count());
        Ok(session)
    }

    /// Replace the document. On a parse error the current one stays loaded.
    ///
    /// Nodes of the old document exit on the next render.
    pub fn load(&mut self, xml: &str) -> ApplicationResult<()> {
        let tree = import(xml)?;
        self.tree = tree;
        self.reconciler.detach_model();
        self.selection = None;
        if let Some(drag) = self.drag.take() {
            drag.finish();
        }
        self.prepare();
        info!("session: loaded {} nodes", self.tree.node_count());
        Ok(())
    }

    // Root starts vertically centred so the first pass grows out of the middle.
    fn prepare(&mut self) {
        self.metrics = LabelMetrics::measure(&self.tree);
        let start = Point::new(self.viewport.height / 2.0, 0.0);
        if let Some(root) = self.tree.root().and_then(|r| self.tree.get_node_mut(r)) {
            root.set_position(start);
        }
    }

    pub fn tree(&self) -> &TreeArena {
        &self.tree
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn metrics(&self) -> LabelMetrics {
        self.metrics
    }

    pub fn selection(&self) -> Option<Index> {
        self.selection
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn node_id(&self, idx: Index) -> Option<NodeId> {
        self.tree.get_node(idx).and_then(|n| n.id)
    }

    /// Model handle for a rendered node.
    pub fn find(&self, id: NodeId) -> Option<Index> {
        self.tree
            .iter_logical()
            .find(|(_, n)| n.id == Some(id))
            .map(|(i, _)| i)
    }

    pub fn export(&self) -> String {
        export(&self.tree)
    }

    /// Layout with the current label metrics, without touching the model.
    pub fn layout(&self) -> Layout {
        compute_layout(
            &self.tree,
            &self.metrics,
            self.viewport,
            &self.settings.layout,
        )
    }

    fn root(&self) -> ApplicationResult<Index> {
        Ok(self.tree.root().ok_or(DomainError::NodeNotFound)?)
    }

    fn update(
        &mut self,
        source: Index,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<RenderPlan> {
        let layout = self.layout();
        let plan =
            self.reconciler
                .reconcile(&mut self.tree, source, &layout, self.settings.duration)?;
        plan.draw(surface);
        Ok(plan)
    }

    fn center_on(&mut self, idx: Index, surface: &mut dyn DrawingSurface) -> ApplicationResult<()> {
        let position = self.tree.node(idx)?.position();
        self.camera.center_on(position, self.viewport);
        surface.set_camera(&self.camera, self.settings.duration);
        Ok(())
    }

    /// Lay out and draw the whole tree, then center the root.
    pub fn render(&mut self, surface: &mut dyn DrawingSurface) -> ApplicationResult<RenderPlan> {
        let root = self.root()?;
        let plan = self.update(root, surface)?;
        self.center_on(root, surface)?;
        Ok(plan)
    }

    /// Re-measure labels and redraw from the root. Clears the selection.
    #[instrument(level = "debug", skip_all)]
    pub fn rebuild(&mut self, surface: &mut dyn DrawingSurface) -> ApplicationResult<RenderPlan> {
        self.metrics = LabelMetrics::measure(&self.tree);
        self.selection = None;
        self.render(surface)
    }

    /// Select a node, center it and return its editable fields.
    pub fn select(
        &mut self,
        idx: Index,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<FieldSet> {
        let fields = fields_of(&self.tree, idx)?;
        self.selection = Some(idx);
        self.center_on(idx, surface)?;
        Ok(fields)
    }

    /// Write edited fields back into the node.
    ///
    /// A rename triggers a [`rebuild`](Self::rebuild); any other change only
    /// redraws from the edited node.
    pub fn apply_field_edit(
        &mut self,
        idx: Index,
        fields: &FieldSet,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<RenderPlan> {
        match apply_edit(&mut self.tree, idx, fields)? {
            EditOutcome::Renamed => self.rebuild(surface),
            EditOutcome::Updated => self.update(idx, surface),
        }
    }

    /// Collapse or expand the children of `idx` and center it.
    pub fn toggle(
        &mut self,
        idx: Index,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<RenderPlan> {
        collapse::toggle(&mut self.tree, idx)?;
        let plan = self.update(idx, surface)?;
        self.center_on(idx, surface)?;
        Ok(plan)
    }

    pub fn expand_all(
        &mut self,
        idx: Index,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<RenderPlan> {
        collapse::expand_all(&mut self.tree, idx)?;
        self.update(idx, surface)
    }

    pub fn collapse_all(
        &mut self,
        idx: Index,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<RenderPlan> {
        collapse::collapse_all(&mut self.tree, idx)?;
        self.update(idx, surface)
    }

    pub fn zoom(&mut self, factor: f64, surface: &mut dyn DrawingSurface) {
        self.camera.zoom_by(factor);
        surface.set_camera(&self.camera, 0.0);
    }

    /// Zoom around a screen point, e.g. under the mouse wheel.
    pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64, surface: &mut dyn DrawingSurface) {
        self.camera.zoom_at(sx, sy, factor);
        surface.set_camera(&self.camera, 0.0);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64, surface: &mut dyn DrawingSurface) {
        self.camera.pan_by(dx, dy);
        surface.set_camera(&self.camera, 0.0);
    }

    /// Start dragging `idx`. An unfinished drag is abandoned.
    pub fn begin_drag(&mut self, idx: Index) -> ApplicationResult<()> {
        let drag = DragSession::start(&self.tree, idx)?;
        if let Some(previous) = self.drag.replace(drag) {
            debug!("session: abandoning drag of <{}>", self.tree.name_of(previous.node()));
            previous.finish();
        }
        Ok(())
    }

    /// Follow the pointer by a screen delta.
    ///
    /// The dragged node and its shown descendants move together, along with
    /// the links into them. `pointer` is in viewport coordinates and drives
    /// boundary panning.
    pub fn drag_move(
        &mut self,
        dx: f64,
        dy: f64,
        pointer: (f64, f64),
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<Option<PanDirection>> {
        let drag = self.drag.as_mut().ok_or(DomainError::NoActiveDrag)?;
        let direction = drag.move_by(
            &mut self.tree,
            dx,
            dy,
            pointer,
            self.viewport,
            &self.settings.camera,
        )?;
        for idx in drag.payload(&self.tree) {
            let node = self.tree.node(idx)?;
            let Some(id) = node.id else {
                continue;
            };
            surface.move_node(id, node.position());
            if let Some(parent) = node.parent.and_then(|p| self.tree.get_node(p)) {
                surface.move_link(id, parent.position(), node.position());
            }
        }
        surface.draw_temp_link(drag.temp_link(&self.tree).as_ref());
        Ok(direction)
    }

    pub fn hover(&mut self, candidate: Index, surface: &mut dyn DrawingSurface) -> ApplicationResult<()> {
        let drag = self.drag.as_mut().ok_or(DomainError::NoActiveDrag)?;
        drag.hover(&self.tree, candidate)?;
        surface.draw_temp_link(drag.temp_link(&self.tree).as_ref());
        Ok(())
    }

    pub fn leave_hover(&mut self, surface: &mut dyn DrawingSurface) -> ApplicationResult<()> {
        let drag = self.drag.as_mut().ok_or(DomainError::NoActiveDrag)?;
        drag.leave_hover();
        surface.draw_temp_link(None);
        Ok(())
    }

    /// One boundary-pan step. Returns false when no pan is running.
    pub fn pan_tick(&mut self, surface: &mut dyn DrawingSurface) -> ApplicationResult<bool> {
        let drag = self.drag.as_mut().ok_or(DomainError::NoActiveDrag)?;
        let moved = drag
            .pan_task_mut()
            .is_some_and(|task| task.tick(&mut self.camera));
        if moved {
            surface.set_camera(&self.camera, 0.0);
        }
        Ok(moved)
    }

    /// Let time pass for the boundary pan. Returns the number of steps taken.
    pub fn advance_pan(
        &mut self,
        elapsed: Duration,
        surface: &mut dyn DrawingSurface,
    ) -> ApplicationResult<u32> {
        let drag = self.drag.as_mut().ok_or(DomainError::NoActiveDrag)?;
        let steps = match drag.pan_task_mut() {
            Some(task) => task.advance(elapsed, &mut self.camera),
            None => 0,
        };
        if steps > 0 {
            surface.set_camera(&self.camera, 0.0);
        }
        Ok(steps)
    }

    /// Drop the dragged node.
    ///
    /// With a valid candidate the node moves under it; otherwise the model is
    /// left alone and the redraw brings the node back. Either way the camera
    /// ends up centred on the dragged node.
    #[instrument(level = "debug", skip_all)]
    pub fn end_drag(&mut self, surface: &mut dyn DrawingSurface) -> ApplicationResult<RenderPlan> {
        let drag = self.drag.take().ok_or(DomainError::NoActiveDrag)?;
        let dragged = drag.node();
        let target = drag.finish();
        surface.draw_temp_link(None);

        if let Some(parent) = target.filter(|&p| self.tree.contains(p)) {
            self.reparent(dragged, parent)?;
        }

        let root = self.root()?;
        let plan = self.update(root, surface)?;
        self.center_on(dragged, surface)?;
        Ok(plan)
    }

    fn reparent(&mut self, dragged: Index, parent: Index) -> ApplicationResult<()> {
        if self.tree.is_within(parent, dragged) {
            return Err(DomainError::InvalidDropTarget(format!(
                "<{}> is inside the dragged subtree",
                self.tree.name_of(parent)
            ))
            .into());
        }
        let old_parent = self.tree.detach(dragged)?;
        if let Err(e) = self.tree.attach(dragged, parent) {
            self.tree.attach(dragged, old_parent)?;
            self.tree.sort_children(old_parent)?;
            return Err(e.into());
        }
        if self.tree.node(parent)?.is_collapsed() {
            collapse::expand_all(&mut self.tree, parent)?;
        }
        self.tree.sort_children(parent)?;
        debug!(
            "session: moved <{}> under <{}>",
            self.tree.name_of(dragged),
            self.tree.path_of(parent)
        );
        Ok(())
    }

    /// Number of nodes drawn by the last pass.
    pub fn rendered_count(&self) -> usize {
        self.reconciler.rendered_ids().count()
    }

    /// Number of nodes in the model below `idx`, itself included.
    pub fn subtree_size(&self, idx: Index) -> usize {
        self.tree.iter_from(idx, Scope::Logical).count()
    }
}
