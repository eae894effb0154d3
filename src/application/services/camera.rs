//! Zoom and pan state of the diagram viewport

use serde::Serialize;

use crate::config::CameraConfig;
use crate::domain::{Point, Viewport};

/// Scale and translation applied to the whole diagram.
///
/// Screen coordinates of a layout point `p` are
/// `(p.y * scale + tx, p.x * scale + ty)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
    #[serde(skip)]
    min_scale: f64,
    #[serde(skip)]
    max_scale: f64,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
        }
    }

    pub fn scale_extent(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    pub fn zoom_to(&mut self, scale: f64) {
        self.scale = self.clamp(scale);
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.zoom_to(self.scale * factor);
    }

    /// Zoom by `factor` keeping the screen point `(sx, sy)` in place.
    pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
        let wx = (sx - self.tx) / self.scale;
        let wy = (sy - self.ty) / self.scale;
        self.zoom_by(factor);
        self.tx = sx - wx * self.scale;
        self.ty = sy - wy * self.scale;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.tx += dx;
        self.ty += dy;
    }

    /// Translate so that `point` lands in the middle of the viewport.
    pub fn center_on(&mut self, point: Point, viewport: Viewport) {
        self.tx = -point.y * self.scale + viewport.width / 2.0;
        self.ty = -point.x * self.scale + viewport.height / 2.0;
    }

    pub fn to_screen(&self, point: Point) -> (f64, f64) {
        (
            point.y * self.scale + self.tx,
            point.x * self.scale + self.ty,
        )
    }
}
