//! Domain entities: value types shared by the model, layout and interactions

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Element attributes, kept in document order.
pub type Attributes = IndexMap<String, String>;

/// Render identity of a node.
///
/// Assigned the first time a node takes part in a render pass and never
/// changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position in layout space.
///
/// `x` runs across the tree (between siblings), `y` runs along depth.
/// On screen the diagram is drawn left to right, so a point is projected
/// as `(y, x)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`, `t` in [0, 1].
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Visible area supplied by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 600.0)
    }
}

/// Editable view of a node, as shown in a detail panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    /// Element tag
    pub name: String,
    /// Text value, only offered for nodes without children
    pub text: Option<String>,
    /// Attribute name/value pairs in document order
    pub attributes: Vec<(String, String)>,
}

impl FieldSet {
    /// Set an attribute value in the field set, keeping its position.
    ///
    /// Returns false when the attribute is not part of the field set.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => {
                *v = value.into();
                true
            }
            None => false,
        }
    }
}
