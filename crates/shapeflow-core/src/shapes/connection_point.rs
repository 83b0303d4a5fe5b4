//! Named anchors where connections attach to a shape.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Position of a connection point on its shape's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    TopLeft,
    TopMiddle,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
    /// Relative position in percent of the bounding box (0..=100).
    Custom { x: f64, y: f64 },
}

/// Direction an orthogonal connection must leave the point in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrthoDirection {
    #[default]
    Undefined,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub anchor: Anchor,
    #[serde(default)]
    pub ortho_direction: OrthoDirection,
    #[serde(skip, default = "enabled")]
    pub serialized: bool,
}

fn enabled() -> bool {
    true
}

impl ConnectionPoint {
    pub fn new(anchor: Anchor) -> Self {
        Self {
            anchor,
            ortho_direction: OrthoDirection::Undefined,
            serialized: true,
        }
    }

    pub fn with_direction(mut self, direction: OrthoDirection) -> Self {
        self.ortho_direction = direction;
        self
    }

    /// Absolute position on a shape occupying `bounds`.
    pub fn position(&self, bounds: Rect) -> Point {
        let (fx, fy) = match self.anchor {
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::TopMiddle => (0.5, 0.0),
            Anchor::TopRight => (1.0, 0.0),
            Anchor::CenterLeft => (0.0, 0.5),
            Anchor::Center => (0.5, 0.5),
            Anchor::CenterRight => (1.0, 0.5),
            Anchor::BottomLeft => (0.0, 1.0),
            Anchor::BottomMiddle => (0.5, 1.0),
            Anchor::BottomRight => (1.0, 1.0),
            Anchor::Custom { x, y } => (x / 100.0, y / 100.0),
        };
        Point::new(
            bounds.x0 + bounds.width() * fx,
            bounds.y0 + bounds.height() * fy,
        )
    }
}

/// Index of the connection point nearest to `pos`, if any are defined.
pub fn nearest(points: &[ConnectionPoint], bounds: Rect, pos: Point) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(i, cp)| (i, cp.position(bounds).distance(pos)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
