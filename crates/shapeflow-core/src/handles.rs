//! Manipulation handles of selected shapes.

use crate::diagram::Diagram;
use crate::draw::DrawingSurface;
use crate::shapes::{ShapeId, StyleFlags};
use kurbo::{Point, Rect, Vec2};

/// Handle edge length in device pixels.
pub const HANDLE_SIZE: f64 = 7.0;

/// Smallest box a resize can produce.
pub const MIN_SHAPE_SIZE: f64 = 1.0;

/// What dragging a handle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    LineStart,
    LineEnd,
    /// Index into the connection's control points.
    LineControl(usize),
}

impl HandleKind {
    pub fn is_line_handle(self) -> bool {
        matches!(
            self,
            HandleKind::LineStart | HandleKind::LineEnd | HandleKind::LineControl(_)
        )
    }
}

/// Visual shape of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleShape {
    #[default]
    Square,
    /// Connection ends.
    Circle,
    /// Connection control points.
    Diamond,
}

/// A handle of one shape, in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub shape_id: ShapeId,
    pub kind: HandleKind,
    pub position: Point,
    pub shape: HandleShape,
}

impl Handle {
    pub fn new(shape_id: ShapeId, kind: HandleKind, position: Point) -> Self {
        let shape = match kind {
            HandleKind::LineStart | HandleKind::LineEnd => HandleShape::Circle,
            HandleKind::LineControl(_) => HandleShape::Diamond,
            _ => HandleShape::Square,
        };
        Self {
            shape_id,
            kind,
            position,
            shape,
        }
    }

    /// Square occupied by the handle at `zoom`.
    pub fn rect(&self, zoom: f64) -> Rect {
        let half = HANDLE_SIZE / zoom.max(f64::EPSILON) / 2.0;
        Rect::from_center_size(self.position, (half * 2.0, half * 2.0))
    }

    pub fn hit_test(&self, point: Point, zoom: f64) -> bool {
        self.rect(zoom).contains(point)
    }

    pub fn draw(&self, surface: &mut dyn DrawingSurface, zoom: f64) {
        let r = self.rect(zoom);
        match self.shape {
            HandleShape::Square => surface.draw_polygon(&crate::shapes::rect::outline(r)),
            HandleShape::Circle => surface.draw_circle(self.position, r.width() / 2.0),
            HandleShape::Diamond => {
                let c = r.center();
                surface.draw_polygon(&[
                    Point::new(c.x, r.y0),
                    Point::new(r.x1, c.y),
                    Point::new(c.x, r.y1),
                    Point::new(r.x0, c.y),
                ]);
            }
        }
    }
}

/// Handles of shape `id`: eight resize handles for resizable boxes; start,
/// end and control point handles for connections.
pub fn handles_for(diagram: &Diagram, id: ShapeId) -> Vec<Handle> {
    let Some(node) = diagram.get(id) else {
        return Vec::new();
    };
    if let Some(line) = node.line() {
        let points = diagram.route(id).points;
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            return Vec::new();
        };
        let mut handles = Vec::with_capacity(line.control_points.len() + 2);
        handles.push(Handle::new(id, HandleKind::LineStart, first));
        for (i, &p) in line.control_points.iter().enumerate() {
            handles.push(Handle::new(id, HandleKind::LineControl(i), p));
        }
        handles.push(Handle::new(id, HandleKind::LineEnd, last));
        return handles;
    }
    if !node.contains_style(StyleFlags::SIZE_CHANGE) {
        return Vec::new();
    }

    let b = diagram.bounding_box(id);
    let c = b.center();
    [
        (HandleKind::TopLeft, Point::new(b.x0, b.y0)),
        (HandleKind::Top, Point::new(c.x, b.y0)),
        (HandleKind::TopRight, Point::new(b.x1, b.y0)),
        (HandleKind::Right, Point::new(b.x1, c.y)),
        (HandleKind::BottomRight, Point::new(b.x1, b.y1)),
        (HandleKind::Bottom, Point::new(c.x, b.y1)),
        (HandleKind::BottomLeft, Point::new(b.x0, b.y1)),
        (HandleKind::Left, Point::new(b.x0, c.y)),
    ]
    .into_iter()
    .map(|(kind, p)| Handle::new(id, kind, p))
    .collect()
}

/// Bounds after dragging a box handle of `kind` by `delta`.
///
/// The opposite edges stay put and the box never shrinks below
/// [`MIN_SHAPE_SIZE`].
pub fn resize_rect(bounds: Rect, kind: HandleKind, delta: Vec2) -> Rect {
    let mut r = bounds;
    let (left, right, top, bottom) = match kind {
        HandleKind::TopLeft => (true, false, true, false),
        HandleKind::Top => (false, false, true, false),
        HandleKind::TopRight => (false, true, true, false),
        HandleKind::Right => (false, true, false, false),
        HandleKind::BottomRight => (false, true, false, true),
        HandleKind::Bottom => (false, false, false, true),
        HandleKind::BottomLeft => (true, false, false, true),
        HandleKind::Left => (true, false, false, false),
        _ => return bounds,
    };
    if left {
        r.x0 = (r.x0 + delta.x).min(r.x1 - MIN_SHAPE_SIZE);
    }
    if right {
        r.x1 = (r.x1 + delta.x).max(r.x0 + MIN_SHAPE_SIZE);
    }
    if top {
        r.y0 = (r.y0 + delta.y).min(r.y1 - MIN_SHAPE_SIZE);
    }
    if bottom {
        r.y1 = (r.y1 + delta.y).max(r.y0 + MIN_SHAPE_SIZE);
    }
    r
}

/// Handle of any shape in `ids` under `point`, last shape first.
pub fn handle_at(diagram: &Diagram, ids: &[ShapeId], point: Point, zoom: f64) -> Option<Handle> {
    ids.iter()
        .rev()
        .flat_map(|&id| handles_for(diagram, id))
        .find(|h| h.hit_test(point, zoom))
}
