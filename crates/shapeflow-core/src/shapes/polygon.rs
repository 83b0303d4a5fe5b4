//! Polygon and diamond shapes.

use super::segment_intersection;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Polygon defined by vertices relative to the shape's top-left corner.
///
/// Vertices are kept normalized so that their extents start at the origin and
/// span exactly `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonShape {
    pub size: Size,
    pub vertices: Vec<Point>,
    /// Attach connections to the nearest vertex instead of the border.
    pub connect_to_vertex: bool,
}

impl PolygonShape {
    pub fn new(vertices: Vec<Point>) -> Self {
        let mut polygon = Self {
            size: Size::ZERO,
            vertices,
            connect_to_vertex: false,
        };
        polygon.normalize();
        polygon
    }

    pub fn diamond(size: Size) -> Self {
        Self {
            size,
            vertices: diamond_vertices(size),
            connect_to_vertex: false,
        }
    }

    /// Shift vertices to the origin and fit `size` to their extents.
    pub fn normalize(&mut self) {
        if self.vertices.is_empty() {
            self.size = Size::ZERO;
            return;
        }
        let (min, max) = extents(&self.vertices);
        let offset = Vec2::new(min.x, min.y);
        for v in &mut self.vertices {
            *v -= offset;
        }
        self.size = Size::new(max.x - min.x, max.y - min.y);
    }

    /// Resize, scaling the vertices proportionally.
    pub fn set_size(&mut self, size: Size) {
        let sx = if self.size.width > 0.0 { size.width / self.size.width } else { 1.0 };
        let sy = if self.size.height > 0.0 { size.height / self.size.height } else { 1.0 };
        for v in &mut self.vertices {
            v.x *= sx;
            v.y *= sy;
        }
        self.size = size;
    }

    /// Vertices translated to absolute coordinates.
    pub fn absolute_vertices(&self, origin: Point) -> Vec<Point> {
        self.vertices.iter().map(|v| origin + v.to_vec2()).collect()
    }

    pub fn border_point(&self, rect: Rect, start: Point, end: Point) -> Point {
        let vertices = self.absolute_vertices(rect.origin());
        if vertices.len() < 3 {
            return rect.center();
        }

        if self.connect_to_vertex {
            return vertices
                .iter()
                .copied()
                .min_by(|a, b| a.distance(end).total_cmp(&b.distance(end)))
                .unwrap_or_else(|| rect.center());
        }

        let mut best: Option<Point> = None;
        for i in 0..vertices.len() {
            let a = vertices[i];
            let b = vertices[(i + 1) % vertices.len()];
            if let Some(p) = segment_intersection(a, b, start, end) {
                best = match best {
                    Some(prev) if prev.distance(end) <= p.distance(end) => Some(prev),
                    _ => Some(p),
                };
            }
        }
        best.unwrap_or_else(|| rect.center())
    }

    /// Even-odd containment test.
    pub fn contains(&self, origin: Point, point: Point) -> bool {
        let vertices = self.absolute_vertices(origin);
        let mut inside = false;
        let mut j = vertices.len().wrapping_sub(1);
        for i in 0..vertices.len() {
            let (vi, vj) = (vertices[i], vertices[j]);
            if (vi.y > point.y) != (vj.y > point.y)
                && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Vertices of a diamond inscribed in a box of `size`.
pub fn diamond_vertices(size: Size) -> Vec<Point> {
    vec![
        Point::new(size.width / 2.0, 0.0),
        Point::new(size.width, size.height / 2.0),
        Point::new(size.width / 2.0, size.height),
        Point::new(0.0, size.height / 2.0),
    ]
}

fn extents(points: &[Point]) -> (Point, Point) {
    let mut min = Point::new(f64::MAX, f64::MAX);
    let mut max = Point::new(f64::MIN, f64::MIN);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}
