//! Rectangle geometry shared by all box-like shapes.

use super::segment_intersection;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Size and corner data of rectangles, rounded rectangles, ellipses and circles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub size: Size,
    /// Corner radius, used by rounded rectangles only.
    pub corner_radius: f64,
}

impl RectShape {
    pub const DEFAULT_SIZE: Size = Size::new(100.0, 50.0);
    pub const DEFAULT_RADIUS: f64 = 20.0;

    pub fn new(size: Size) -> Self {
        Self {
            size,
            corner_radius: 0.0,
        }
    }
}

impl Default for RectShape {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

/// Normalized rectangle spanned by two corners.
pub fn from_corners(p1: Point, p2: Point) -> Rect {
    Rect::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.x.max(p2.x), p1.y.max(p2.y))
}

/// Intersection of the segment `start -> end` with the border of `rect`.
///
/// Falls back to the rectangle's center when the segment does not cross the border.
pub fn border_point(rect: Rect, start: Point, end: Point) -> Point {
    let corners = outline(rect);
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        if let Some(p) = segment_intersection(a, b, start, end) {
            return p;
        }
    }
    rect.center()
}

/// Inclusive containment test with an optional tolerance margin.
pub fn contains(rect: Rect, point: Point, tolerance: f64) -> bool {
    point.x >= rect.x0 - tolerance
        && point.x <= rect.x1 + tolerance
        && point.y >= rect.y0 - tolerance
        && point.y <= rect.y1 + tolerance
}

/// Whether `outer` fully covers `inner`.
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Corners in clockwise order starting at the top-left.
pub fn outline(rect: Rect) -> Vec<Point> {
    vec![
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners() {
        let rect = from_corners(Point::new(100.0, 100.0), Point::new(50.0, 50.0));
        assert!((rect.x0 - 50.0).abs() < f64::EPSILON);
        assert!((rect.y0 - 50.0).abs() < f64::EPSILON);
        assert!((rect.width() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_border_point_towards_right() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let p = border_point(rect, rect.center(), Point::new(250.0, 25.0));
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_border_point_falls_back_to_center() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let p = border_point(rect, Point::new(10.0, 10.0), Point::new(20.0, 20.0));
        assert_eq!(p, rect.center());
    }

    #[test]
    fn test_contains_with_tolerance() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(contains(rect, Point::new(100.0, 100.0), 0.0));
        assert!(!contains(rect, Point::new(105.0, 50.0), 0.0));
        assert!(contains(rect, Point::new(105.0, 50.0), 10.0));
    }
}
