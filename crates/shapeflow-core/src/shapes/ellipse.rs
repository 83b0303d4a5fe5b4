//! Ellipse and circle geometry.

use kurbo::{Point, Rect};
use std::f64::consts::TAU;

/// Samples used when an ellipse outline is approximated by a polygon.
pub const OUTLINE_SEGMENTS: usize = 48;

/// Point where the ray from `start` towards `end` leaves the ellipse inscribed in `rect`.
pub fn border_point(rect: Rect, start: Point, end: Point) -> Point {
    let center = rect.center();
    let a = rect.width() / 2.0;
    let b = rect.height() / 2.0;
    let d = end - start;
    if a <= 0.0 || b <= 0.0 || d.hypot2() < f64::EPSILON {
        return center;
    }

    // Solve |((start + t*d) - center) / (a, b)| = 1 for the largest t.
    let s = start - center;
    let qa = (d.x / a).powi(2) + (d.y / b).powi(2);
    let qb = 2.0 * (s.x * d.x / (a * a) + s.y * d.y / (b * b));
    let qc = (s.x / a).powi(2) + (s.y / b).powi(2) - 1.0;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return center;
    }
    let t = (-qb + disc.sqrt()) / (2.0 * qa);
    start + d * t
}

pub fn contains(rect: Rect, point: Point, tolerance: f64) -> bool {
    let a = rect.width() / 2.0 + tolerance;
    let b = rect.height() / 2.0 + tolerance;
    if a <= 0.0 || b <= 0.0 {
        return false;
    }
    let c = rect.center();
    ((point.x - c.x) / a).powi(2) + ((point.y - c.y) / b).powi(2) <= 1.0
}

pub fn outline(rect: Rect) -> Vec<Point> {
    let c = rect.center();
    let a = rect.width() / 2.0;
    let b = rect.height() / 2.0;
    (0..OUTLINE_SEGMENTS)
        .map(|i| {
            let angle = TAU * i as f64 / OUTLINE_SEGMENTS as f64;
            Point::new(c.x + a * angle.cos(), c.y + b * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_border_point() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let p = border_point(rect, rect.center(), Point::new(200.0, 50.0));
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ellipse_border_point_diagonal() {
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let p = border_point(rect, rect.center(), Point::new(300.0, 150.0));
        let c = rect.center();
        let v = ((p.x - c.x) / 100.0).powi(2) + ((p.y - c.y) / 50.0).powi(2);
        assert!((v - 1.0).abs() < 1e-9);
        assert!(p.x > c.x && p.y > c.y);
    }

    #[test]
    fn test_contains() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(contains(rect, Point::new(50.0, 50.0), 0.0));
        assert!(!contains(rect, Point::new(2.0, 2.0), 0.0));
    }

    #[test]
    fn test_outline_on_ellipse() {
        let rect = Rect::new(0.0, 0.0, 40.0, 20.0);
        let points = outline(rect);
        assert_eq!(points.len(), OUTLINE_SEGMENTS);
        assert!((points[0].x - 40.0).abs() < 1e-9);
        assert!((points[0].y - 10.0).abs() < 1e-9);
    }
}
