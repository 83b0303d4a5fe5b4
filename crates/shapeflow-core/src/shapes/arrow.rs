//! Arrow heads decorating connection ends.

use crate::draw::DrawingSurface;
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

/// Decoration drawn at one end of a connection.
///
/// Glyphs are defined pointing along +x with the tip at the origin and are
/// rotated onto the approach vector of the line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ArrowHead {
    #[default]
    None,
    Open { size: f64 },
    Solid { size: f64 },
    Diamond { size: f64 },
    Circle { radius: f64 },
}

impl ArrowHead {
    pub const DEFAULT_SIZE: f64 = 10.0;

    pub fn open() -> Self {
        ArrowHead::Open {
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn solid() -> Self {
        ArrowHead::Solid {
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn diamond() -> Self {
        ArrowHead::Diamond {
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn circle() -> Self {
        ArrowHead::Circle {
            radius: Self::DEFAULT_SIZE / 2.0,
        }
    }

    /// Transform placing the glyph tip at `to`, pointing away from `from`.
    fn placement(from: Point, to: Point) -> Affine {
        let d = to - from;
        Affine::translate(to.to_vec2()) * Affine::rotate(d.y.atan2(d.x))
    }

    /// Distance the glyph reaches back along the line from the tip.
    fn depth(&self) -> f64 {
        match *self {
            ArrowHead::None | ArrowHead::Open { .. } => 0.0,
            ArrowHead::Solid { size } => size,
            ArrowHead::Diamond { size } => size * 2.0,
            ArrowHead::Circle { radius } => radius * 2.0,
        }
    }

    /// Where the plain line should stop so it does not overdraw the glyph.
    pub fn line_end(&self, from: Point, to: Point) -> Point {
        let d = to - from;
        let len = d.hypot();
        let depth = self.depth();
        if len < f64::EPSILON || depth <= 0.0 {
            return to;
        }
        to - d * (depth.min(len) / len)
    }

    /// Draw the glyph at the `to` end of the segment `from -> to`.
    pub fn draw(&self, surface: &mut dyn DrawingSurface, from: Point, to: Point) {
        if (to - from).hypot2() < f64::EPSILON {
            return;
        }
        let t = Self::placement(from, to);
        match *self {
            ArrowHead::None => {}
            ArrowHead::Open { size } => {
                let left = t * Point::new(-size, -size / 2.0);
                let right = t * Point::new(-size, size / 2.0);
                surface.draw_line(left, to);
                surface.draw_line(to, right);
            }
            ArrowHead::Solid { size } => {
                let points = [
                    Point::ZERO,
                    Point::new(-size, -size / 2.0),
                    Point::new(-size, size / 2.0),
                ];
                surface.draw_polygon(&points.map(|p| t * p));
            }
            ArrowHead::Diamond { size } => {
                let points = [
                    Point::ZERO,
                    Point::new(-size, -size / 2.0),
                    Point::new(-size * 2.0, 0.0),
                    Point::new(-size, size / 2.0),
                ];
                surface.draw_polygon(&points.map(|p| t * p));
            }
            ArrowHead::Circle { radius } => {
                surface.draw_circle(t * Point::new(-radius, 0.0), radius);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawCommand, RecordingSurface};

    #[test]
    fn test_circle_arrow_shortens_line() {
        let arrow = ArrowHead::Circle { radius: 5.0 };
        let end = arrow.line_end(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!((end.x - 90.0).abs() < 1e-9);
        assert!(end.y.abs() < 1e-9);
    }

    #[test]
    fn test_open_arrow_keeps_line() {
        let arrow = ArrowHead::open();
        let to = Point::new(0.0, 50.0);
        assert_eq!(arrow.line_end(Point::ZERO, to), to);
    }

    #[test]
    fn test_solid_arrow_rotated_to_approach() {
        let mut surface = RecordingSurface::default();
        let head = ArrowHead::Solid { size: 10.0 };
        head.draw(&mut surface, Point::new(0.0, 0.0), Point::new(0.0, 100.0));
        let DrawCommand::Polygon(points) = &surface.commands[0] else {
            panic!("expected polygon");
        };
        assert!((points[0].y - 100.0).abs() < 1e-9);
        // Base of the triangle sits above the tip when pointing down.
        assert!((points[1].y - 90.0).abs() < 1e-9);
        assert!((points[2].y - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_circle_arrow_centered_behind_tip() {
        let mut surface = RecordingSurface::default();
        ArrowHead::Circle { radius: 4.0 }.draw(&mut surface, Point::ZERO, Point::new(50.0, 0.0));
        assert_eq!(
            surface.commands,
            vec![DrawCommand::Circle(Point::new(46.0, 0.0), 4.0)]
        );
    }
}
