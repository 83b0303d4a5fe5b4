//! Catmull-Rom curve routing.

use super::RoutedLine;
use kurbo::Point;

/// Bounding box margin covering curve overshoot.
pub const SPLINE_MARGIN: f64 = 20.0;

/// Chord length per sampling step.
pub const STEP_DIVISOR: f64 = 10.0;

pub const MIN_STEPS: usize = 10;

/// Upper bound on samples per segment.
pub const MAX_STEPS: usize = 1000;

/// Point at `t` on the Catmull-Rom segment between `p1` and `p2`.
pub fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    let eval = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    Point::new(eval(p0.x, p1.x, p2.x, p3.x), eval(p0.y, p1.y, p2.y, p3.y))
}

/// Sample count for a segment of the given chord length.
pub fn steps_for(chord: f64) -> usize {
    ((chord / STEP_DIVISOR) as usize).clamp(MIN_STEPS, MAX_STEPS)
}

/// Sample every segment through `points`; the extremities are doubled so the
/// curve passes through the first and last point.
pub(super) fn route(points: &[Point]) -> RoutedLine {
    if points.len() < 2 {
        return RoutedLine::from_segments(points.to_vec(), Vec::new());
    }
    let mut extended = Vec::with_capacity(points.len() + 2);
    extended.push(points[0]);
    extended.extend_from_slice(points);
    extended.push(points[points.len() - 1]);

    let segments = extended
        .windows(4)
        .map(|w| sample_segment(w[0], w[1], w[2], w[3]))
        .collect();
    RoutedLine::from_segments(points.to_vec(), segments)
}

fn sample_segment(p0: Point, p1: Point, p2: Point, p3: Point) -> Vec<Point> {
    let steps = steps_for(p1.distance(p2));
    let mut samples = Vec::with_capacity(steps + 1);
    samples.push(p1);
    for i in 1..steps {
        samples.push(catmull_rom(p0, p1, p2, p3, i as f64 / steps as f64));
    }
    samples.push(p2);
    samples
}
