//! Axis-aligned routing.
//!
//! Each logical segment becomes two or three axis-aligned pieces. Two pieces
//! (one bend) are used only when the two ends demand different directions
//! through their connection points. Otherwise the segment bends twice
//! around its midpoint, leaving horizontally or vertically as the ends
//! demand, or by aspect ratio when neither end has a preference. When both
//! ends demand a direction the source's demand is applied to the first
//! piece.

use super::RoutedLine;
use super::endpoints::{EndAnchor, clip};
use crate::diagram::Diagram;
use crate::shapes::{LineShape, OrthoDirection};
use kurbo::Point;

/// Direction of the first piece of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bend {
    HorizontalFirst,
    VerticalFirst,
}

/// Bend direction and piece count for a segment from `a` to `b`.
///
/// Returns `(bend, two_pieces)`.
pub fn plan(a: Point, b: Point, start: OrthoDirection, end: OrthoDirection) -> (Bend, bool) {
    use OrthoDirection::{Horizontal, Undefined, Vertical};
    match (start, end) {
        (Horizontal, Vertical) => (Bend::HorizontalFirst, true),
        (Vertical, Horizontal) => (Bend::VerticalFirst, true),
        (Horizontal, _) | (Undefined, Horizontal) => (Bend::HorizontalFirst, false),
        (Vertical, _) | (Undefined, Vertical) => (Bend::VerticalFirst, false),
        (Undefined, Undefined) => {
            let dx = (b.x - a.x).abs();
            let dy = (b.y - a.y).abs();
            if dx == 0.0 || dy / dx >= 1.0 {
                (Bend::VerticalFirst, false)
            } else {
                (Bend::HorizontalFirst, false)
            }
        }
    }
}

/// Bend points strictly between `a` and `b`.
pub fn bends(a: Point, b: Point, bend: Bend, two_pieces: bool) -> Vec<Point> {
    let mid = a.midpoint(b);
    match (bend, two_pieces) {
        (Bend::HorizontalFirst, true) => vec![Point::new(b.x, a.y)],
        (Bend::VerticalFirst, true) => vec![Point::new(a.x, b.y)],
        (Bend::HorizontalFirst, false) => vec![Point::new(mid.x, a.y), Point::new(mid.x, b.y)],
        (Bend::VerticalFirst, false) => vec![Point::new(a.x, mid.y), Point::new(b.x, mid.y)],
    }
}

pub(super) fn route(
    diagram: &Diagram,
    line: &LineShape,
    src: &EndAnchor,
    trg: &EndAnchor,
) -> RoutedLine {
    let mut anchors = Vec::with_capacity(line.control_points.len() + 2);
    anchors.push(src.point);
    anchors.extend(line.control_points.iter().copied());
    anchors.push(trg.point);
    let last = anchors.len() - 2;

    let mut plans = Vec::with_capacity(last + 1);
    for i in 0..=last {
        let start = if i == 0 { src.direction } else { OrthoDirection::Undefined };
        let end = if i == last { trg.direction } else { OrthoDirection::Undefined };
        let (bend, two) = plan(anchors[i], anchors[i + 1], start, end);
        plans.push((bend, two, bends(anchors[i], anchors[i + 1], bend, two)));
    }

    // Box ends leave their border along the first and last piece.
    let first_bend = plans[0].2.first().copied().unwrap_or(anchors[1]);
    let last_bend = plans[last].2.last().copied().unwrap_or(anchors[last]);
    let mut points = anchors;
    points[0] = clip(diagram, src, first_bend);
    let end = points.len() - 1;
    points[end] = clip(diagram, trg, last_bend);

    let segments = plans
        .into_iter()
        .enumerate()
        .map(|(i, (_, _, bend_points))| {
            let mut piece = Vec::with_capacity(bend_points.len() + 2);
            piece.push(points[i]);
            piece.extend(bend_points);
            piece.push(points[i + 1]);
            piece.dedup_by(|a, b| (*a - *b).hypot2() < 1e-18);
            piece
        })
        .collect();
    RoutedLine::from_segments(points, segments)
}
