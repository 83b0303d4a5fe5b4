//! Resolving where a connection starts and ends.

use crate::diagram::Diagram;
use crate::shapes::connection_point::nearest;
use crate::shapes::{LineEnds, LineMode, LineShape, OrthoDirection, ShapeId};
use kurbo::{Point, Rect, Vec2};

/// One resolved end of a connection, before clipping to the shape border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EndAnchor {
    /// Point the connection aims at: the attachment offset, a connection
    /// point, or the free coordinate.
    pub point: Point,
    /// The point is final and is not clipped to a border.
    pub fixed: bool,
    pub direction: OrthoDirection,
    pub shape: Option<ShapeId>,
    pub bounds: Rect,
}

impl EndAnchor {
    fn free(point: Point) -> Self {
        Self {
            point,
            fixed: true,
            direction: OrthoDirection::Undefined,
            shape: None,
            bounds: Rect::from_origin_size(point, kurbo::Size::ZERO),
        }
    }
}

/// Resolve both ends of `line`; `None` when a bound end refers to a missing
/// shape or to a connection that cannot be routed.
pub(crate) fn resolve(diagram: &Diagram, line: &LineShape) -> Option<(EndAnchor, EndAnchor)> {
    let (src, trg) = match line.ends {
        LineEnds::Free { src, trg } => (EndAnchor::free(src), EndAnchor::free(trg)),
        LineEnds::Bound { src, trg } => {
            let src = match line.mode {
                LineMode::SourceChanging => EndAnchor::free(line.unfinished_point),
                _ => bound(diagram, src, line.src_offset)?,
            };
            let trg = match (line.mode, trg) {
                (LineMode::UnderConstruction | LineMode::TargetChanging, _) | (_, None) => {
                    EndAnchor::free(line.unfinished_point)
                }
                (_, Some(trg)) => bound(diagram, trg, line.trg_offset)?,
            };
            (src, trg)
        }
    };
    Some((src, trg))
}

fn bound(diagram: &Diagram, id: ShapeId, offset: Option<Vec2>) -> Option<EndAnchor> {
    let node = diagram.get(id)?;
    if let Some(line) = node.line() {
        let points = super::line_points(diagram, id);
        if points.is_empty() {
            return None;
        }
        let point = super::dock_on_points(&points, line.dock_point);
        return Some(EndAnchor {
            shape: Some(id),
            ..EndAnchor::free(point)
        });
    }

    let bounds = diagram.bounding_box(id);
    let mut anchor = EndAnchor {
        point: offset
            .map(|o| {
                Point::new(
                    bounds.x0 + bounds.width() * o.x,
                    bounds.y0 + bounds.height() * o.y,
                )
            })
            .unwrap_or_else(|| bounds.center()),
        fixed: false,
        direction: OrthoDirection::Undefined,
        shape: Some(id),
        bounds,
    };
    if let Some(index) = nearest(&node.connection_points, bounds, anchor.point) {
        let cp = &node.connection_points[index];
        anchor.point = cp.position(bounds);
        anchor.fixed = true;
        anchor.direction = cp.ortho_direction;
    }
    Some(anchor)
}

/// Point where `end` leaves its shape when heading toward `toward`.
pub(crate) fn clip(diagram: &Diagram, end: &EndAnchor, toward: Point) -> Point {
    if end.fixed {
        return end.point;
    }
    match end.shape.and_then(|id| diagram.get(id)) {
        Some(node) => node.border_point(end.bounds, end.point, toward),
        None => end.point,
    }
}

/// Logical points of a straight-segmented connection.
pub(crate) fn direct_points(
    diagram: &Diagram,
    line: &LineShape,
    src: &EndAnchor,
    trg: &EndAnchor,
) -> Vec<Point> {
    if line.control_points.is_empty() {
        if let Some(points) = nested_points(diagram, src, trg) {
            return points;
        }
    }
    let first_aim = line.control_points.first().copied().unwrap_or(trg.point);
    let last_aim = line.control_points.last().copied().unwrap_or(src.point);

    let mut points = Vec::with_capacity(line.control_points.len() + 2);
    points.push(clip(diagram, src, first_aim));
    points.extend(line.control_points.iter().copied());
    points.push(clip(diagram, trg, last_aim));
    points
}

/// Ends of a connection between a shape and one of its descendants.
///
/// The center-to-center line would vanish inside the outer shape, so the
/// outer end snaps to the border nearest the inner shape instead.
fn nested_points(diagram: &Diagram, src: &EndAnchor, trg: &EndAnchor) -> Option<Vec<Point>> {
    let (src_id, trg_id) = (src.shape?, trg.shape?);
    if src.fixed || trg.fixed {
        return None;
    }
    let src_outer = if diagram.is_ancestor_of(src_id, trg_id) {
        true
    } else if diagram.is_ancestor_of(trg_id, src_id) {
        false
    } else {
        return None;
    };
    let (outer, inner) = if src_outer { (src, trg) } else { (trg, src) };
    let center = inner.bounds.center();
    if !crate::shapes::rect::contains(outer.bounds, center, 0.0) {
        return None;
    }

    let outer_point = nearest_edge_point(outer.bounds, center);
    let inner_point = clip(diagram, inner, outer_point);
    Some(if src_outer {
        vec![outer_point, inner_point]
    } else {
        vec![inner_point, outer_point]
    })
}

/// Projection of `p` onto the nearest edge of `rect`.
fn nearest_edge_point(rect: Rect, p: Point) -> Point {
    let candidates = [
        (p.x - rect.x0, Point::new(rect.x0, p.y)),
        (rect.x1 - p.x, Point::new(rect.x1, p.y)),
        (p.y - rect.y0, Point::new(p.x, rect.y0)),
        (rect.y1 - p.y, Point::new(p.x, rect.y1)),
    ];
    candidates
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, point)| point)
        .unwrap_or(p)
}

/// Attachment offset of `point` on `bounds`, as fractions of its size clamped to the box.
pub fn relative_offset(bounds: Rect, point: Point) -> Vec2 {
    let fx = if bounds.width() > 0.0 {
        ((point.x - bounds.x0) / bounds.width()).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let fy = if bounds.height() > 0.0 {
        ((point.y - bounds.y0) / bounds.height()).clamp(0.0, 1.0)
    } else {
        0.5
    };
    Vec2::new(fx, fy)
}
