//! Connection routing.
//!
//! A connection's geometry is never stored; it is resolved from the shapes
//! it is bound to whenever it is queried. [`route`] produces the logical
//! points (source, control points, target) and, per logical segment, the
//! sub-segments that are actually drawn. The routing strategy follows the
//! connection's type: straight for `Line`, axis-aligned bends for
//! `OrthoLine`, and sampled Catmull-Rom curves for `CurveLine`.

pub(crate) mod endpoints;
pub mod orthogonal;
pub mod spline;

pub use endpoints::relative_offset;

use crate::diagram::Diagram;
use crate::shapes::{DockPoint, Routing, ShapeId, point_to_polyline_dist};
use kurbo::Point;

/// Resolved geometry of a connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedLine {
    /// Source point, control points and target point.
    pub points: Vec<Point>,
    /// Drawn polyline of each logical segment, including both of its ends.
    pub segments: Vec<Vec<Point>>,
}

impl RoutedLine {
    fn from_segments(points: Vec<Point>, segments: Vec<Vec<Point>>) -> Self {
        Self { points, segments }
    }

    /// Straight segments between consecutive logical points.
    fn straight(points: Vec<Point>) -> Self {
        let segments = points.windows(2).map(|w| w.to_vec()).collect();
        Self { points, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of drawn line pieces over all logical segments.
    pub fn sub_segment_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.len().saturating_sub(1))
            .sum()
    }

    /// The whole drawn path as one polyline.
    pub fn polyline(&self) -> Vec<Point> {
        let mut result: Vec<Point> = Vec::new();
        for segment in &self.segments {
            for &p in segment {
                if result.last() != Some(&p) {
                    result.push(p);
                }
            }
        }
        result
    }

    /// Whether `point` is within `tolerance` of any drawn sub-segment.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.segments
            .iter()
            .any(|s| point_to_polyline_dist(point, s) <= tolerance)
    }

    /// Index of the logical segment nearest to `point`, if any is within `tolerance`.
    pub fn segment_at(&self, point: Point, tolerance: f64) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, s)| (i, point_to_polyline_dist(point, s)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Approach vector at the source: `(from, to)` with `to` on the source end.
    pub fn start_approach(&self) -> Option<(Point, Point)> {
        let polyline = self.polyline();
        match polyline.as_slice() {
            [first, second, ..] => Some((*second, *first)),
            _ => None,
        }
    }

    /// Approach vector at the target: `(from, to)` with `to` on the target end.
    pub fn end_approach(&self) -> Option<(Point, Point)> {
        let polyline = self.polyline();
        match polyline.as_slice() {
            [.., before, last] => Some((*before, *last)),
            _ => None,
        }
    }
}

/// Route connection `id`.
///
/// Unknown IDs, non-connections and connections with dangling ends yield an
/// empty route, as does nesting connections-on-connections too deeply.
pub fn route(diagram: &Diagram, id: ShapeId) -> RoutedLine {
    let Some(node) = diagram.get(id) else {
        return RoutedLine::default();
    };
    let Some(line) = node.line() else {
        return RoutedLine::default();
    };
    let Some(_guard) = diagram.enter_routing() else {
        log::warn!("Connection {} nests too deeply to be routed", id);
        return RoutedLine::default();
    };
    let Some((src, trg)) = endpoints::resolve(diagram, line) else {
        log::warn!("Connection {} refers to a missing shape", id);
        return RoutedLine::default();
    };

    match node.shape_type().routing().unwrap_or(Routing::Straight) {
        Routing::Straight => {
            RoutedLine::straight(endpoints::direct_points(diagram, line, &src, &trg))
        }
        Routing::Orthogonal => orthogonal::route(diagram, line, &src, &trg),
        Routing::Spline => spline::route(&endpoints::direct_points(diagram, line, &src, &trg)),
    }
}

/// Logical points of connection `id`: source, control points, target.
pub fn line_points(diagram: &Diagram, id: ShapeId) -> Vec<Point> {
    route(diagram, id).points
}

/// Absolute position of `dock` on connection `id`.
pub fn dock_point_position(diagram: &Diagram, id: ShapeId, dock: DockPoint) -> Point {
    let points = line_points(diagram, id);
    dock_on_points(&points, dock)
}

fn dock_on_points(points: &[Point], dock: DockPoint) -> Point {
    let Some(&first) = points.first() else {
        return Point::ZERO;
    };
    let last = points[points.len() - 1];
    match dock {
        DockPoint::Start => first,
        DockPoint::End => last,
        DockPoint::Control(i) if i + 1 < points.len() - 1 => points[i + 1],
        DockPoint::Control(_) | DockPoint::Center => {
            let n = points.len();
            if n % 2 == 1 {
                points[n / 2]
            } else {
                points[n / 2 - 1].midpoint(points[n / 2])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ShapeNode, ShapeType};
    use kurbo::Size;

    fn boxes(diagram: &mut Diagram) -> (ShapeId, ShapeId) {
        let a = ShapeNode::rect(Point::new(0.0, 0.0), Size::new(100.0, 50.0))
            .accepting_everything();
        let b = ShapeNode::rect(Point::new(200.0, 0.0), Size::new(100.0, 50.0))
            .accepting_everything();
        (diagram.add_shape(a, None).unwrap(), diagram.add_shape(b, None).unwrap())
    }

    #[test]
    fn test_straight_route_clips_to_borders() {
        let mut diagram = Diagram::new();
        let (a, b) = boxes(&mut diagram);
        let line = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        let routed = diagram.route(line);
        assert_eq!(routed.points, vec![Point::new(100.0, 25.0), Point::new(200.0, 25.0)]);
        assert_eq!(routed.sub_segment_count(), 1);
        assert!(routed.hit_test(Point::new(150.0, 27.0), 5.0));
        assert!(!routed.hit_test(Point::new(150.0, 40.0), 5.0));
    }

    #[test]
    fn test_dangling_route_is_empty() {
        let mut diagram = Diagram::new();
        let (a, b) = boxes(&mut diagram);
        let line = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        diagram
            .get_mut(line)
            .unwrap()
            .line_mut()
            .unwrap()
            .set_trg_shape(Some(uuid::Uuid::new_v4()));
        assert!(diagram.route(line).is_empty());
        assert_eq!(diagram.bounding_box(line), kurbo::Rect::ZERO);
        assert!(route(&diagram, a).is_empty());
    }

    #[test]
    fn test_dock_points() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        assert_eq!(dock_on_points(&points, DockPoint::Start), points[0]);
        assert_eq!(dock_on_points(&points, DockPoint::End), points[2]);
        assert_eq!(dock_on_points(&points, DockPoint::Center), points[1]);
        assert_eq!(dock_on_points(&points, DockPoint::Control(0)), points[1]);
        // Out of range falls back to the center.
        assert_eq!(dock_on_points(&points, DockPoint::Control(5)), points[1]);
        assert_eq!(
            dock_on_points(&points[..2], DockPoint::Center),
            Point::new(5.0, 0.0)
        );
        assert_eq!(dock_on_points(&[], DockPoint::Center), Point::ZERO);
    }

    #[test]
    fn test_approach_vectors() {
        let routed = RoutedLine::straight(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        assert_eq!(routed.start_approach(), Some((Point::new(10.0, 0.0), Point::ZERO)));
        assert_eq!(
            routed.end_approach(),
            Some((Point::new(10.0, 0.0), Point::new(10.0, 10.0)))
        );
        assert_eq!(routed.polyline().len(), 3);
        assert_eq!(routed.segment_at(Point::new(9.0, 8.0), 2.0), Some(1));
    }

    #[test]
    fn test_connection_to_connection() {
        let mut diagram = Diagram::new();
        let (a, b) = boxes(&mut diagram);
        let ab = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        diagram.get_mut(ab).unwrap().accept_everything();
        let c = diagram
            .add_shape(
                ShapeNode::rect(Point::new(125.0, 200.0), Size::new(50.0, 50.0))
                    .accepting_everything(),
                None,
            )
            .unwrap();
        let fork = diagram.create_connection(c, ab, ShapeType::Line).unwrap();
        let routed = diagram.route(fork);
        assert_eq!(routed.points.last().copied(), Some(Point::new(150.0, 25.0)));
        assert_eq!(routed.points[0], Point::new(150.0, 200.0));
    }

    #[test]
    fn test_self_referencing_connection_terminates() {
        let mut diagram = Diagram::new();
        let (a, b) = boxes(&mut diagram);
        let ab = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        diagram.get_mut(ab).unwrap().accept_everything();
        diagram.get_mut(ab).unwrap().line_mut().unwrap().set_trg_shape(Some(ab));
        // Resolution recurses into itself until the depth limit.
        assert!(diagram.route(ab).is_empty());
    }
}
