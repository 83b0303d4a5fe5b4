//! Connection lookups around a shape.

use super::Diagram;
use crate::shapes::{ShapeId, ShapeType};
use std::collections::HashSet;

/// Which end of a connection a query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Connections starting at the shape.
    Starting,
    /// Connections ending at the shape.
    Ending,
    #[default]
    Both,
}

impl Diagram {
    /// Connections attached to `id`, in drawing order.
    ///
    /// `line_type` restricts the result to that connection type and its
    /// derived types.
    pub fn assigned_connections(
        &self,
        id: ShapeId,
        line_type: Option<ShapeType>,
        direction: Direction,
    ) -> Vec<ShapeId> {
        self.draw_order()
            .into_iter()
            .filter(|&line_id| {
                let Some(node) = self.get(line_id) else {
                    return false;
                };
                let Some(line) = node.line() else {
                    return false;
                };
                if line_type.is_some_and(|t| !node.shape_type().is_kind_of(t)) {
                    return false;
                }
                match direction {
                    Direction::Starting => line.src_shape() == Some(id),
                    Direction::Ending => line.trg_shape() == Some(id),
                    Direction::Both => line.references(id),
                }
            })
            .collect()
    }

    /// Shapes reachable from `id` over connections.
    ///
    /// With `direct` set only the shapes at the far end of connections
    /// attached to `id` are returned. Otherwise connections ending at other
    /// connections are followed as well.
    pub fn neighbours(
        &self,
        id: ShapeId,
        line_type: Option<ShapeType>,
        direction: Direction,
        direct: bool,
    ) -> Vec<ShapeId> {
        let mut result = Vec::new();
        let mut processed = HashSet::from([id]);
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            for line_id in self.assigned_connections(current, line_type, direction) {
                let Some(line) = self.get(line_id).and_then(|n| n.line()) else {
                    continue;
                };
                let opposite = match direction {
                    Direction::Starting => line.trg_shape(),
                    Direction::Ending => line.src_shape(),
                    Direction::Both => {
                        if line.src_shape() == Some(current) {
                            line.trg_shape()
                        } else {
                            line.src_shape()
                        }
                    }
                };
                let Some(opposite) = opposite else {
                    continue;
                };
                let Some(opposite_node) = self.get(opposite) else {
                    continue;
                };
                if !processed.insert(opposite) {
                    continue;
                }
                if opposite_node.is_line() {
                    if !direct {
                        stack.push(opposite);
                    }
                } else {
                    result.push(opposite);
                }
            }

            // Connections reached over another connection contribute their own ends.
            if current != id {
                if let Some(line) = self.get(current).and_then(|n| n.line()) {
                    let ends = match direction {
                        Direction::Starting => [line.trg_shape(), None],
                        Direction::Ending => [line.src_shape(), None],
                        Direction::Both => [line.src_shape(), line.trg_shape()],
                    };
                    for end in ends.into_iter().flatten() {
                        let Some(end_node) = self.get(end) else {
                            continue;
                        };
                        if !processed.insert(end) {
                            continue;
                        }
                        if end_node.is_line() {
                            stack.push(end);
                        } else {
                            result.push(end);
                        }
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeNode;
    use kurbo::{Point, Size};

    fn shape(diagram: &mut Diagram, x: f64) -> ShapeId {
        let node = ShapeNode::rect(Point::new(x, 0.0), Size::new(20.0, 20.0))
            .accepting_everything();
        diagram.add_shape(node, None).unwrap()
    }

    #[test]
    fn test_assigned_connections_by_direction() {
        let mut diagram = Diagram::new();
        let a = shape(&mut diagram, 0.0);
        let b = shape(&mut diagram, 100.0);
        let c = shape(&mut diagram, 200.0);
        let ab = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        let cb = diagram.create_connection(c, b, ShapeType::OrthoLine).unwrap();

        assert_eq!(diagram.assigned_connections(b, None, Direction::Both), vec![ab, cb]);
        assert_eq!(
            diagram.assigned_connections(b, None, Direction::Starting),
            Vec::<ShapeId>::new()
        );
        assert_eq!(diagram.assigned_connections(a, None, Direction::Starting), vec![ab]);
        assert_eq!(
            diagram.assigned_connections(b, Some(ShapeType::OrthoLine), Direction::Ending),
            vec![cb]
        );
        // Derived connection types match their base type.
        assert_eq!(
            diagram.assigned_connections(b, Some(ShapeType::Line), Direction::Ending),
            vec![ab, cb]
        );
    }

    #[test]
    fn test_direct_neighbours() {
        let mut diagram = Diagram::new();
        let a = shape(&mut diagram, 0.0);
        let b = shape(&mut diagram, 100.0);
        let c = shape(&mut diagram, 200.0);
        diagram.create_connection(a, b, ShapeType::Line).unwrap();
        diagram.create_connection(c, a, ShapeType::Line).unwrap();
        // A second connection to the same shape does not duplicate it.
        diagram.create_connection(a, b, ShapeType::Line).unwrap();

        assert_eq!(diagram.neighbours(a, None, Direction::Both, true), vec![b, c]);
        assert_eq!(diagram.neighbours(a, None, Direction::Starting, true), vec![b]);
        assert_eq!(diagram.neighbours(a, None, Direction::Ending, true), vec![c]);
    }

    #[test]
    fn test_neighbours_through_connections() {
        let mut diagram = Diagram::new();
        let a = shape(&mut diagram, 0.0);
        let b = shape(&mut diagram, 100.0);
        let c = shape(&mut diagram, 200.0);
        let ab = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        diagram.get_mut(ab).unwrap().accept_everything();
        // c connects to the connection a -> b.
        diagram.create_connection(c, ab, ShapeType::Line).unwrap();

        assert!(diagram.neighbours(c, None, Direction::Starting, true).is_empty());
        let indirect = diagram.neighbours(c, None, Direction::Starting, false);
        assert_eq!(indirect, vec![b]);
        let both = diagram.neighbours(c, None, Direction::Both, false);
        assert!(both.contains(&a) && both.contains(&b));
        assert!(!both.contains(&c));
    }
}
