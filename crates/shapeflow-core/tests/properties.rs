//! Property tests over randomly built diagrams.

use kurbo::{Point, Size};
use proptest::prelude::*;
use shapeflow_core::{Diagram, DiagramError, HistorySnapshots, ShapeId, ShapeNode, ShapeType};
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Add { parent: Option<usize>, x: f64, y: f64 },
    Remove(usize),
    Reparent { shape: usize, parent: Option<usize> },
    Connect(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (proptest::option::of(0usize..16), 0.0f64..500.0, 0.0f64..500.0)
            .prop_map(|(parent, x, y)| Op::Add { parent, x, y }),
        (0usize..16).prop_map(Op::Remove),
        (0usize..16, proptest::option::of(0usize..16))
            .prop_map(|(shape, parent)| Op::Reparent { shape, parent }),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Op::Connect(a, b)),
    ]
}

/// Pick the `index`-th existing shape, wrapping around.
fn pick(diagram: &Diagram, index: usize) -> Option<ShapeId> {
    let mut ids: Vec<ShapeId> = diagram.ids().collect();
    ids.sort();
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

fn apply(diagram: &mut Diagram, op: &Op) {
    match *op {
        Op::Add { parent, x, y } => {
            let parent = parent
                .and_then(|p| pick(diagram, p))
                .filter(|&p| diagram.get(p).is_some_and(|n| !n.is_line()));
            let node = ShapeNode::rect(Point::new(x, y), Size::new(30.0, 20.0))
                .accepting_everything();
            let _ = diagram.add_shape(node, parent);
        }
        Op::Remove(i) => {
            if let Some(id) = pick(diagram, i) {
                diagram.remove_shape(id).unwrap();
            }
        }
        Op::Reparent { shape, parent } => {
            let Some(id) = pick(diagram, shape) else {
                return;
            };
            let parent = parent
                .and_then(|p| pick(diagram, p))
                .filter(|&p| diagram.get(p).is_some_and(|n| !n.is_line()));
            match diagram.reparent_shape(id, parent) {
                Ok(()) | Err(DiagramError::Cycle { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        Op::Connect(a, b) => {
            let (Some(a), Some(b)) = (pick(diagram, a), pick(diagram, b)) else {
                return;
            };
            let _ = diagram.create_connection(a, b, ShapeType::Line);
        }
    }
}

fn reachable(diagram: &Diagram) -> HashSet<ShapeId> {
    let mut seen = HashSet::new();
    let mut stack: Vec<ShapeId> = diagram.top_level().to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = diagram.get(id) {
            stack.extend(node.children().iter().copied());
        }
    }
    seen
}

fn positions(diagram: &Diagram) -> Vec<(ShapeId, Option<ShapeId>, Point)> {
    let mut ids: Vec<ShapeId> = diagram.ids().collect();
    ids.sort();
    ids.into_iter()
        .map(|id| {
            let parent = diagram.get(id).and_then(|n| n.parent());
            (id, parent, diagram.absolute_position(id))
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_index_matches_reachable_shapes(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut diagram = Diagram::new();
        for op in &ops {
            apply(&mut diagram, op);
            let index: HashSet<ShapeId> = diagram.ids().collect();
            prop_assert_eq!(index, reachable(&diagram));
        }
    }

    #[test]
    fn prop_ownership_stays_acyclic(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut diagram = Diagram::new();
        for op in &ops {
            apply(&mut diagram, op);
        }
        for id in diagram.ids() {
            let ancestors = diagram.ancestors(id);
            prop_assert!(!ancestors.contains(&id));
            prop_assert!(ancestors.len() < diagram.len());
        }
    }

    #[test]
    fn prop_serialization_round_trip(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let mut diagram = Diagram::new();
        for op in &ops {
            apply(&mut diagram, op);
        }
        let json = diagram.to_json().unwrap();
        let restored = Diagram::from_json(&json).unwrap();

        let before = positions(&diagram);
        let after = positions(&restored);
        prop_assert_eq!(before.len(), after.len());
        for ((id_a, parent_a, pos_a), (id_b, parent_b, pos_b)) in before.iter().zip(&after) {
            prop_assert_eq!(id_a, id_b);
            prop_assert_eq!(parent_a, parent_b);
            prop_assert_eq!(pos_a, pos_b);
        }
        prop_assert_eq!(restored.to_json().unwrap(), json);
    }

    #[test]
    fn prop_routing_is_idempotent(
        ax in -200.0f64..200.0, ay in -200.0f64..200.0,
        bx in -200.0f64..600.0, by in -200.0f64..600.0,
        ortho in any::<bool>(),
    ) {
        let mut diagram = Diagram::new();
        let a = diagram
            .add_shape(
                ShapeNode::rect(Point::new(ax, ay), Size::new(60.0, 40.0)).accepting_everything(),
                None,
            )
            .unwrap();
        let b = diagram
            .add_shape(
                ShapeNode::rect(Point::new(bx, by), Size::new(60.0, 40.0)).accepting_everything(),
                None,
            )
            .unwrap();
        let line_type = if ortho { ShapeType::OrthoLine } else { ShapeType::Line };
        let c = diagram.create_connection(a, b, line_type).unwrap();

        let first = diagram.route(c);
        let second = diagram.route(c);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_spline_hits_its_points(
        points in proptest::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 2..6),
    ) {
        let points: Vec<Point> = points.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        let last = points[points.len() - 1];
        let mut node = ShapeNode::free_line(ShapeType::CurveLine, points[0], last);
        if let Some(line) = node.line_mut() {
            line.control_points = points[1..points.len() - 1].to_vec();
        }
        let mut diagram = Diagram::new();
        let id = diagram.add_connection(node).unwrap();

        let routed = diagram.route(id);
        prop_assert_eq!(routed.segments.len(), points.len() - 1);
        for (i, segment) in routed.segments.iter().enumerate() {
            let (first, last) = (segment[0], segment[segment.len() - 1]);
            prop_assert!((first - points[i]).hypot() < 1e-9);
            prop_assert!((last - points[i + 1]).hypot() < 1e-9);
            prop_assert!(segment.len() > 10);
        }
    }

    #[test]
    fn prop_history_boundaries_are_no_ops(
        saves in 1usize..40,
        undos in 0usize..60,
        depth in 1usize..30,
    ) {
        let mut history = HistorySnapshots::new(depth);
        for i in 0..saves {
            history.save(format!("state {}", i));
        }
        prop_assert_eq!(history.len(), saves.min(depth));

        let at_newest = history.cursor();
        prop_assert!(history.redo().is_none());
        prop_assert_eq!(history.cursor(), at_newest);

        for _ in 0..undos {
            let cursor = history.cursor();
            let len = history.len();
            match history.undo() {
                Some(_) => prop_assert_eq!(history.cursor(), cursor - 1),
                None => {
                    prop_assert_eq!(cursor, 0);
                    prop_assert_eq!(history.cursor(), 0);
                }
            }
            prop_assert_eq!(history.len(), len);
        }
    }
}
