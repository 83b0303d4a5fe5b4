//! End-to-end diagram scenarios.

use kurbo::{Point, Rect, Size};
use shapeflow_core::{Diagram, HistorySnapshots, ShapeId, ShapeNode, ShapeType};

const EPS: f64 = 1e-9;

fn assert_point(actual: Point, expected: Point) {
    assert!(
        (actual.x - expected.x).abs() < EPS && (actual.y - expected.y).abs() < EPS,
        "{:?} != {:?}",
        actual,
        expected
    );
}

fn assert_rect(actual: Rect, expected: Rect) {
    assert_point(Point::new(actual.x0, actual.y0), Point::new(expected.x0, expected.y0));
    assert_point(Point::new(actual.x1, actual.y1), Point::new(expected.x1, expected.y1));
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn connectable(position: Point, size: Size) -> ShapeNode {
    ShapeNode::rect(position, size).accepting_everything()
}

#[test]
fn test_connection_follows_moved_target() {
    init_logging();
    let mut diagram = Diagram::new();
    let r1 = diagram
        .add_shape(connectable(Point::ZERO, Size::new(100.0, 50.0)), None)
        .unwrap();
    let r2 = diagram
        .add_shape(connectable(Point::new(200.0, 0.0), Size::new(100.0, 50.0)), None)
        .unwrap();
    let c = diagram.create_connection(r1, r2, ShapeType::Line).unwrap();

    assert_rect(diagram.bounding_box(c), Rect::new(100.0, 25.0, 200.0, 25.0));

    let r1_before = diagram.bounding_box(r1);
    diagram.move_to(r2, Point::new(300.0, 0.0));
    let points = diagram.route(c).points;
    assert_eq!(points.len(), 2);
    assert_point(points[0], Point::new(100.0, 25.0));
    assert_point(points[1], Point::new(300.0, 25.0));
    assert_rect(diagram.bounding_box(r1), r1_before);
    assert!(diagram.is_modified());
}

#[test]
fn test_orthogonal_vertical_offset_uses_three_pieces() {
    init_logging();
    let mut diagram = Diagram::new();
    let top = diagram
        .add_shape(connectable(Point::ZERO, Size::new(100.0, 50.0)), None)
        .unwrap();
    let bottom = diagram
        .add_shape(connectable(Point::new(40.0, 300.0), Size::new(100.0, 50.0)), None)
        .unwrap();
    let c = diagram
        .create_connection(top, bottom, ShapeType::OrthoLine)
        .unwrap();

    let routed = diagram.route(c);
    assert_eq!(routed.segments.len(), 1);
    assert_eq!(routed.sub_segment_count(), 3);

    let pieces = &routed.segments[0];
    for w in pieces.windows(2) {
        let axis_aligned = (w[0].x - w[1].x).abs() < EPS || (w[0].y - w[1].y).abs() < EPS;
        assert!(axis_aligned, "{:?} -> {:?} is diagonal", w[0], w[1]);
    }
    // Vertical first: the first piece leaves the source straight down.
    assert!((pieces[0].x - pieces[1].x).abs() < EPS);
    assert!(pieces[1].y > pieces[0].y);
}

#[test]
fn test_undo_restores_deleted_shape() {
    init_logging();
    let mut diagram = Diagram::new();
    let a = diagram
        .add_shape(connectable(Point::new(10.0, 20.0), Size::new(100.0, 50.0)), None)
        .unwrap();
    let child = diagram
        .add_child_shape(a, ShapeNode::rect(Point::new(5.0, 5.0), Size::new(20.0, 20.0)))
        .unwrap();
    let b = diagram
        .add_shape(connectable(Point::new(300.0, 20.0), Size::new(100.0, 50.0)), None)
        .unwrap();
    let c = diagram.create_connection(a, b, ShapeType::Line).unwrap();

    let mut history = HistorySnapshots::default();
    history.save_diagram(&diagram).unwrap();
    let before: Vec<(ShapeId, Point)> = {
        let mut ids: Vec<ShapeId> = diagram.ids().collect();
        ids.sort();
        ids.into_iter().map(|id| (id, diagram.absolute_position(id))).collect()
    };

    diagram.remove_shape(a).unwrap();
    history.save_diagram(&diagram).unwrap();
    assert_eq!(diagram.len(), 1);

    assert!(history.undo_diagram(&mut diagram).unwrap());
    let mut ids: Vec<ShapeId> = diagram.ids().collect();
    ids.sort();
    let after: Vec<(ShapeId, Point)> = ids
        .into_iter()
        .map(|id| (id, diagram.absolute_position(id)))
        .collect();

    assert_eq!(after.len(), before.len());
    for ((id_a, pos_a), (id_b, pos_b)) in after.iter().zip(&before) {
        assert_eq!(id_a, id_b);
        assert_point(*pos_a, *pos_b);
    }
    assert_eq!(diagram.get(child).unwrap().parent(), Some(a));
    let line = diagram.get(c).unwrap().line().unwrap();
    assert_eq!((line.src_shape(), line.trg_shape()), (Some(a), Some(b)));
    assert!(!history.undo_diagram(&mut diagram).unwrap());
}

#[test]
fn test_saved_diagram_reloads_through_storage() {
    init_logging();
    use shapeflow_core::storage::{FileStorage, Storage};

    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
    let mut diagram = Diagram::new();
    let a = diagram
        .add_shape(connectable(Point::ZERO, Size::new(50.0, 50.0)), None)
        .unwrap();

    let loaded = block_on(async {
        storage.save("plan", &diagram).await?;
        storage.load("plan").await
    })
    .unwrap();
    assert!(loaded.contains(a));
    assert!(!loaded.is_compatibility_loading());
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
