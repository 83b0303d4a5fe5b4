//! Clipboard transport of shape selections.
//!
//! A payload is an opaque byte buffer holding the JSON records of the copied
//! subtrees. Text-only clipboards carry it base64-encoded.

use crate::diagram::{Diagram, FORMAT_VERSION};
use crate::error::{DiagramError, DiagramResult, FormatVersion};
use crate::shapes::{LineEnds, ShapeId};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
struct Payload {
    version: FormatVersion,
    shapes: Vec<Value>,
}

/// Serialize `ids` with their subtrees.
///
/// Shapes whose ancestor is also listed are carried by that ancestor.
/// Connections running between copied shapes are included even when not listed.
pub fn copy_shapes(diagram: &Diagram, ids: &[ShapeId]) -> DiagramResult<Vec<u8>> {
    let listed: HashSet<ShapeId> = ids.iter().copied().collect();
    let mut roots: Vec<ShapeId> = ids
        .iter()
        .copied()
        .filter(|&id| diagram.contains(id))
        .filter(|&id| !diagram.ancestors(id).iter().any(|a| listed.contains(a)))
        .collect();

    let mut copied: HashSet<ShapeId> = HashSet::new();
    for &root in &roots {
        copied.insert(root);
        copied.extend(diagram.descendants(root));
    }
    for id in diagram.draw_order() {
        if copied.contains(&id) {
            continue;
        }
        let spans = diagram
            .get(id)
            .and_then(|n| n.line())
            .is_some_and(|l| match (l.src_shape(), l.trg_shape()) {
                (Some(src), Some(trg)) => copied.contains(&src) && copied.contains(&trg),
                _ => false,
            });
        if spans && diagram.get(id).is_some_and(|n| n.parent().is_none()) {
            roots.push(id);
        }
    }

    let payload = Payload {
        version: FORMAT_VERSION,
        shapes: diagram.serialize_shapes(&roots)?,
    };
    log::debug!("Copied {} shape(s)", payload.shapes.len());
    Ok(serde_json::to_vec(&payload)?)
}

/// Insert a copied selection at the top level of `diagram`, moved by `offset`.
///
/// Every pasted shape gets a fresh ID and connections are rebound to the
/// pasted copies of their ends. Connections whose ends were not copied, and
/// shapes the diagram does not accept at the top level, are dropped.
/// Returns the IDs of the pasted top-level shapes.
pub fn paste_shapes(
    diagram: &mut Diagram,
    payload: &[u8],
    offset: Vec2,
) -> DiagramResult<Vec<ShapeId>> {
    let payload: Payload = serde_json::from_slice(payload)?;
    let found = (payload.version.major, payload.version.minor);
    if found > (FORMAT_VERSION.major, FORMAT_VERSION.minor) {
        return Err(DiagramError::IncompatibleVersion {
            found: payload.version,
            supported: FORMAT_VERSION,
        });
    }

    let mut staging = Diagram::with_schema(diagram.schema().clone());
    staging.read_shape_records(&payload.shapes, None)?;

    let remap: HashMap<ShapeId, ShapeId> = staging.ids().map(|id| (id, Uuid::new_v4())).collect();

    let mut dropped: HashSet<ShapeId> = HashSet::new();
    for old_id in staging.draw_order() {
        if dropped.contains(&old_id) {
            continue;
        }
        let Some(node) = staging.get(old_id) else {
            continue;
        };
        let rejected = node.parent().is_none()
            && !diagram.settings().accepted_top_shapes.accepts(node.shape_type());
        let dangling = node.line().is_some_and(|l| match l.ends {
            LineEnds::Bound { src, trg } => {
                !remap.contains_key(&src) || !trg.is_some_and(|t| remap.contains_key(&t))
            }
            LineEnds::Free { .. } => false,
        });
        if rejected || dangling {
            log::debug!("Dropping pasted {} {}", node.shape_type(), old_id);
            dropped.insert(old_id);
            dropped.extend(staging.descendants(old_id));
        }
    }

    let mut pasted = Vec::new();
    for old_id in staging.draw_order() {
        if dropped.contains(&old_id) {
            continue;
        }
        let Some(mut node) = staging.get(old_id).cloned() else {
            continue;
        };
        let Some(&new_id) = remap.get(&old_id) else {
            continue;
        };
        let parent = node.parent().and_then(|p| remap.get(&p).copied());
        node.set_id(new_id);

        if let Some(line) = node.line_mut() {
            if let LineEnds::Bound { src, trg } = line.ends {
                if let Some(&src) = remap.get(&src) {
                    line.set_src_shape(src);
                }
                line.set_trg_shape(trg.and_then(|t| remap.get(&t).copied()));
            }
            line.translate(offset);
        } else if parent.is_none() {
            node.relative_position += offset;
        }

        diagram.insert_node(node, parent);
        if parent.is_none() {
            pasted.push(new_id);
        }
    }

    for &id in &pasted {
        if diagram.get(id).is_some_and(|n| !n.is_line()) {
            diagram.update(id);
        }
    }
    log::debug!("Pasted {} shape(s)", pasted.len());
    Ok(pasted)
}

/// Encode a payload for a text clipboard.
pub fn encode_text(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Decode a payload read from a text clipboard.
pub fn decode_text(text: &str) -> DiagramResult<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| DiagramError::Malformed(format!("clipboard text is not base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ShapeNode, ShapeType};
    use kurbo::{Point, Size};

    fn sample() -> (Diagram, ShapeId, ShapeId, ShapeId, ShapeId) {
        let mut diagram = Diagram::new();
        let a = diagram
            .add_shape(
                ShapeNode::rect(Point::ZERO, Size::new(100.0, 50.0)).accepting_everything(),
                None,
            )
            .unwrap();
        let child = diagram
            .add_child_shape(a, ShapeNode::rect(Point::new(10.0, 10.0), Size::new(20.0, 20.0)))
            .unwrap();
        let b = diagram
            .add_shape(
                ShapeNode::rect(Point::new(200.0, 0.0), Size::new(100.0, 50.0))
                    .accepting_everything(),
                None,
            )
            .unwrap();
        let line = diagram.create_connection(a, b, ShapeType::Line).unwrap();
        (diagram, a, child, b, line)
    }

    #[test]
    fn test_paste_assigns_fresh_ids() {
        let (mut diagram, a, child, _, _) = sample();
        let payload = copy_shapes(&diagram, &[a, child]).unwrap();
        let pasted = paste_shapes(&mut diagram, &payload, Vec2::new(10.0, 20.0)).unwrap();

        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0], a);
        assert_eq!(diagram.len(), 6);
        assert_eq!(diagram.absolute_position(pasted[0]), Point::new(10.0, 20.0));
        let copy_children = diagram.get(pasted[0]).unwrap().children().to_vec();
        assert_eq!(copy_children.len(), 1);
        assert_ne!(copy_children[0], child);
        assert_eq!(diagram.absolute_position(copy_children[0]), Point::new(20.0, 30.0));
    }

    #[test]
    fn test_connections_between_copied_shapes_follow() {
        let (mut diagram, a, _, b, line) = sample();
        let payload = copy_shapes(&diagram, &[a, b]).unwrap();
        let pasted = paste_shapes(&mut diagram, &payload, Vec2::new(0.0, 100.0)).unwrap();

        assert_eq!(pasted.len(), 3);
        let new_line = pasted
            .iter()
            .copied()
            .find(|id| diagram.get(*id).unwrap().is_line())
            .unwrap();
        assert_ne!(new_line, line);
        let ends = diagram.get(new_line).unwrap().line().unwrap();
        assert!(pasted.contains(&ends.src_shape().unwrap()));
        assert!(pasted.contains(&ends.trg_shape().unwrap()));
        assert_eq!(diagram.route(new_line).points[0], Point::new(100.0, 125.0));
    }

    #[test]
    fn test_dangling_connection_is_dropped() {
        let (mut diagram, a, _, _, line) = sample();
        let payload = copy_shapes(&diagram, &[a, line]).unwrap();
        let before = diagram.len();
        let pasted = paste_shapes(&mut diagram, &payload, Vec2::ZERO).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(diagram.len(), before + 2);
    }

    #[test]
    fn test_nested_dangling_connection_is_dropped() {
        let (mut diagram, a, child, b, _) = sample();
        let nested = diagram.create_connection(b, a, ShapeType::Line).unwrap();
        diagram.reparent_shape(nested, Some(a)).unwrap();

        let payload = copy_shapes(&diagram, &[a]).unwrap();
        let before = diagram.len();
        let pasted = paste_shapes(&mut diagram, &payload, Vec2::ZERO).unwrap();

        assert_eq!(pasted.len(), 1);
        assert_eq!(diagram.len(), before + 2);
        let copy_children = diagram.get(pasted[0]).unwrap().children().to_vec();
        assert_eq!(copy_children.len(), 1);
        assert_ne!(copy_children[0], child);
        assert!(!diagram.get(copy_children[0]).unwrap().is_line());
        let attached = diagram
            .shapes()
            .filter(|n| n.line().is_some_and(|l| l.references(pasted[0])))
            .count();
        assert_eq!(attached, 0);
    }

    #[test]
    fn test_rejected_top_level_type_is_dropped() {
        let (mut diagram, a, _, _, _) = sample();
        let payload = copy_shapes(&diagram, &[a]).unwrap();
        diagram.settings_mut().accepted_top_shapes.clear();
        let pasted = paste_shapes(&mut diagram, &payload, Vec2::ZERO).unwrap();
        assert!(pasted.is_empty());
    }

    #[test]
    fn test_text_encoding() {
        let (diagram, a, _, _, _) = sample();
        let payload = copy_shapes(&diagram, &[a]).unwrap();
        let text = encode_text(&payload);
        assert_eq!(decode_text(&text).unwrap(), payload);
        assert!(matches!(decode_text("not base64!"), Err(DiagramError::Malformed(_))));
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        let (mut diagram, ..) = sample();
        let before = diagram.len();
        assert!(paste_shapes(&mut diagram, b"{}", Vec2::ZERO).is_err());
        assert_eq!(diagram.len(), before);
    }
}
