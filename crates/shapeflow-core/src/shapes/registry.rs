//! Property declarations of every shape type.

use super::{ConnectionPoint, ShapeKind, ShapeNode, ShapeType};
use crate::error::{PropertyError, PropertyResult};
use crate::property::{
    Attribute, ConventionalAccess, PropertyRegistry, conventional_fields, decode,
    is_marked_disabled,
};
use serde_json::Value;

/// Registry type for shape records.
pub type ShapeRegistry = PropertyRegistry<ShapeNode>;

/// Registry type name of the properties common to every shape.
pub const BASE_TYPE: &str = "ShapeNode";

impl ConventionalAccess for ShapeNode {
    conventional_fields!(
        ShapeNode;
        relative_position,
        flags,
        style,
        halign,
        valign,
        h_border,
        v_border,
        custom_dock_point,
        accepted_children,
        accepted_connections,
        accepted_src_neighbours,
        accepted_trg_neighbours,
        visible,
    );
}

fn get_connection_points(n: &ShapeNode) -> Attribute {
    Attribute::sequence(
        n.connection_points
            .iter()
            .map(|cp| Attribute::object(cp.serialized, cp)),
    )
}

fn set_connection_points(n: &mut ShapeNode, v: &Value) -> PropertyResult<()> {
    let items = v
        .as_array()
        .ok_or_else(|| PropertyError::malformed("connection_points", "expected an array"))?;
    n.connection_points = items
        .iter()
        .map(|item| {
            let mut cp: ConnectionPoint = decode("connection_points", item)?;
            cp.serialized = !is_marked_disabled(item);
            Ok(cp)
        })
        .collect::<PropertyResult<_>>()?;
    Ok(())
}

/// Build the registry describing every [`ShapeType`].
pub fn shape_registry() -> ShapeRegistry {
    let mut registry = ShapeRegistry::new();
    registry.register(BASE_TYPE, None, |t| {
        t.property(
            "id",
            |n| Attribute::of(&n.id()),
            |n, v| {
                n.set_id(decode("id", v)?);
                Ok(())
            },
        );
        for name in [
            "relative_position",
            "flags",
            "style",
            "halign",
            "valign",
            "h_border",
            "v_border",
            "custom_dock_point",
            "accepted_children",
            "accepted_connections",
            "accepted_src_neighbours",
            "accepted_trg_neighbours",
            "visible",
        ] {
            t.conventional(name);
        }
        // Opted-out points are kept with the disabled marker.
        t.forced("connection_points", get_connection_points, set_connection_points);
    });

    registry.register(ShapeType::Rect.name(), Some(BASE_TYPE), |t| {
        t.property(
            "size",
            |n| Attribute::of(&n.size()),
            |n, v| {
                n.set_size(decode("size", v)?);
                Ok(())
            },
        );
    });

    registry.register(ShapeType::RoundRect.name(), Some(ShapeType::Rect.name()), |t| {
        t.property(
            "radius",
            |n| match &n.kind {
                ShapeKind::Rect(r) => Attribute::of(&r.corner_radius),
                _ => Attribute::of(&0.0),
            },
            |n, v| {
                if let ShapeKind::Rect(r) = &mut n.kind {
                    r.corner_radius = decode("radius", v)?;
                }
                Ok(())
            },
        );
    });

    registry.register(ShapeType::Ellipse.name(), Some(ShapeType::Rect.name()), |_| {});
    registry.register(ShapeType::Circle.name(), Some(ShapeType::Ellipse.name()), |_| {});

    registry.register(ShapeType::Polygon.name(), Some(ShapeType::Rect.name()), |t| {
        t.property(
            "vertices",
            |n| Attribute::of(&n.polygon_shape().map(|p| &p.vertices)),
            |n, v| {
                if let ShapeKind::Polygon(p) = &mut n.kind {
                    p.vertices = decode("vertices", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "connect_to_vertex",
            |n| Attribute::of(&n.polygon_shape().is_some_and(|p| p.connect_to_vertex)),
            |n, v| {
                if let ShapeKind::Polygon(p) = &mut n.kind {
                    p.connect_to_vertex = decode("connect_to_vertex", v)?;
                }
                Ok(())
            },
        );
    });

    // Diamond vertices follow the size.
    registry.register(ShapeType::Diamond.name(), Some(ShapeType::Polygon.name()), |t| {
        t.exclude("vertices");
    });

    // Text boxes are measured from their content.
    registry.register(ShapeType::Text.name(), Some(ShapeType::Rect.name()), |t| {
        t.exclude("size");
        t.property(
            "text",
            |n| Attribute::of(&n.text_shape().map(|s| s.text.as_str())),
            |n, v| {
                if let Some(s) = n.text_shape_mut() {
                    s.set_text(decode::<String>("text", v)?);
                }
                Ok(())
            },
        );
        t.property(
            "font_size",
            |n| Attribute::of(&n.text_shape().map(|s| s.font_size)),
            |n, v| {
                if let Some(s) = n.text_shape_mut() {
                    s.set_font_size(decode("font_size", v)?);
                }
                Ok(())
            },
        );
        t.property(
            "line_spacing",
            |n| Attribute::of(&n.text_shape().map(|s| s.line_spacing)),
            |n, v| {
                if let Some(s) = n.text_shape_mut() {
                    s.line_spacing = decode("line_spacing", v)?;
                    s.update_size();
                }
                Ok(())
            },
        );
    });

    registry.register(ShapeType::Grid.name(), Some(ShapeType::Rect.name()), |t| {
        t.property(
            "rows",
            |n| Attribute::of(&n.grid_shape().map(|g| g.rows)),
            |n, v| {
                if let ShapeKind::Grid(g) = &mut n.kind {
                    g.rows = decode::<usize>("rows", v)?.max(1);
                }
                Ok(())
            },
        );
        t.property(
            "cols",
            |n| Attribute::of(&n.grid_shape().map(|g| g.cols)),
            |n, v| {
                if let ShapeKind::Grid(g) = &mut n.kind {
                    g.cols = decode::<usize>("cols", v)?.max(1);
                }
                Ok(())
            },
        );
        t.property(
            "cell_space",
            |n| Attribute::of(&n.grid_shape().map(|g| g.cell_space)),
            |n, v| {
                if let ShapeKind::Grid(g) = &mut n.kind {
                    g.cell_space = decode("cell_space", v)?;
                }
                Ok(())
            },
        );
    });

    registry.register(ShapeType::Line.name(), Some(BASE_TYPE), |t| {
        t.property(
            "ends",
            |n| Attribute::of(&n.line().map(|l| l.ends)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.ends = decode("ends", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "control_points",
            |n| Attribute::of(&n.line().map(|l| &l.control_points)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.control_points = decode("control_points", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "src_offset",
            |n| Attribute::of(&n.line().and_then(|l| l.src_offset)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.src_offset = decode("src_offset", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "trg_offset",
            |n| Attribute::of(&n.line().and_then(|l| l.trg_offset)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.trg_offset = decode("trg_offset", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "dock_point",
            |n| Attribute::of(&n.line().map(|l| l.dock_point)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.dock_point = decode("dock_point", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "src_arrow",
            |n| Attribute::of(&n.line().map(|l| l.src_arrow)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.src_arrow = decode("src_arrow", v)?;
                }
                Ok(())
            },
        );
        t.property(
            "trg_arrow",
            |n| Attribute::of(&n.line().map(|l| l.trg_arrow)),
            |n, v| {
                if let Some(l) = n.line_mut() {
                    l.trg_arrow = decode("trg_arrow", v)?;
                }
                Ok(())
            },
        );
    });

    registry.register(ShapeType::OrthoLine.name(), Some(ShapeType::Line.name()), |_| {});
    registry.register(ShapeType::CurveLine.name(), Some(ShapeType::Line.name()), |_| {});
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Anchor, ArrowHead, HAlign, LineEnds};
    use kurbo::{Point, Size};

    #[test]
    fn test_every_shape_type_registered() {
        let registry = shape_registry();
        for t in ShapeType::ALL {
            assert!(registry.is_registered(t.name()), "{} missing", t);
        }
        assert!(registry.is_kind_of("CircleShape", BASE_TYPE));
    }

    #[test]
    fn test_exclusions_are_local() {
        let registry = shape_registry();
        assert!(!registry.property_names("DiamondShape").contains(&"vertices"));
        assert!(registry.property_names("PolygonShape").contains(&"vertices"));
        assert!(!registry.property_names("TextShape").contains(&"size"));
        assert!(registry.property_names("GridShape").contains(&"size"));
    }

    #[test]
    fn test_base_properties_come_first() {
        let registry = shape_registry();
        let names = registry.property_names("RoundRectShape");
        assert_eq!(names.first(), Some(&"id"));
        assert_eq!(names.last(), Some(&"radius"));
    }

    #[test]
    fn test_rect_round_trip() {
        let registry = shape_registry();
        let mut node = ShapeNode::round_rect(Point::new(5.0, 6.0), Size::new(70.0, 30.0), 8.0);
        node.halign = HAlign::Center;
        node.accepted_children.accept(ShapeType::Text);
        node.connection_points
            .push(ConnectionPoint::new(Anchor::TopMiddle));

        let record = registry.serialize(&node, "RoundRectShape", &[]).unwrap();
        let mut restored = ShapeNode::new(ShapeType::RoundRect);
        registry
            .deserialize(&mut restored, "RoundRectShape", &record)
            .unwrap();
        assert_eq!(restored, node);
    }

    #[test]
    fn test_disabled_connection_points_marked() {
        let registry = shape_registry();
        let mut node = ShapeNode::rect(Point::ZERO, Size::new(10.0, 10.0));
        node.connection_points
            .push(ConnectionPoint::new(Anchor::TopLeft));
        let mut hidden = ConnectionPoint::new(Anchor::BottomRight);
        hidden.serialized = false;
        node.connection_points.push(hidden);

        let record = registry.serialize(&node, "RectShape", &[]).unwrap();
        let points = record["connection_points"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert!(!is_marked_disabled(&points[0]));
        assert!(is_marked_disabled(&points[1]));

        let mut restored = ShapeNode::new(ShapeType::Rect);
        registry.deserialize(&mut restored, "RectShape", &record).unwrap();
        assert_eq!(restored.connection_points, node.connection_points);
    }

    #[test]
    fn test_polygon_round_trip() {
        let registry = shape_registry();
        let node = ShapeNode::polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(40.0, 10.0),
            Point::new(20.0, 30.0),
        ]);
        let record = registry.serialize(&node, "PolygonShape", &[]).unwrap();
        assert_eq!(record["vertices"].as_array().unwrap().len(), 3);

        let mut restored = ShapeNode::new(ShapeType::Polygon);
        registry.deserialize(&mut restored, "PolygonShape", &record).unwrap();
        assert_eq!(restored.polygon_shape(), node.polygon_shape());
    }

    #[test]
    fn test_line_round_trip() {
        let registry = shape_registry();
        let mut node = ShapeNode::free_line(
            ShapeType::CurveLine,
            Point::new(0.0, 0.0),
            Point::new(100.0, 50.0),
        );
        if let Some(line) = node.line_mut() {
            line.control_points.push(Point::new(40.0, 80.0));
            line.trg_arrow = ArrowHead::solid();
            line.src_offset = Some(kurbo::Vec2::new(0.5, 0.25));
        }
        let record = registry.serialize(&node, "CurveShape", &[]).unwrap();
        let mut restored = ShapeNode::new(ShapeType::CurveLine);
        registry.deserialize(&mut restored, "CurveShape", &record).unwrap();
        assert_eq!(restored, node);
        assert!(matches!(restored.line().unwrap().ends, LineEnds::Free { .. }));
    }

    #[test]
    fn test_text_restores_content() {
        let registry = shape_registry();
        let mut node = ShapeNode::text(Point::new(1.0, 2.0), "two\nlines");
        node.text_shape_mut().unwrap().set_font_size(18.0);
        let record = registry.serialize(&node, "TextShape", &[]).unwrap();
        assert!(!record.contains_key("size"));

        let mut restored = ShapeNode::new(ShapeType::Text);
        registry.deserialize(&mut restored, "TextShape", &record).unwrap();
        assert_eq!(restored.text_shape(), node.text_shape());
        assert_eq!(restored.size(), node.size());
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let registry = shape_registry();
        let record = serde_json::json!({ "size": "wide" });
        let mut node = ShapeNode::new(ShapeType::Rect);
        let err = registry
            .deserialize(&mut node, "RectShape", record.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, PropertyError::Malformed { property: "size", .. }));
    }
}
