//! Drawing the diagram onto a [`DrawingSurface`].

use super::Diagram;
use crate::draw::{DrawStyle, DrawingSurface};
use crate::shapes::{ShapeId, ShapeKind, ShapeNode, ShapeType, StyleFlags};
use kurbo::{Point, Rect, Vec2};
use std::f64::consts::{FRAC_PI_2, PI};

impl Diagram {
    /// Draw every visible shape in tree order.
    pub fn draw(&self, surface: &mut dyn DrawingSurface) {
        for id in self.visible_order() {
            self.draw_shape(id, surface);
        }
    }

    /// Draw a single shape without its children.
    pub fn draw_shape(&self, id: ShapeId, surface: &mut dyn DrawingSurface) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.is_line() {
            self.draw_connection(id, node, surface);
            return;
        }

        let bounds = self.bounding_box(id);
        if node.contains_style(StyleFlags::SHOW_SHADOW) {
            let shadow = DrawStyle {
                stroke_color: self.settings.shadow_color,
                stroke_width: 0.0,
                fill_color: Some(self.settings.shadow_color),
            };
            surface.set_style(&shadow);
            draw_box(node, bounds + self.settings.shadow_offset, surface);
        }
        surface.set_style(&DrawStyle::from(&node.style));
        draw_box(node, bounds, surface);
    }

    fn draw_connection(&self, id: ShapeId, node: &ShapeNode, surface: &mut dyn DrawingSurface) {
        let Some(line) = node.line() else {
            return;
        };
        let routed = self.route(id);
        let mut polyline = routed.polyline();
        if polyline.len() < 2 {
            return;
        }

        surface.set_style(&DrawStyle::from(&node.style));
        let n = polyline.len();
        let start = line.src_arrow.line_end(polyline[1], polyline[0]);
        let end = line.trg_arrow.line_end(polyline[n - 2], polyline[n - 1]);
        polyline[0] = start;
        polyline[n - 1] = end;
        for w in polyline.windows(2) {
            surface.draw_line(w[0], w[1]);
        }

        if let Some((from, to)) = routed.start_approach() {
            line.src_arrow.draw(surface, from, to);
        }
        if let Some((from, to)) = routed.end_approach() {
            line.trg_arrow.draw(surface, from, to);
        }
    }
}

fn draw_box(node: &ShapeNode, bounds: Rect, surface: &mut dyn DrawingSurface) {
    match (&node.kind, node.shape_type()) {
        (ShapeKind::Rect(_), ShapeType::Circle) => {
            surface.draw_circle(bounds.center(), bounds.width().min(bounds.height()) / 2.0);
        }
        (ShapeKind::Rect(r), ShapeType::RoundRect) if r.corner_radius > 0.0 => {
            draw_round_rect(bounds, r.corner_radius, surface);
        }
        (ShapeKind::Text(text), _) => {
            for (offset, content) in text.line_offsets() {
                let origin = bounds.origin() + Vec2::new(0.0, offset);
                surface.draw_text(origin, content, text.font_size);
            }
        }
        _ => surface.draw_polygon(&node.outline(bounds)),
    }
}

/// Four straight edges joined by quarter arcs.
fn draw_round_rect(bounds: Rect, radius: f64, surface: &mut dyn DrawingSurface) {
    let r = radius.min(bounds.width() / 2.0).min(bounds.height() / 2.0);
    let (x0, y0, x1, y1) = (bounds.x0, bounds.y0, bounds.x1, bounds.y1);

    surface.draw_line(Point::new(x0 + r, y0), Point::new(x1 - r, y0));
    surface.draw_line(Point::new(x1, y0 + r), Point::new(x1, y1 - r));
    surface.draw_line(Point::new(x1 - r, y1), Point::new(x0 + r, y1));
    surface.draw_line(Point::new(x0, y1 - r), Point::new(x0, y0 + r));

    surface.draw_arc(Point::new(x0 + r, y0 + r), r, PI, FRAC_PI_2);
    surface.draw_arc(Point::new(x1 - r, y0 + r), r, -FRAC_PI_2, FRAC_PI_2);
    surface.draw_arc(Point::new(x1 - r, y1 - r), r, 0.0, FRAC_PI_2);
    surface.draw_arc(Point::new(x0 + r, y1 - r), r, FRAC_PI_2, FRAC_PI_2);
}
