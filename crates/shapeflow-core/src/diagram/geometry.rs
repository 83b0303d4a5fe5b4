//! Positions, bounding boxes and layout.

use super::Diagram;
use crate::routing::{self, spline::SPLINE_MARGIN};
use crate::shapes::{HAlign, Routing, ShapeId, ShapeKind, StyleFlags, VAlign};
use bitflags::bitflags;
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::HashSet;

/// Margin around the live end of a connection that is being changed.
const CHANGING_MARGIN: f64 = 5.0;

bitflags! {
    /// Parts included by [`Diagram::complete_bounding_box`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BBoxMask: u8 {
        const SELF = 1 << 0;
        const CHILDREN = 1 << 1;
        const CONNECTIONS = 1 << 2;
        const SHADOW = 1 << 3;
        const ALL = Self::SELF.bits()
            | Self::CHILDREN.bits()
            | Self::CONNECTIONS.bits()
            | Self::SHADOW.bits();
    }
}

impl Diagram {
    /// Absolute position of a shape's top-left corner.
    ///
    /// A connection's position is its dock point. A child of a connection is
    /// placed relative to the connection's dock point (or its own custom one).
    pub fn absolute_position(&self, id: ShapeId) -> Point {
        let Some(node) = self.get(id) else {
            return Point::ZERO;
        };
        if let Some(line) = node.line() {
            return routing::dock_point_position(self, id, line.dock_point);
        }

        let mut position = node.relative_position.to_vec2();
        let mut child = node;
        let mut steps = 0;
        while let Some(pid) = child.parent() {
            let Some(parent) = self.get(pid) else {
                break;
            };
            if let Some(line) = parent.line() {
                let dock = child.custom_dock_point.unwrap_or(line.dock_point);
                position += routing::dock_point_position(self, pid, dock).to_vec2();
                break;
            }
            position += parent.relative_position.to_vec2();
            child = parent;
            steps += 1;
            if steps > self.shapes.len() {
                log::warn!("Ownership cycle detected above {}", id);
                break;
            }
        }
        position.to_point()
    }

    /// Point the relative position of `id` is measured from.
    pub(crate) fn parent_origin(&self, id: ShapeId) -> Point {
        match self.get(id) {
            Some(node) if !node.is_line() => {
                self.absolute_position(id) - node.relative_position.to_vec2()
            }
            _ => Point::ZERO,
        }
    }

    /// Own rectangle in absolute coordinates; `Rect::ZERO` for unknown IDs.
    pub fn bounding_box(&self, id: ShapeId) -> Rect {
        let Some(node) = self.get(id) else {
            return Rect::ZERO;
        };
        let Some(line) = node.line() else {
            return Rect::from_origin_size(self.absolute_position(id), node.size());
        };

        let points = routing::line_points(self, id);
        let Some(&first) = points.first() else {
            return Rect::ZERO;
        };
        let mut rect = points
            .iter()
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p));
        if line.mode.is_changing() {
            rect = rect.union(Rect::from_center_size(
                line.unfinished_point,
                Size::new(CHANGING_MARGIN * 2.0, CHANGING_MARGIN * 2.0),
            ));
        }
        if node.shape_type().routing() == Some(Routing::Spline) {
            rect = rect.inflate(SPLINE_MARGIN, SPLINE_MARGIN);
        }
        rect
    }

    /// Bounding box of a shape and, per `mask`, its subtree, connections and shadow.
    pub fn complete_bounding_box(&self, id: ShapeId, mask: BBoxMask) -> Rect {
        let mut visited = HashSet::new();
        let mut result: Option<Rect> = None;
        self.collect_bounds(id, mask, &mut visited, &mut result);
        result.unwrap_or(Rect::ZERO)
    }

    fn collect_bounds(
        &self,
        id: ShapeId,
        mask: BBoxMask,
        visited: &mut HashSet<ShapeId>,
        result: &mut Option<Rect>,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        if !visited.insert(id) {
            return;
        }
        let mut add = |rect: Rect| {
            *result = Some(match *result {
                Some(r) => r.union(rect),
                None => rect,
            });
        };

        if mask.contains(BBoxMask::SELF) {
            let own = self.bounding_box(id);
            add(own);
            if mask.contains(BBoxMask::SHADOW) && node.contains_style(StyleFlags::SHOW_SHADOW) {
                add(own + self.settings.shadow_offset);
            }
        }
        if mask.contains(BBoxMask::CONNECTIONS) {
            for line in self.assigned_connections(id, None, super::Direction::Both) {
                self.collect_bounds(line, BBoxMask::SELF | BBoxMask::CHILDREN, visited, result);
            }
        }
        if mask.contains(BBoxMask::CHILDREN) {
            for &child in node.children() {
                self.collect_bounds(child, mask | BBoxMask::SELF, visited, result);
            }
        }
    }

    /// Move a shape so its absolute position becomes `position`.
    pub fn move_to(&mut self, id: ShapeId, position: Point) {
        let delta = position - self.absolute_position(id);
        self.move_by(id, delta);
    }

    /// Translate a shape. Connections owned by its subtree move with it.
    pub fn move_by(&mut self, id: ShapeId, delta: Vec2) {
        let Some(node) = self.shapes.get_mut(&id) else {
            return;
        };
        match node.line_mut() {
            Some(line) => line.translate(delta),
            None => node.relative_position += delta,
        }
        for descendant in self.descendants(id) {
            if let Some(line) = self.shapes.get_mut(&descendant).and_then(|n| n.line_mut()) {
                line.translate(delta);
            }
        }
        self.modified = true;
    }

    /// Scale a shape's geometry, optionally with its children, then update it.
    pub fn scale(&mut self, id: ShapeId, sx: f64, sy: f64, include_children: bool) {
        if !self.contains(id) || sx <= 0.0 || sy <= 0.0 {
            return;
        }
        self.scale_subtree(id, sx, sy, include_children);
        self.modified = true;
        self.update(id);
    }

    fn scale_subtree(&mut self, id: ShapeId, sx: f64, sy: f64, include_children: bool) {
        let origin = self.bounding_box(id).origin();
        let Some(node) = self.shapes.get_mut(&id) else {
            return;
        };
        match node.line_mut() {
            Some(line) => {
                for p in &mut line.control_points {
                    *p = Point::new(
                        origin.x + (p.x - origin.x) * sx,
                        origin.y + (p.y - origin.y) * sy,
                    );
                }
            }
            None => node.scale_geometry(sx, sy),
        }
        if !include_children {
            return;
        }

        let children = node.children().to_vec();
        for child in children {
            let Some(child_node) = self.shapes.get_mut(&child) else {
                continue;
            };
            if child_node.halign == HAlign::None {
                child_node.relative_position.x *= sx;
            }
            if child_node.valign == VAlign::None {
                child_node.relative_position.y *= sy;
            }
            if matches!(child_node.kind, ShapeKind::Text(_)) {
                continue;
            }
            self.scale_subtree(child, sx, sy, true);
        }
        let children = self.get(id).map(|n| n.children().to_vec()).unwrap_or_default();
        for child in children {
            self.do_alignment(child);
        }
    }

    /// Re-apply layout rules to `id` and every ancestor.
    ///
    /// Each step aligns the shape to its parent, lays out or aligns its
    /// children, then grows it around children that must stay inside.
    pub fn update(&mut self, id: ShapeId) {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(cid) = current {
            let Some(node) = self.get(cid) else {
                break;
            };
            let is_manager = node.is_manager();
            let fits = !node.contains_style(StyleFlags::NO_FIT_TO_CHILDREN);
            let children = node.children().to_vec();

            self.do_alignment(cid);
            if is_manager {
                self.layout_grid(cid);
            } else {
                for child in children {
                    self.do_alignment(child);
                }
                if fits {
                    self.fit_to_children(cid);
                }
            }

            current = self.get(cid).and_then(|n| n.parent());
            steps += 1;
            if steps > self.shapes.len() {
                log::warn!("Ownership cycle detected while updating {}", id);
                break;
            }
        }
    }

    /// Place `id` inside its parent according to its alignment.
    ///
    /// Children of a grid are placed by the grid instead.
    pub fn do_alignment(&mut self, id: ShapeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.is_line() || (node.halign == HAlign::None && node.valign == VAlign::None) {
            return;
        }
        let Some(pid) = node.parent() else {
            return;
        };
        let Some(parent) = self.get(pid) else {
            return;
        };
        if parent.is_manager() {
            return;
        }
        let line_points = parent.is_line().then(|| routing::line_points(self, pid));
        let rect = self.bounding_box(pid);
        self.fit_shape_to_rect(id, rect, line_points.as_deref(), false);
    }

    /// Align `id` inside `rect`. `line` holds the parent connection's points
    /// for the line-start/line-end variants; `in_cell` treats `None` as top-left.
    pub(crate) fn fit_shape_to_rect(
        &mut self,
        id: ShapeId,
        rect: Rect,
        line: Option<&[Point]>,
        in_cell: bool,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (halign, valign) = (node.halign, node.valign);
        let (h_border, v_border) = (node.h_border, node.v_border);
        let is_text = matches!(node.kind, ShapeKind::Text(_));

        if !is_text && (halign == HAlign::Expand || valign == VAlign::Expand) {
            let size = node.size();
            let sx = match halign {
                HAlign::Expand if size.width > 0.0 => {
                    (rect.width() - 2.0 * h_border).max(1.0) / size.width
                }
                _ => 1.0,
            };
            let sy = match valign {
                VAlign::Expand if size.height > 0.0 => {
                    (rect.height() - 2.0 * v_border).max(1.0) / size.height
                }
                _ => 1.0,
            };
            if (sx - 1.0).abs() > f64::EPSILON || (sy - 1.0).abs() > f64::EPSILON {
                self.scale_subtree(id, sx, sy, true);
            }
        }

        let Some(node) = self.get(id) else {
            return;
        };
        let size = node.size();
        let current = self.absolute_position(id);
        let first = line.and_then(|p| (p.len() >= 2).then(|| (p[0], p[1])));
        let last = line.and_then(|p| (p.len() >= 2).then(|| (p[p.len() - 2], p[p.len() - 1])));

        let x = match halign {
            HAlign::None if in_cell => rect.x0,
            HAlign::None => current.x,
            HAlign::Left | HAlign::Expand => rect.x0 + h_border,
            HAlign::Center => rect.center().x - size.width / 2.0,
            HAlign::Right => rect.x1 - size.width - h_border,
            HAlign::LineStart => match first {
                Some((a, b)) if b.x < a.x => a.x - size.width - h_border,
                Some((a, _)) => a.x + h_border,
                None => current.x,
            },
            HAlign::LineEnd => match last {
                Some((a, b)) if b.x < a.x => b.x + h_border,
                Some((_, b)) => b.x - size.width - h_border,
                None => current.x,
            },
        };
        let y = match valign {
            VAlign::None if in_cell => rect.y0,
            VAlign::None => current.y,
            VAlign::Top | VAlign::Expand => rect.y0 + v_border,
            VAlign::Middle => rect.center().y - size.height / 2.0,
            VAlign::Bottom => rect.y1 - size.height - v_border,
            VAlign::LineStart => match first {
                Some((a, b)) if b.y < a.y => a.y - size.height - v_border,
                Some((a, _)) => a.y + v_border,
                None => current.y,
            },
            VAlign::LineEnd => match last {
                Some((a, b)) if b.y < a.y => b.y + v_border,
                Some((_, b)) => b.y - size.height - v_border,
                None => current.y,
            },
        };

        let delta = Point::new(x, y) - current;
        if let Some(node) = self.shapes.get_mut(&id) {
            node.relative_position += delta;
        }
    }

    /// Grow a shape so every `ALWAYS_INSIDE` child fits, keeping children in place.
    pub fn fit_to_children(&mut self, id: ShapeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.is_line() || node.is_manager() || matches!(node.kind, ShapeKind::Text(_)) {
            return;
        }
        let own = self.bounding_box(id);
        let mut union = own;
        for &child in node.children() {
            let Some(child_node) = self.get(child) else {
                continue;
            };
            if child_node.is_line() || !child_node.contains_style(StyleFlags::ALWAYS_INSIDE) {
                continue;
            }
            let mask = BBoxMask::SELF | BBoxMask::CHILDREN;
            union = union.union(self.complete_bounding_box(child, mask));
        }

        const EPS: f64 = 1e-9;
        if union.x0 >= own.x0 - EPS
            && union.y0 >= own.y0 - EPS
            && union.x1 <= own.x1 + EPS
            && union.y1 <= own.y1 + EPS
        {
            return;
        }

        let shift = Vec2::new(own.x0 - union.x0, own.y0 - union.y0);
        let children = node.children().to_vec();
        if let Some(node) = self.shapes.get_mut(&id) {
            node.set_size(union.size());
            node.relative_position -= shift;
        }
        for child in children {
            if let Some(child_node) = self.shapes.get_mut(&child) {
                if !child_node.is_line() {
                    child_node.relative_position += shift;
                }
            }
        }
    }

    /// Size a grid to its children and place each child in its cell.
    fn layout_grid(&mut self, id: ShapeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let Some(grid) = node.grid_shape().cloned() else {
            return;
        };
        let children: Vec<ShapeId> = node
            .children()
            .iter()
            .copied()
            .filter(|c| self.get(*c).is_some_and(|n| !n.is_line()))
            .collect();

        let mut cell = Size::ZERO;
        for &child in &children {
            let Some(child_node) = self.get(child) else {
                continue;
            };
            let size = self
                .complete_bounding_box(child, BBoxMask::SELF | BBoxMask::CHILDREN)
                .size();
            if child_node.halign != HAlign::Expand {
                cell.width = cell.width.max(size.width);
            }
            if child_node.valign != VAlign::Expand {
                cell.height = cell.height.max(size.height);
            }
        }

        if let Some(node) = self.shapes.get_mut(&id) {
            node.set_size(grid.fitted_size(cell, children.len()));
        }
        let origin = self.absolute_position(id).to_vec2();
        for (index, child) in children.into_iter().enumerate() {
            let rect = grid.cell_rect(index, cell) + origin;
            self.fit_shape_to_rect(child, rect, None, true);
        }
    }

    /// Shift top-level shapes so no content lies at negative coordinates.
    pub fn move_shapes_from_negatives(&mut self) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        for id in self.draw_order() {
            let rect = self.bounding_box(id);
            min.x = min.x.min(rect.x0);
            min.y = min.y.min(rect.y0);
        }
        let dx = if min.x < 0.0 { -min.x } else { 0.0 };
        let dy = if min.y < 0.0 { -min.y } else { 0.0 };
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        log::debug!("Moving diagram content by ({}, {})", dx, dy);
        for id in self.top_level.clone() {
            self.move_by(id, Vec2::new(dx, dy));
        }
    }
}
