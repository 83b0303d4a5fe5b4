//! Diagram document: the arena owning every shape.
//!
//! Shapes live in a single map keyed by [`ShapeId`]; parent/child links and
//! connection ends are stored as IDs and resolved through the diagram. The
//! map doubles as the ID index, so a shape is reachable from the top level
//! exactly when it is present in the map.

mod geometry;
mod hierarchy;
mod neighbours;
mod paint;
mod persist;
mod settings;

pub use geometry::BBoxMask;
pub use neighbours::Direction;
pub use persist::{FORMAT_VERSION, Schema};
pub use settings::{
    CanvasFlags, DEFAULT_GRID_SIZE, DiagramSettings, MAX_HISTORY_DEPTH, SETTINGS_TYPE,
    SettingsRegistry, settings_registry,
};

use crate::error::{AcceptError, AcceptResult, DiagramError, DiagramResult};
use crate::routing::{self, RoutedLine};
use crate::shapes::{LineEnds, ShapeId, ShapeNode, ShapeType};
use kurbo::{Point, Rect};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Default hit tolerance in logical units.
pub const HIT_TOLERANCE: f64 = 5.0;

/// Nesting limit for resolving connections that depend on other connections.
const MAX_ROUTING_DEPTH: usize = 16;

/// What happens to connections attached to a removed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPolicy {
    #[default]
    Remove,
    /// Keep them as stand-alone lines at their last resolved endpoints.
    Detach,
}

/// What happens to the children of a removed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildPolicy {
    #[default]
    Remove,
    /// Hand them to the removed shape's parent, keeping their absolute positions.
    Reparent,
}

/// Cascade rules for [`Diagram::remove_shape_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemovePolicy {
    pub connections: ConnectionPolicy,
    pub children: ChildPolicy,
}

/// Decrements the routing depth when dropped.
pub(crate) struct RoutingGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for RoutingGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// A diagram: shapes, connections and settings.
#[derive(Debug, Clone)]
pub struct Diagram {
    shapes: HashMap<ShapeId, ShapeNode>,
    /// Shapes without a parent, in insertion order.
    top_level: Vec<ShapeId>,
    settings: DiagramSettings,
    modified: bool,
    compatibility_loading: bool,
    schema: Arc<Schema>,
    routing_depth: Cell<usize>,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    /// Create an empty diagram with its own property schema.
    pub fn new() -> Self {
        Self::with_schema(Arc::new(Schema::new()))
    }

    /// Create an empty diagram sharing `schema`.
    pub fn with_schema(schema: Arc<Schema>) -> Self {
        Self {
            shapes: HashMap::new(),
            top_level: Vec::new(),
            settings: DiagramSettings::default(),
            modified: false,
            compatibility_loading: false,
            schema,
            routing_depth: Cell::new(0),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn settings(&self) -> &DiagramSettings {
        &self.settings
    }

    /// Mutable settings; marks the diagram modified.
    pub fn settings_mut(&mut self) -> &mut DiagramSettings {
        self.modified = true;
        &mut self.settings
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Whether the last load read data written by an older format version.
    pub fn is_compatibility_loading(&self) -> bool {
        self.compatibility_loading
    }

    /// Get a shape by ID.
    pub fn get(&self, id: ShapeId) -> Option<&ShapeNode> {
        self.shapes.get(&id)
    }

    /// Get a mutable reference to a shape; marks the diagram modified.
    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut ShapeNode> {
        let node = self.shapes.get_mut(&id);
        if node.is_some() {
            self.modified = true;
        }
        node
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Number of shapes, at any depth.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shapes without a parent, in insertion order.
    pub fn top_level(&self) -> &[ShapeId] {
        &self.top_level
    }

    /// IDs of all shapes, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shapes.keys().copied()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &ShapeNode> {
        self.shapes.values()
    }

    /// All shapes in drawing order: each top-level shape followed by its subtree.
    pub fn draw_order(&self) -> Vec<ShapeId> {
        let mut order = Vec::with_capacity(self.shapes.len());
        for &id in &self.top_level {
            order.push(id);
            order.extend(self.descendants(id));
        }
        order
    }

    /// Drawing order without hidden shapes and their subtrees.
    pub fn visible_order(&self) -> Vec<ShapeId> {
        let mut order = Vec::with_capacity(self.shapes.len());
        let mut stack: Vec<ShapeId> = self.top_level.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.shapes.get(&id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            order.push(id);
            stack.extend(node.children().iter().rev().copied());
        }
        order
    }

    /// Shapes of `shape_type` or a type derived from it, in drawing order.
    pub fn shapes_of_type(&self, shape_type: ShapeType) -> Vec<ShapeId> {
        self.draw_order()
            .into_iter()
            .filter(|id| {
                self.shapes
                    .get(id)
                    .is_some_and(|n| n.shape_type().is_kind_of(shape_type))
            })
            .collect()
    }

    /// Add a shape at the top level or under `parent`.
    ///
    /// The shape must be accepted by the parent (or by the diagram's accepted
    /// top-level types). Connections are additionally checked against the
    /// acceptance rules of their ends. A clashing ID is replaced by a fresh one.
    pub fn add_shape(
        &mut self,
        mut node: ShapeNode,
        parent: Option<ShapeId>,
    ) -> AcceptResult<ShapeId> {
        let shape_type = node.shape_type();
        match parent {
            Some(pid) => {
                let parent_node = self.shapes.get(&pid).ok_or(AcceptError::InvalidInput)?;
                if !parent_node.accepted_children.accepts(shape_type) {
                    log::debug!(
                        "{} does not accept child {}",
                        parent_node.shape_type(),
                        shape_type
                    );
                    return Err(AcceptError::NotAccepted);
                }
            }
            None => {
                if !self.settings.accepted_top_shapes.accepts(shape_type) {
                    log::debug!("Diagram does not accept top-level {}", shape_type);
                    return Err(AcceptError::NotAccepted);
                }
            }
        }

        if let Some(line) = node.line() {
            if let LineEnds::Bound { src, trg } = line.ends {
                self.is_connection_accepted(src, trg, shape_type)?;
            }
        }

        while self.shapes.contains_key(&node.id()) {
            let fresh = Uuid::new_v4();
            log::debug!("Shape ID {} already in use, assigning {}", node.id(), fresh);
            node.set_id(fresh);
        }

        let is_line = node.is_line();
        let id = self.insert_node(node, parent);
        log::debug!("Added {} {}", shape_type, id);
        if !is_line {
            self.update(id);
        }
        Ok(id)
    }

    /// Add `node` as a child of `parent`.
    pub fn add_child_shape(&mut self, parent: ShapeId, node: ShapeNode) -> AcceptResult<ShapeId> {
        self.add_shape(node, Some(parent))
    }

    /// Add a connection node at the top level.
    pub fn add_connection(&mut self, node: ShapeNode) -> AcceptResult<ShapeId> {
        if !node.is_line() {
            return Err(AcceptError::InvalidInput);
        }
        self.add_shape(node, None)
    }

    /// Connect `src` to `trg` with a new connection of `line_type`.
    pub fn create_connection(
        &mut self,
        src: ShapeId,
        trg: ShapeId,
        line_type: ShapeType,
    ) -> AcceptResult<ShapeId> {
        if !line_type.is_line() {
            return Err(AcceptError::InvalidInput);
        }
        self.add_connection(ShapeNode::connection(line_type, src, trg))
    }

    /// Check the four acceptance rules for a connection between `src` and `trg`.
    ///
    /// `trg` is `None` while a connection is still being drawn; only the source
    /// side is checked then.
    pub fn is_connection_accepted(
        &self,
        src: ShapeId,
        trg: Option<ShapeId>,
        line_type: ShapeType,
    ) -> AcceptResult<()> {
        let src_node = self.shapes.get(&src).ok_or(AcceptError::InvalidInput)?;
        if !src_node.accepted_connections.accepts(line_type) {
            return Err(AcceptError::NotAccepted);
        }
        let Some(trg) = trg else {
            return Ok(());
        };
        let trg_node = self.shapes.get(&trg).ok_or(AcceptError::InvalidInput)?;
        if !trg_node.accepted_connections.accepts(line_type)
            || !src_node.accepted_trg_neighbours.accepts(trg_node.shape_type())
            || !trg_node.accepted_src_neighbours.accepts(src_node.shape_type())
        {
            return Err(AcceptError::NotAccepted);
        }
        Ok(())
    }

    /// Remove a shape together with its children and connections.
    pub fn remove_shape(&mut self, id: ShapeId) -> DiagramResult<Vec<ShapeId>> {
        self.remove_shape_with(id, RemovePolicy::default())
    }

    /// Remove a shape, cascading to children and connections per `policy`.
    ///
    /// Returns the IDs of every removed shape.
    pub fn remove_shape_with(
        &mut self,
        id: ShapeId,
        policy: RemovePolicy,
    ) -> DiagramResult<Vec<ShapeId>> {
        let node = self.shapes.get(&id).ok_or(DiagramError::ShapeNotFound(id))?;
        let parent = node.parent();
        let children = node.children().to_vec();

        let mut doomed = vec![id];
        match policy.children {
            ChildPolicy::Remove => doomed.extend(self.descendants(id)),
            ChildPolicy::Reparent => {
                for child in children {
                    self.move_under(child, parent);
                }
            }
        }

        let mut doomed_set: HashSet<ShapeId> = doomed.iter().copied().collect();
        let mut detached = Vec::new();
        loop {
            let referencing: Vec<ShapeId> = self
                .draw_order()
                .into_iter()
                .filter(|line_id| !doomed_set.contains(line_id) && !detached.contains(line_id))
                .filter(|line_id| {
                    self.shapes
                        .get(line_id)
                        .and_then(|n| n.line())
                        .is_some_and(|l| doomed_set.iter().any(|d| l.references(*d)))
                })
                .collect();
            if referencing.is_empty() {
                break;
            }
            match policy.connections {
                ConnectionPolicy::Remove => {
                    for line_id in referencing {
                        for removed in std::iter::once(line_id).chain(self.descendants(line_id)) {
                            if doomed_set.insert(removed) {
                                doomed.push(removed);
                            }
                        }
                    }
                }
                ConnectionPolicy::Detach => {
                    detached.extend(referencing);
                    break;
                }
            }
        }

        let free_ends: Vec<(ShapeId, Point, Point)> = detached
            .iter()
            .map(|&line_id| {
                let points = routing::line_points(self, line_id);
                let first = points.first().copied().unwrap_or(Point::ZERO);
                let last = points.last().copied().unwrap_or(first);
                (line_id, first, last)
            })
            .collect();
        for (line_id, src, trg) in free_ends {
            if let Some(line) = self.shapes.get_mut(&line_id).and_then(|n| n.line_mut()) {
                line.ends = LineEnds::Free { src, trg };
                line.src_offset = None;
                line.trg_offset = None;
                log::debug!("Detached connection {}", line_id);
            }
        }

        for removed in &doomed {
            self.unlink(*removed);
            self.shapes.remove(removed);
        }
        self.modified = true;
        log::debug!("Removed {} shape(s) starting at {}", doomed.len(), id);

        if let Some(pid) = parent.filter(|p| self.shapes.contains_key(p)) {
            self.update(pid);
        }
        Ok(doomed)
    }

    /// Remove several shapes; IDs already gone (e.g. removed by cascade) are skipped.
    pub fn remove_shapes(&mut self, ids: &[ShapeId]) -> Vec<ShapeId> {
        let mut removed = Vec::new();
        for &id in ids {
            if !self.shapes.contains_key(&id) {
                continue;
            }
            if let Ok(gone) = self.remove_shape(id) {
                removed.extend(gone);
            }
        }
        removed
    }

    /// Remove every shape.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.top_level.clear();
        self.modified = true;
        log::debug!("Diagram cleared");
    }

    /// Top-most visible shape under `point`.
    pub fn find_shape_at(&self, point: Point, tolerance: f64) -> Option<ShapeId> {
        self.shapes_at(point, tolerance).into_iter().next()
    }

    /// Visible shapes under `point`, top-most first.
    pub fn shapes_at(&self, point: Point, tolerance: f64) -> Vec<ShapeId> {
        self.visible_order()
            .into_iter()
            .rev()
            .filter(|&id| self.hit_test(id, point, tolerance))
            .collect()
    }

    /// Whether `point` lies on the shape (or near the connection).
    pub fn hit_test(&self, id: ShapeId, point: Point, tolerance: f64) -> bool {
        match self.shapes.get(&id) {
            Some(node) if node.is_line() => self.route(id).hit_test(point, tolerance),
            Some(node) => node.contains_point(self.bounding_box(id), point, tolerance),
            None => false,
        }
    }

    /// Visible shapes whose bounding box lies entirely inside `rect`.
    pub fn shapes_inside(&self, rect: Rect) -> Vec<ShapeId> {
        self.visible_order()
            .into_iter()
            .filter(|&id| crate::shapes::rect::contains_rect(rect, self.bounding_box(id)))
            .collect()
    }

    /// Route a connection; empty for non-connections and dangling ends.
    pub fn route(&self, id: ShapeId) -> RoutedLine {
        routing::route(self, id)
    }

    /// Insert without acceptance checks. The ID must be unused and `parent` present.
    pub(crate) fn insert_node(&mut self, mut node: ShapeNode, parent: Option<ShapeId>) -> ShapeId {
        let id = node.id();
        *node.parent_slot() = None;
        node.children_mut().clear();
        self.shapes.insert(id, node);
        self.link(id, parent);
        self.modified = true;
        id
    }

    pub(crate) fn enter_routing(&self) -> Option<RoutingGuard<'_>> {
        let depth = self.routing_depth.get();
        if depth >= MAX_ROUTING_DEPTH {
            return None;
        }
        self.routing_depth.set(depth + 1);
        Some(RoutingGuard {
            depth: &self.routing_depth,
        })
    }

    pub(crate) fn set_compatibility_loading(&mut self, compat: bool) {
        self.compatibility_loading = compat;
    }

    pub(crate) fn replace_settings(&mut self, settings: DiagramSettings) {
        self.settings = settings;
    }
}
