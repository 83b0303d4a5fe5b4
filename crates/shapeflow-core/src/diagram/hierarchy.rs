//! Ownership tree maintenance.
//!
//! `set_parent` (through `unlink`/`link`) is the only code that writes the
//! parent and children fields of a node or the top-level list.

use super::Diagram;
use crate::error::{DiagramError, DiagramResult};
use crate::shapes::ShapeId;

impl Diagram {
    /// Move `id` under `parent`, or to the top level for `None`.
    ///
    /// Does not check acceptance rules or cycles, and leaves the relative
    /// position untouched.
    pub(crate) fn set_parent(&mut self, id: ShapeId, parent: Option<ShapeId>) {
        if !self.shapes.contains_key(&id) {
            return;
        }
        self.unlink(id);
        self.link(id, parent);
    }

    pub(super) fn unlink(&mut self, id: ShapeId) {
        let old = self
            .shapes
            .get_mut(&id)
            .and_then(|node| node.parent_slot().take());
        match old {
            Some(pid) => {
                if let Some(parent) = self.shapes.get_mut(&pid) {
                    parent.children_mut().retain(|c| *c != id);
                }
            }
            None => self.top_level.retain(|c| *c != id),
        }
    }

    pub(super) fn link(&mut self, id: ShapeId, parent: Option<ShapeId>) {
        match parent.filter(|pid| *pid != id && self.shapes.contains_key(pid)) {
            Some(pid) => {
                if let Some(parent_node) = self.shapes.get_mut(&pid) {
                    parent_node.children_mut().push(id);
                }
                if let Some(node) = self.shapes.get_mut(&id) {
                    *node.parent_slot() = Some(pid);
                }
            }
            None => {
                if !self.top_level.contains(&id) {
                    self.top_level.push(id);
                }
            }
        }
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut result = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent());
        while let Some(pid) = current {
            if result.contains(&pid) || result.len() > self.shapes.len() {
                log::warn!("Ownership cycle detected above {}", id);
                break;
            }
            result.push(pid);
            current = self.get(pid).and_then(|n| n.parent());
        }
        result
    }

    /// Whether `ancestor` is a (transitive) parent of `id`.
    pub fn is_ancestor_of(&self, ancestor: ShapeId, id: ShapeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Whether `id` is a (transitive) child of `ancestor`.
    pub fn is_descendant_of(&self, id: ShapeId, ancestor: ShapeId) -> bool {
        self.is_ancestor_of(ancestor, id)
    }

    /// All shapes below `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut result = Vec::new();
        let mut stack: Vec<ShapeId> = self
            .get(id)
            .map(|n| n.children().iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = self.get(current) {
                stack.extend(node.children().iter().rev().copied());
            }
        }
        result
    }

    /// Top-most ancestor of `id`, or `id` itself at the top level.
    pub fn top_most_parent(&self, id: ShapeId) -> ShapeId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// Move `id` under `new_parent` (or to the top level), keeping its absolute position.
    ///
    /// Acceptance rules are not checked. Making a shape a child of itself or of
    /// one of its descendants is rejected with [`DiagramError::Cycle`].
    pub fn reparent_shape(
        &mut self,
        id: ShapeId,
        new_parent: Option<ShapeId>,
    ) -> DiagramResult<()> {
        let old_parent = self
            .get(id)
            .ok_or(DiagramError::ShapeNotFound(id))?
            .parent();
        if let Some(pid) = new_parent {
            if !self.contains(pid) {
                return Err(DiagramError::ShapeNotFound(pid));
            }
            if pid == id || self.is_ancestor_of(id, pid) {
                return Err(DiagramError::Cycle {
                    child: id,
                    parent: pid,
                });
            }
        }
        if old_parent == new_parent {
            return Ok(());
        }

        self.move_under(id, new_parent);
        self.modified = true;
        log::debug!("Reparented {} from {:?} to {:?}", id, old_parent, new_parent);

        if let Some(pid) = old_parent {
            self.update(pid);
        }
        self.update(id);
        Ok(())
    }

    /// Relink without checks, compensating the relative position.
    pub(super) fn move_under(&mut self, id: ShapeId, parent: Option<ShapeId>) {
        let absolute = self.absolute_position(id);
        self.set_parent(id, parent);
        let origin = self.parent_origin(id);
        if let Some(node) = self.shapes.get_mut(&id) {
            if !node.is_line() {
                node.relative_position = absolute - origin.to_vec2();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeNode;
    use kurbo::{Point, Size};

    fn container(diagram: &mut Diagram, parent: Option<ShapeId>, x: f64) -> ShapeId {
        let node = ShapeNode::rect(Point::new(x, x), Size::new(40.0, 40.0))
            .accepting_everything()
            .with_flags(
                crate::shapes::StyleFlags::DEFAULT | crate::shapes::StyleFlags::NO_FIT_TO_CHILDREN,
            );
        diagram.add_shape(node, parent).unwrap()
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut diagram = Diagram::new();
        let a = container(&mut diagram, None, 0.0);
        let b = container(&mut diagram, Some(a), 5.0);
        let c = container(&mut diagram, Some(b), 5.0);
        let d = container(&mut diagram, Some(a), 10.0);

        assert_eq!(diagram.ancestors(c), vec![b, a]);
        assert_eq!(diagram.descendants(a), vec![b, c, d]);
        assert!(diagram.is_ancestor_of(a, c));
        assert!(diagram.is_descendant_of(c, b));
        assert!(!diagram.is_ancestor_of(c, a));
        assert_eq!(diagram.top_most_parent(c), a);
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut diagram = Diagram::new();
        let a = container(&mut diagram, None, 0.0);
        let b = container(&mut diagram, Some(a), 5.0);
        let c = container(&mut diagram, Some(b), 5.0);

        assert!(matches!(
            diagram.reparent_shape(a, Some(c)),
            Err(DiagramError::Cycle { .. })
        ));
        assert!(matches!(
            diagram.reparent_shape(a, Some(a)),
            Err(DiagramError::Cycle { .. })
        ));
        assert_eq!(diagram.get(a).unwrap().parent(), None);
        assert_eq!(diagram.get(c).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_reparent_keeps_absolute_position() {
        let mut diagram = Diagram::new();
        let a = container(&mut diagram, None, 0.0);
        let b = container(&mut diagram, None, 100.0);
        let c = container(&mut diagram, Some(a), 5.0);
        let before = diagram.absolute_position(c);

        diagram.reparent_shape(c, Some(b)).unwrap();
        assert_eq!(diagram.get(b).unwrap().children(), &[c]);
        assert!(diagram.get(a).unwrap().children().is_empty());
        assert!((diagram.absolute_position(c) - before).hypot() < 1e-9);

        diagram.reparent_shape(c, None).unwrap();
        assert!(diagram.top_level().contains(&c));
        assert!((diagram.absolute_position(c) - before).hypot() < 1e-9);
    }

    #[test]
    fn test_reparent_missing() {
        let mut diagram = Diagram::new();
        let a = container(&mut diagram, None, 0.0);
        assert!(matches!(
            diagram.reparent_shape(a, Some(uuid::Uuid::new_v4())),
            Err(DiagramError::ShapeNotFound(_))
        ));
    }
}
