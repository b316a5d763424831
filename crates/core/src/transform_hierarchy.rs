use glam::Mat4;
use slotmap::{self, SecondaryMap, SlotMap};

use crate::transform::Transform;

slotmap::new_key_type! { pub struct NodeId; }

#[derive(Debug)]
pub struct HierarchyNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Stores a hierarchy of nodes and the world matrix of each, fixed at insertion
/// Children keep their insertion order, as do roots
#[derive(Debug)]
pub struct TransformHierarchy {
    hierarchy: SlotMap<NodeId, HierarchyNode>,
    world_matrices: SecondaryMap<NodeId, Mat4>,
    roots: Vec<NodeId>,
}

impl Default for TransformHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformHierarchy {
    pub fn new() -> Self {
        Self {
            hierarchy: SlotMap::with_key(),
            world_matrices: SecondaryMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hierarchy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hierarchy.is_empty()
    }

    /// Insert a transform, a parent which is not in the hierarchy is treated as no parent
    pub fn insert(&mut self, transform: Transform, parent: Option<NodeId>) -> NodeId {
        let parent = parent.filter(|parent| self.hierarchy.contains_key(*parent));
        let id = self.hierarchy.insert(HierarchyNode {
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.hierarchy[parent].children.push(id),
            None => self.roots.push(id),
        }
        let world_matrix = self.parent_matrix(parent) * transform.to_local_matrix();
        self.world_matrices.insert(id, world_matrix);
        id
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.world_matrices.get(id).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.hierarchy.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.hierarchy
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    fn parent_matrix(&self, parent: Option<NodeId>) -> Mat4 {
        parent
            .and_then(|id| self.world_matrices.get(id).copied())
            .unwrap_or(Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn child_world_matrix_includes_parent() {
        let mut hierarchy = TransformHierarchy::new();
        let parent = hierarchy.insert(
            Transform::from_position_scale(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(2.0)),
            None,
        );
        let child = hierarchy.insert(Transform::from_position(Vec3::new(1.0, 1.0, 0.0)), Some(parent));

        let world = hierarchy.world_matrix(child).unwrap();
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(12.0, 2.0, 0.0), 1e-6));
        assert_eq!(hierarchy.children(parent), &[child]);
        assert_eq!(hierarchy.parent(child), Some(parent));
        assert_eq!(hierarchy.roots(), &[parent]);
    }

    #[test]
    fn grandchildren_compose_every_ancestor() {
        let mut hierarchy = TransformHierarchy::new();
        let root = hierarchy.insert(Transform::from_position(Vec3::new(0.0, 0.0, 5.0)), None);
        let child = hierarchy.insert(Transform::from_position(Vec3::X), Some(root));
        let grandchild = hierarchy.insert(Transform::from_position(Vec3::X), Some(child));

        let world = hierarchy.world_matrix(grandchild).unwrap();
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(2.0, 0.0, 5.0), 1e-6));
    }

    #[test]
    fn unknown_parent_inserts_a_root() {
        let mut other = TransformHierarchy::new();
        let foreign = other.insert(Transform::default(), None);
        other.insert(Transform::default(), Some(foreign));
        let stale = other.insert(Transform::default(), Some(foreign));

        let mut hierarchy = TransformHierarchy::new();
        let root = hierarchy.insert(Transform::from_position(Vec3::Y), Some(stale));
        assert_eq!(hierarchy.roots(), &[root]);
        assert_eq!(hierarchy.parent(root), None);
        assert_eq!(hierarchy.len(), 1);
    }
}
