use slotmap::SecondaryMap;

use crate::sprite::{SourceImageId, SortKey, SpriteInstance, SpriteSource};
use crate::transform::Transform;
use crate::transform_hierarchy::{NodeId, TransformHierarchy};

/// Sprite rendering data carried by a scene node
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteRenderer {
    pub image: SourceImageId,
    pub layer: i32,
    pub order: i32,
    pub pixels_per_unit: f32,
}

impl SpriteRenderer {
    pub fn new<T: Into<SourceImageId>>(image: T) -> Self {
        Self {
            image: image.into(),
            layer: 0,
            order: 0,
            pixels_per_unit: 100.0,
        }
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_pixels_per_unit(mut self, pixels_per_unit: f32) -> Self {
        self.pixels_per_unit = pixels_per_unit;
        self
    }
}

#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    pub active: bool,
    pub sprite: Option<SpriteRenderer>,
}

/// A host side scene: a transform hierarchy where any node may carry a sprite
#[derive(Debug)]
pub struct SpriteScene {
    pub hierarchy: TransformHierarchy,
    nodes: SecondaryMap<NodeId, SceneNode>,
}

impl Default for SpriteScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteScene {
    pub fn new() -> Self {
        Self {
            hierarchy: TransformHierarchy::new(),
            nodes: SecondaryMap::new(),
        }
    }

    pub fn add<T: Into<String>>(
        &mut self,
        name: T,
        transform: Transform,
        sprite: Option<SpriteRenderer>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.hierarchy.insert(transform, parent);
        self.nodes.insert(
            id,
            SceneNode {
                name: name.into(),
                active: true,
                sprite,
            },
        );
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn set_active(&mut self, id: NodeId, active: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.active = active;
        }
    }

    /// Sprites under every root of the scene, active nodes only
    pub fn sprites(&self) -> SceneSprites<'_> {
        SceneSprites {
            scene: self,
            roots: self.hierarchy.roots().to_vec(),
            include_inactive: false,
        }
    }

    /// Sprites under the given nodes, each root included
    pub fn sprites_under(&self, roots: &[NodeId]) -> SceneSprites<'_> {
        SceneSprites {
            scene: self,
            roots: roots.to_vec(),
            include_inactive: false,
        }
    }

    fn sprite_instance(&self, id: NodeId, sprite: &SpriteRenderer) -> Option<SpriteInstance> {
        let world_transform = self.hierarchy.world_matrix(id)?;
        Some(SpriteInstance {
            source_image: sprite.image.clone(),
            world_transform,
            sort_key: SortKey::new(sprite.layer, sprite.order, world_transform.w_axis.z),
            pixels_per_unit: sprite.pixels_per_unit,
        })
    }
}

/// The sprites found by walking a set of roots depth first, parents before children
pub struct SceneSprites<'a> {
    scene: &'a SpriteScene,
    roots: Vec<NodeId>,
    include_inactive: bool,
}

impl SceneSprites<'_> {
    /// Whether inactive nodes and their subtrees are walked as well
    pub fn include_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }
}

impl SpriteSource for SceneSprites<'_> {
    fn visit_sprites(&self, visit: &mut dyn FnMut(SpriteInstance)) {
        let mut pending: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            let Some(node) = self.scene.nodes.get(id) else {
                continue;
            };
            if !node.active && !self.include_inactive {
                continue;
            }
            if let Some(instance) = node
                .sprite
                .as_ref()
                .and_then(|sprite| self.scene.sprite_instance(id, sprite))
            {
                visit(instance);
            }
            pending.extend(self.scene.hierarchy.children(id).iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::sprite::collect;

    fn names(sprites: &[SpriteInstance]) -> Vec<&str> {
        sprites.iter().map(|s| s.source_image.as_str()).collect()
    }

    fn visited(source: &dyn SpriteSource) -> Vec<SpriteInstance> {
        let mut sprites = Vec::new();
        source.visit_sprites(&mut |sprite: SpriteInstance| sprites.push(sprite));
        sprites
    }

    #[test]
    fn walks_roots_and_descendants_parents_first() {
        let mut scene = SpriteScene::new();
        let root = scene.add("root", Transform::default(), Some(SpriteRenderer::new("root.png")), None);
        let child = scene.add("child", Transform::default(), None, Some(root));
        scene.add("leaf", Transform::default(), Some(SpriteRenderer::new("leaf.png")), Some(child));
        scene.add("sibling", Transform::default(), Some(SpriteRenderer::new("sibling.png")), Some(root));
        scene.add("other", Transform::default(), Some(SpriteRenderer::new("other.png")), None);

        let sprites = visited(&scene.sprites());
        assert_eq!(
            names(&sprites),
            vec!["root.png", "leaf.png", "sibling.png", "other.png"]
        );
    }

    #[test]
    fn sprites_under_limits_the_walk() {
        let mut scene = SpriteScene::new();
        let a = scene.add("a", Transform::default(), Some(SpriteRenderer::new("a.png")), None);
        scene.add("a child", Transform::default(), Some(SpriteRenderer::new("a1.png")), Some(a));
        scene.add("b", Transform::default(), Some(SpriteRenderer::new("b.png")), None);

        assert_eq!(names(&visited(&scene.sprites_under(&[a]))), vec!["a.png", "a1.png"]);
    }

    #[test]
    fn inactive_subtrees_are_skipped_unless_asked_for() {
        let mut scene = SpriteScene::new();
        let root = scene.add("root", Transform::default(), Some(SpriteRenderer::new("root.png")), None);
        let hidden = scene.add("hidden", Transform::default(), Some(SpriteRenderer::new("hidden.png")), Some(root));
        scene.add("below hidden", Transform::default(), Some(SpriteRenderer::new("below.png")), Some(hidden));
        scene.set_active(hidden, false);

        assert_eq!(names(&visited(&scene.sprites())), vec!["root.png"]);
        assert_eq!(
            names(&visited(&scene.sprites().include_inactive(true))),
            vec!["root.png", "hidden.png", "below.png"]
        );
    }

    #[test]
    fn instances_carry_world_transform_and_depth() {
        let mut scene = SpriteScene::new();
        let parent = scene.add("parent", Transform::from_position(Vec3::new(0.0, 0.0, 3.0)), None, None);
        scene.add(
            "sprite",
            Transform::from_position(Vec3::new(1.0, 2.0, -1.0)),
            Some(SpriteRenderer::new("s.png").with_layer(4).with_order(7).with_pixels_per_unit(32.0)),
            Some(parent),
        );

        let sprites = visited(&scene.sprites());
        let sprite = &sprites[0];
        assert!(sprite
            .world_transform
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(1.0, 2.0, 2.0), 1e-6));
        assert_eq!(sprite.sort_key, SortKey::new(4, 7, 2.0));
        assert_eq!(sprite.pixels_per_unit, 32.0);
    }

    #[test]
    fn collect_orders_scene_sprites() {
        let mut scene = SpriteScene::new();
        let root = scene.add("root", Transform::default(), None, None);
        scene.add("top", Transform::default(), Some(SpriteRenderer::new("top.png").with_layer(2)), Some(root));
        scene.add("far", Transform::from_position(Vec3::Z * 5.0), Some(SpriteRenderer::new("far.png")), Some(root));
        scene.add("near", Transform::from_position(Vec3::Z * -5.0), Some(SpriteRenderer::new("near.png")), Some(root));

        let first = collect(&scene.sprites());
        assert_eq!(names(&first), vec!["far.png", "near.png", "top.png"]);
        assert_eq!(first, collect(&scene.sprites()));
    }

    #[test]
    fn nodes_keep_name_and_active_state() {
        let mut scene = SpriteScene::new();
        let node = scene.add("hero", Transform::default(), Some(SpriteRenderer::new("hero.png")), None);
        assert!(scene.get(node).unwrap().active);

        scene.set_active(node, false);
        let node = scene.get(node).unwrap();
        assert_eq!(node.name, "hero");
        assert!(!node.active);
        assert_eq!(node.sprite.as_ref().unwrap().image.as_str(), "hero.png");
    }
}
