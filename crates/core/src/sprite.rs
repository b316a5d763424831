use std::{cmp::Ordering, collections::HashSet, fmt, path::Path};

use glam::{Mat4, Vec3};

/// Identifies the original, pre-atlas image a sprite draws, usually its path
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceImageId(String);

impl SourceImageId {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The id with its final extension removed, "sprites/hero.png" -> "sprites/hero"
    pub fn without_extension(&self) -> &str {
        match Path::new(&self.0).extension() {
            // extension is a suffix of the id, so the byte offset is valid
            Some(extension) => &self.0[..self.0.len() - extension.len() - 1],
            None => &self.0,
        }
    }
}

impl fmt::Display for SourceImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceImageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Keys which fix the order sprites are drawn in
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SortKey {
    pub layer: i32,
    pub order: i32,
    /// world space z
    pub depth: f32,
}

impl SortKey {
    pub fn new(layer: i32, order: i32, depth: f32) -> Self {
        Self {
            layer,
            order,
            depth,
        }
    }

    /// Layer ascending, then order ascending, then depth descending,
    /// so the sprite nearest the camera within a layer and order draws last
    pub fn draw_order(&self, other: &Self) -> Ordering {
        self.layer
            .cmp(&other.layer)
            .then(self.order.cmp(&other.order))
            .then(other.depth.total_cmp(&self.depth))
    }
}

/// A single sprite placed in the world, as read from the host scene
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteInstance {
    pub source_image: SourceImageId,
    pub world_transform: Mat4,
    pub sort_key: SortKey,
    /// Atlas pixels per local geometry unit, pixel measurements are divided by this
    pub pixels_per_unit: f32,
}

impl SpriteInstance {
    /// Depth is taken from the world transform's translation
    pub fn new<T: Into<SourceImageId>>(
        source_image: T,
        world_transform: Mat4,
        layer: i32,
        order: i32,
        pixels_per_unit: f32,
    ) -> Self {
        let depth = world_transform.transform_point3(Vec3::ZERO).z;
        Self {
            source_image: source_image.into(),
            world_transform,
            sort_key: SortKey::new(layer, order, depth),
            pixels_per_unit,
        }
    }
}

/// Read only view over whatever the host uses to hold its sprites
/// How the host finds them (tree walk, ECS query, flat list) is its own business
pub trait SpriteSource {
    fn visit_sprites(&self, visit: &mut dyn FnMut(SpriteInstance));
}

impl SpriteSource for [SpriteInstance] {
    fn visit_sprites(&self, visit: &mut dyn FnMut(SpriteInstance)) {
        for sprite in self {
            visit(sprite.clone());
        }
    }
}

impl SpriteSource for Vec<SpriteInstance> {
    fn visit_sprites(&self, visit: &mut dyn FnMut(SpriteInstance)) {
        self.as_slice().visit_sprites(visit)
    }
}

/// Gathers every sprite the source yields and orders them for drawing
/// Ties keep the order the source yielded them in
pub fn collect<S: SpriteSource + ?Sized>(source: &S) -> Vec<SpriteInstance> {
    let mut sprites = Vec::new();
    source.visit_sprites(&mut |sprite: SpriteInstance| sprites.push(sprite));
    // sort_by is stable
    sprites.sort_by(|a, b| a.sort_key.draw_order(&b.sort_key));
    sprites
}

/// Source images referenced by the sprites, first occurrence order, no duplicates
///
/// Empty ids are left out, they can never be packed. The sprite itself stays in
/// the list so building its mesh fails instead of dropping it.
pub fn unique_source_images(sprites: &[SpriteInstance]) -> Vec<SourceImageId> {
    let mut seen = HashSet::new();
    sprites
        .iter()
        .filter(|sprite| !sprite.source_image.is_empty() && seen.insert(&sprite.source_image))
        .map(|sprite| sprite.source_image.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(name: &str, layer: i32, order: i32, z: f32) -> SpriteInstance {
        SpriteInstance::new(
            name,
            Mat4::from_translation(Vec3::new(0.0, 0.0, z)),
            layer,
            order,
            100.0,
        )
    }

    fn names(sprites: &[SpriteInstance]) -> Vec<&str> {
        sprites.iter().map(|s| s.source_image.as_str()).collect()
    }

    #[test]
    fn sorts_by_layer_then_order_then_depth_descending() {
        let sprites = vec![
            sprite("D", 2, 0, 0.0),
            sprite("B", 1, 5, 2.0),
            sprite("A", 1, 1, 0.0),
            sprite("C", 1, 5, -1.0),
        ];
        // C is nearer the camera than B, so it draws over B
        assert_eq!(names(&collect(&sprites)), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn equal_keys_keep_source_order() {
        let sprites = vec![
            sprite("first", 0, 0, 1.0),
            sprite("second", 0, 0, 1.0),
            sprite("third", 0, 0, 1.0),
            sprite("front", 0, 0, -3.0),
        ];
        assert_eq!(
            names(&collect(&sprites)),
            vec!["first", "second", "third", "front"]
        );
    }

    #[test]
    fn collecting_twice_gives_the_same_order() {
        let sprites: Vec<SpriteInstance> = (0..32)
            .map(|i| sprite(&format!("s{i}"), i % 3, (i * 7) % 5, (i % 4) as f32))
            .collect();
        assert_eq!(collect(&sprites), collect(&sprites));
    }

    #[test]
    fn empty_source_collects_nothing() {
        let sprites: Vec<SpriteInstance> = Vec::new();
        assert!(collect(&sprites).is_empty());
    }

    #[test]
    fn sprites_without_an_image_are_kept() {
        let sprites = vec![sprite("", 0, 0, 0.0), sprite("a.png", 0, 0, 0.0)];
        let collected = collect(&sprites);
        assert_eq!(names(&collected), vec!["", "a.png"]);
        assert_eq!(unique_source_images(&collected), vec![SourceImageId::from("a.png")]);
    }

    #[test]
    fn depth_comes_from_world_translation() {
        let world = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0))
            * Mat4::from_translation(Vec3::new(1.0, 0.0, 0.5));
        let sprite = SpriteInstance::new("a", world, 0, 0, 1.0);
        assert_eq!(sprite.sort_key.depth, 2.5);
    }

    #[test]
    fn unique_source_images_keeps_first_occurrence() {
        let sprites = vec![
            sprite("b.png", 0, 0, 0.0),
            sprite("a.png", 0, 0, 0.0),
            sprite("b.png", 1, 0, 0.0),
        ];
        assert_eq!(
            unique_source_images(&sprites),
            vec![SourceImageId::from("b.png"), SourceImageId::from("a.png")]
        );
    }

    #[test]
    fn strips_only_the_final_extension() {
        assert_eq!(SourceImageId::from("art/hero.png").without_extension(), "art/hero");
        assert_eq!(SourceImageId::from("art/hero.v2.png").without_extension(), "art/hero.v2");
        assert_eq!(SourceImageId::from("art/hero").without_extension(), "art/hero");
    }
}
