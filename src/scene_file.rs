use std::{
    fs, io,
    path::{Path, PathBuf},
};

use glam::{Quat, Vec3};
use serde::Deserialize;
use spritepack_core::{NodeId, SpriteRenderer, SpriteScene, Transform};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneFileError {
    #[error("failed to read scene {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed scene: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("node {node} has pixels_per_unit {value}, expected a positive number")]
    InvalidPixelsPerUnit { node: String, value: f32 },
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SceneDescription {
    nodes: Vec<NodeDescription>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct NodeDescription {
    #[serde(default)]
    name: String,
    #[serde(default)]
    position: Vec3,
    #[serde(default = "identity")]
    rotation: Quat,
    #[serde(default = "unit_scale")]
    scale: Vec3,
    #[serde(default = "active")]
    active: bool,
    #[serde(default)]
    sprite: Option<SpriteDescription>,
    #[serde(default)]
    children: Vec<NodeDescription>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SpriteDescription {
    image: PathBuf,
    #[serde(default)]
    layer: i32,
    #[serde(default)]
    order: i32,
    #[serde(default = "pixels_per_unit")]
    pixels_per_unit: f32,
}

fn identity() -> Quat {
    Quat::IDENTITY
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

fn active() -> bool {
    true
}

fn pixels_per_unit() -> f32 {
    100.0
}

/// Load a scene description, image paths resolve against the file's directory
pub fn load<P: AsRef<Path>>(path: P) -> Result<SpriteScene, SceneFileError> {
    let path = path.as_ref();
    let read_error = |source| SceneFileError::Read {
        path: path.to_path_buf(),
        source,
    };
    let json = fs::read_to_string(path).map_err(read_error)?;
    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent),
        _ => std::env::current_dir(),
    }
    .map_err(read_error)?;
    from_json(&json, &base_dir)
}

/// Build a scene from its JSON description
///
/// ```json
/// { "nodes": [{ "name": "hero", "position": [1, 2, 0],
///               "sprite": { "image": "hero.png", "layer": 1 },
///               "children": [] }] }
/// ```
pub fn from_json(json: &str, base_dir: &Path) -> Result<SpriteScene, SceneFileError> {
    let description: SceneDescription = serde_json::from_str(json)?;
    let mut scene = SpriteScene::new();
    for node in &description.nodes {
        add_node(&mut scene, node, None, base_dir)?;
    }
    log::debug!("Loaded scene with {} nodes", scene.hierarchy.len());
    Ok(scene)
}

fn add_node(
    scene: &mut SpriteScene,
    node: &NodeDescription,
    parent: Option<NodeId>,
    base_dir: &Path,
) -> Result<(), SceneFileError> {
    let sprite = match &node.sprite {
        Some(sprite) => {
            if !sprite.pixels_per_unit.is_finite() || sprite.pixels_per_unit <= 0.0 {
                return Err(SceneFileError::InvalidPixelsPerUnit {
                    node: node.name.clone(),
                    value: sprite.pixels_per_unit,
                });
            }
            let image = base_dir.join(&sprite.image);
            Some(
                SpriteRenderer::new(image.to_string_lossy().into_owned())
                    .with_layer(sprite.layer)
                    .with_order(sprite.order)
                    .with_pixels_per_unit(sprite.pixels_per_unit),
            )
        }
        None => None,
    };

    let transform = Transform::new(node.position, node.rotation, node.scale);
    let id = scene.add(node.name.clone(), transform, sprite, parent);
    scene.set_active(id, node.active);
    for child in &node.children {
        add_node(scene, child, Some(id), base_dir)?;
    }
    Ok(())
}
