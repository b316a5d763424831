//! Maps a scene's sprites onto a packed texture atlas as one mesh.
//!
//! Three stages, each usable alone:
//! - [`sprite::collect`] gathers sprites from any [`sprite::SpriteSource`] in draw order
//! - [`atlas::PackerManifest`] answers where an image sits in the atlas and how big it is locally
//! - [`mesh::AtlasMesh::build`] turns the ordered sprites into one quad each

pub mod atlas;
pub mod error;
pub mod mesh;
pub mod scene;
pub mod sprite;
pub mod transform;
pub mod transform_hierarchy;

pub use atlas::{PackedEntry, PackerManifest, PixelRect, PixelSize, Rect};
pub use error::AtlasError;
pub use mesh::{AtlasMesh, Vertex};
pub use primitives::quad::FrontFace;
pub use scene::{SceneSprites, SpriteRenderer, SpriteScene};
pub use sprite::{collect, unique_source_images, SortKey, SourceImageId, SpriteInstance, SpriteSource};
pub use transform::Transform;
pub use transform_hierarchy::NodeId;
