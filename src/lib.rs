//! Merge a scene's sprites into one packed atlas texture and one mesh.
//!
//! [`pack`] runs the whole operation: collect the sprites in draw order, hand
//! the distinct source images to an [`AtlasPacker`], parse its manifest, build
//! the mesh and decode the atlas image into the requested [`TargetFormat`].

use spritepack_core::{
    collect, unique_source_images, AtlasError, AtlasMesh, FrontFace, PackerManifest,
    SpriteInstance, SpriteSource,
};
use thiserror::Error;

pub mod packer;
pub mod scene_file;
pub mod texture;

pub use spritepack_core;

use crate::packer::{AtlasPacker, PackRequest, PackerConfig, ProcessError};
use crate::texture::{AtlasTexture, TargetFormat, TextureError};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Atlas(#[from] AtlasError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackConfig {
    pub packer: PackerConfig,
    pub target_format: TargetFormat,
    pub front_face: FrontFace,
}

impl PackConfig {
    pub fn with_packer(mut self, packer: PackerConfig) -> Self {
        self.packer = packer;
        self
    }

    pub fn with_target_format(mut self, target_format: TargetFormat) -> Self {
        self.target_format = target_format;
        self
    }

    pub fn with_front_face(mut self, front_face: FrontFace) -> Self {
        self.front_face = front_face;
        self
    }
}

/// Everything one pack operation produces, owned by the caller
#[derive(Debug)]
pub struct PackedSprites {
    /// The sprites in the order their quads appear in the mesh
    pub sprites: Vec<SpriteInstance>,
    pub mesh: AtlasMesh,
    /// `None` when there was nothing to pack
    pub texture: Option<AtlasTexture>,
    /// Error stream text of a successful packer run
    pub diagnostics: String,
}

/// Pack every sprite `source` yields into one atlas and one mesh
///
/// Blocks until the packer returns. Any failure aborts the whole operation,
/// no partial mesh is produced.
pub fn pack<S: SpriteSource + ?Sized>(
    source: &S,
    packer: &dyn AtlasPacker,
    config: &PackConfig,
) -> Result<PackedSprites, Error> {
    let sprites = collect(source);
    if sprites.is_empty() {
        log::info!("No sprites to pack");
        return Ok(PackedSprites {
            sprites,
            mesh: AtlasMesh::default(),
            texture: None,
            diagnostics: String::new(),
        });
    }

    // an image that can never be packed fails before the packer runs
    if let Some(sprite) = sprites.iter().find(|sprite| sprite.source_image.is_empty()) {
        return Err(AtlasError::ManifestEntryNotFound {
            id: sprite.source_image.clone(),
        }
        .into());
    }

    let request = PackRequest {
        images: unique_source_images(&sprites),
        config: config.packer.clone(),
    };
    log::info!(
        "Packing {} sprites from {} source images",
        sprites.len(),
        request.images.len()
    );
    for image in &request.images {
        log::debug!("  {image}");
    }

    let output = packer.pack(&request)?;
    if !output.diagnostics.trim().is_empty() {
        log::warn!("Packer reported: {}", output.diagnostics.trim());
    }

    let manifest = PackerManifest::from_slice(&output.manifest_json)?;
    let mesh = AtlasMesh::build(&sprites, &manifest, config.front_face)?;
    let texture = AtlasTexture::decode(&output.atlas_image, config.target_format)?;
    log::info!(
        "Built atlas mesh with {} quads, {}x{} {} texture",
        mesh.quad_count(),
        texture.width(),
        texture.height(),
        texture.format
    );

    Ok(PackedSprites {
        sprites,
        mesh,
        texture: Some(texture),
        diagnostics: output.diagnostics,
    })
}
