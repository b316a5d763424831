use glam::{Vec2, Vec3};
use primitives::quad::{self, FrontFace, INDICES_PER_QUAD, VERTICES_PER_QUAD};
use serde::Serialize;

use crate::atlas::PackerManifest;
use crate::error::AtlasError;
use crate::sprite::SpriteInstance;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Every sprite as one quad in a single buffer set, drawn with the atlas texture
/// Positions are world space, uvs are y up
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AtlasMesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl AtlasMesh {
    /// One quad per sprite, in the order given
    ///
    /// Quad `k` occupies vertices `4k..4k+4`, corners counter-clockwise from the
    /// local rectangle's min corner, and indices `6k..6k+6`. Any sprite whose image
    /// is not in the manifest fails the whole build.
    pub fn build(
        sprites: &[SpriteInstance],
        manifest: &PackerManifest,
        front_face: FrontFace,
    ) -> Result<Self, AtlasError> {
        let mut positions = Vec::with_capacity(sprites.len() * VERTICES_PER_QUAD);
        let mut uvs = Vec::with_capacity(sprites.len() * VERTICES_PER_QUAD);
        let mut indices = Vec::with_capacity(sprites.len() * INDICES_PER_QUAD);

        for sprite in sprites {
            let local = manifest.local_rect(&sprite.source_image, sprite.pixels_per_unit)?;
            let uv = manifest.uv_rect(&sprite.source_image)?;

            quad::extend_indices(&mut indices, positions.len() as u32, front_face);
            positions.extend(
                quad::corners(local.min, local.size)
                    .iter()
                    .map(|corner| sprite.world_transform.transform_point3(corner.extend(0.0))),
            );
            uvs.extend(quad::corners(uv.min, uv.size));
        }

        log::debug!(
            "Built atlas mesh: {} quads, {} vertices, {} indices",
            sprites.len(),
            positions.len(),
            indices.len()
        );
        Ok(Self {
            positions,
            uvs,
            indices,
        })
    }

    pub fn quad_count(&self) -> usize {
        self.positions.len() / VERTICES_PER_QUAD
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaved vertices, ready to copy into a vertex buffer
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(self.uvs.iter())
            .map(|(position, uv)| Vertex {
                position: position.to_array(),
                tex_coords: uv.to_array(),
            })
            .collect()
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
