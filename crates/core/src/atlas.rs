use std::collections::HashMap;

use glam::Vec2;
use serde::Deserialize;

use crate::error::AtlasError;
use crate::sprite::SourceImageId;

/// Pixel rectangle in atlas or source image space, origin top left, y down
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct PixelSize {
    pub w: u32,
    pub h: u32,
}

/// Axis aligned rectangle, `min` is the bottom left corner (y up)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - 0.5 * size,
            size,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.min + 0.5 * self.size
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }
}

// Packer output, "-f jsonarray" layout
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFile {
    frames: Vec<ManifestFrame>,
    meta: ManifestMeta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFrame {
    filename: String,
    frame: PixelRect,
    sprite_source_size: PixelRect,
    source_size: PixelSize,
}

#[derive(Deserialize)]
struct ManifestMeta {
    size: PixelSize,
}

/// Where one source image ended up in the atlas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedEntry {
    /// The trimmed pixels within the atlas
    pub frame: PixelRect,
    /// Inset of the trimmed pixels from the untrimmed top left, and the trimmed size
    pub trim_offset: PixelRect,
    /// Size of the source image before trimming
    pub original_size: PixelSize,
}

impl PackedEntry {
    /// Normalized, y up, texture coordinates of the frame
    pub fn uv_rect(&self, atlas_size: PixelSize) -> Rect {
        let atlas_width = atlas_size.w as f32;
        let atlas_height = atlas_size.h as f32;
        let frame = self.frame;

        let size = Vec2::new(frame.w as f32 / atlas_width, frame.h as f32 / atlas_height);
        // Flip the frame's center rather than its corners, atlas pixels are y down
        let center = Vec2::new(
            (frame.x as f32 + 0.5 * frame.w as f32) / atlas_width,
            1.0 - (frame.y as f32 + 0.5 * frame.h as f32) / atlas_height,
        );
        Rect::from_center_size(center, size)
    }

    /// The visible part of the sprite in its local units, relative to a center pivot
    ///
    /// Trimming removes transparent margins independently on each side, so the visible
    /// rectangle is shifted by half the difference between opposite margins.
    /// Pixel space down is local space up, hence the sign swap on y.
    pub fn local_rect(&self, pixels_per_unit: f32) -> Rect {
        let frame_width = self.frame.w as f32;
        let frame_height = self.frame.h as f32;
        let left = self.trim_offset.x as f32;
        let top = self.trim_offset.y as f32;
        let right = self.original_size.w as f32 - frame_width - left;
        let bottom = self.original_size.h as f32 - frame_height - top;

        let size = Vec2::new(frame_width, frame_height) / pixels_per_unit;
        let center = Vec2::new(
            0.5 * left / pixels_per_unit - 0.5 * right / pixels_per_unit,
            -0.5 * top / pixels_per_unit + 0.5 * bottom / pixels_per_unit,
        );
        Rect::from_center_size(center, size)
    }
}

/// Parsed packer manifest: atlas size plus one entry per packed source image
#[derive(Clone, Debug, PartialEq)]
pub struct PackerManifest {
    atlas_size: PixelSize,
    entries: HashMap<String, PackedEntry>,
}

impl PackerManifest {
    pub fn from_json(json: &str) -> Result<Self, AtlasError> {
        let file: ManifestFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AtlasError> {
        let file: ManifestFile = serde_json::from_slice(bytes)?;
        Self::from_file(file)
    }

    fn from_file(file: ManifestFile) -> Result<Self, AtlasError> {
        let atlas_size = file.meta.size;
        if atlas_size.w == 0 || atlas_size.h == 0 {
            return Err(AtlasError::InvalidManifest(format!(
                "atlas size {}x{} is empty",
                atlas_size.w, atlas_size.h
            )));
        }

        let mut entries = HashMap::with_capacity(file.frames.len());
        for frame in file.frames {
            let entry = PackedEntry {
                frame: frame.frame,
                trim_offset: frame.sprite_source_size,
                original_size: frame.source_size,
            };
            validate_entry(&frame.filename, &entry, atlas_size)?;
            if entries.insert(frame.filename.clone(), entry).is_some() {
                return Err(AtlasError::InvalidManifest(format!(
                    "{} is packed more than once",
                    frame.filename
                )));
            }
        }

        log::debug!(
            "Parsed packer manifest, {} frames in a {}x{} atlas",
            entries.len(),
            atlas_size.w,
            atlas_size.h
        );
        Ok(Self {
            atlas_size,
            entries,
        })
    }

    pub fn atlas_size(&self) -> PixelSize {
        self.atlas_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The packer names frames after their source file without its extension,
    /// so an id matches either exactly or once its extension is dropped
    pub fn entry(&self, id: &SourceImageId) -> Result<&PackedEntry, AtlasError> {
        self.entries
            .get(id.as_str())
            .or_else(|| self.entries.get(id.without_extension()))
            .ok_or_else(|| AtlasError::ManifestEntryNotFound { id: id.clone() })
    }

    pub fn contains(&self, id: &SourceImageId) -> bool {
        self.entry(id).is_ok()
    }

    pub fn uv_rect(&self, id: &SourceImageId) -> Result<Rect, AtlasError> {
        Ok(self.entry(id)?.uv_rect(self.atlas_size))
    }

    pub fn local_rect(&self, id: &SourceImageId, pixels_per_unit: f32) -> Result<Rect, AtlasError> {
        Ok(self.entry(id)?.local_rect(pixels_per_unit))
    }
}

fn validate_entry(name: &str, entry: &PackedEntry, atlas_size: PixelSize) -> Result<(), AtlasError> {
    let frame = entry.frame;
    if entry.trim_offset.w != frame.w || entry.trim_offset.h != frame.h {
        return Err(AtlasError::InvalidManifest(format!(
            "{name}: trimmed size {}x{} differs from frame size {}x{}",
            entry.trim_offset.w, entry.trim_offset.h, frame.w, frame.h
        )));
    }
    let right = frame.x as u64 + frame.w as u64;
    let bottom = frame.y as u64 + frame.h as u64;
    if right > atlas_size.w as u64 || bottom > atlas_size.h as u64 {
        return Err(AtlasError::InvalidManifest(format!(
            "{name}: frame ends at ({right}, {bottom}), outside the {}x{} atlas",
            atlas_size.w, atlas_size.h
        )));
    }
    Ok(())
}
