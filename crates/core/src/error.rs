use thiserror::Error;

use crate::sprite::SourceImageId;

/// Errors raised while reading a packer manifest or querying it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// The packer produced no frame for an image a sprite draws,
    /// the sprite list and the atlas are out of sync
    #[error("no packed frame for source image {id}")]
    ManifestEntryNotFound { id: SourceImageId },

    /// The manifest is not JSON of the expected shape
    #[error("malformed packer manifest at line {line}, column {column}: {message}")]
    ManifestParse {
        line: usize,
        column: usize,
        message: String,
    },

    /// Well formed, but breaks the packer's own contract
    #[error("invalid packer manifest: {0}")]
    InvalidManifest(String),
}

impl From<serde_json::Error> for AtlasError {
    fn from(error: serde_json::Error) -> Self {
        AtlasError::ManifestParse {
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        }
    }
}
