use std::path::PathBuf;

use thiserror::Error;

// Error
//------------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum BridgeError {
    /// External generator unavailable, timed out, exited non-zero or spoke a
    /// malformed matrix protocol.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Matrix malformed: empty, non-square or ragged rows.
    #[error("invalid matrix: {0}")]
    Validation(String),

    /// Image missing or unreadable. Recoverable per item in batch decodes.
    #[error("could not load image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The whole batch yielded zero payloads.
    #[error("no QR payloads decoded")]
    DecodeEmpty,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
