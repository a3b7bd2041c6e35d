//! Engine error types.

use thiserror::Error;

/// Errors produced by the pixel engine, its codecs and the edit session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An edit was requested while no image is loaded.
    #[error("no image loaded")]
    NullImage,

    /// Pixel access outside the buffer. Internal callers never trigger this;
    /// seeing it means a partition handed out an index it does not own.
    #[error("pixel ({x}, {y}) is outside a {width}x{height} buffer")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    /// Encode/decode requested for an unrecognised extension or format hint.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Revert requested with too little history. Treated as a no-op.
    #[error("cannot revert {pending} step(s) with {depth} snapshot(s) recorded")]
    HistoryUnderflow { depth: usize, pending: usize },

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions { width: u32, height: u32, reason: String },

    /// A cancellable filter pass observed its token and stopped.
    #[error("filter pass cancelled")]
    Cancelled,

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
