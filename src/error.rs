//! Error taxonomy shared across the pipeline (spec §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SanjuuniError {
    #[error("palette index {0} out of range (max 15)")]
    InvalidPaletteIndex(u8),

    #[error("color count must be a power of two, got {0}")]
    NotPowerOfTwo(u32),

    #[error("canonical code length {0} exceeds 15 bits")]
    CodeTooLong(u8),

    #[error("unknown chunk type {0} at offset {1}")]
    UnknownChunkType(u8, u64),

    #[error("bad magic bytes at offset {0}")]
    BadMagic(u64),

    #[error("truncated stream at offset {0}")]
    Truncated(u64),

    #[error("cell block contains too many distinct colors (max 16 palette entries)")]
    TooManyColors,

    #[error("row/cell index out of range: {0}")]
    OutOfRange(String),

    #[error("unsupported external interface: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SanjuuniError>;
