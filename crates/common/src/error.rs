//! Central error types for the decoder (thiserror-based).

use thiserror::Error;

use crate::color::PixelFormat;

/// Kind of buffer exchanged with the decode engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Compressed bitstream chunk (input).
    Stream,
    /// Decoded picture buffer (output).
    Picture,
}

/// Hardware decoder errors.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("HW decoder init failed: {reason}")]
    HwDecoderInit { reason: String },

    #[error("Decoder session not initialized or already disposed")]
    InvalidSession,

    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),

    #[error("DMA allocation failed: {size} bytes (align {align})")]
    AllocFailed { size: usize, align: usize },

    #[error("No compressed stream has been prepared")]
    NoInput,

    #[error("Engine rejected {kind:?} buffer with status {status}")]
    PushRejected { kind: BufferKind, status: i32 },

    #[error("Engine reconfiguration failed with status {0}")]
    ReconfigFailed(i32),

    #[error("Unexpected engine status {0}")]
    UnexpectedStatus(i32),

    #[error("Stream ended without a decoded picture")]
    NoPicture,

    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("Invalid scale {num}/{denom}")]
    InvalidScale { num: u32, denom: u32 },

    #[error("Destination too small: need {needed} bytes, got {got}")]
    DestinationTooSmall { needed: usize, got: usize },

    #[error("Stride {stride} is smaller than a row of {row_bytes} bytes")]
    StrideTooSmall { stride: usize, row_bytes: usize },

    #[error("Decoded picture too small: need {needed} bytes, got {got}")]
    PictureTooSmall { needed: usize, got: usize },
}

/// Convenience Result type for decoder operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
