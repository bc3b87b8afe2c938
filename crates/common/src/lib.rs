//! `jhw-common` — Shared types, configuration, and errors for the hardware
//! JPEG decoder.
//!
//! - **Types**: `Resolution`, `ScaleFactor`
//! - **Color**: `PixelFormat`, `ColorMatrix`
//! - **Config**: `DecoderConfig`, `ClockConfig`, `ClockRate`
//! - **Errors**: `DecodeError`, `BufferKind` (thiserror-based)

pub mod color;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use color::{ColorMatrix, PixelFormat};
pub use config::{ClockConfig, ClockRate, DecoderConfig};
pub use error::{BufferKind, DecodeError, DecodeResult};
pub use types::{Resolution, ScaleFactor};
