//! vMeta hardware JPEG decode path.
//!
//! The decode unit is driven through a poll loop: the host feeds bounded
//! bitstream chunks from a DMA input buffer, supplies one picture buffer when
//! asked, and collects the decoded picture as packed YCbCr 4:2:2.
//!
//! # Module Structure
//!
//! - [`memory`] — DMA allocator trait, RAII blocks, heap-backed allocator.
//! - [`stream`] — Growable input buffer with end-of-unit padding.
//! - [`chunker`] — Splits the input buffer into chunks, counts those in flight.
//! - [`engine`] — Engine/driver traits, statuses, tagged buffers, commands.
//! - [`session`] — RAII engine session with the teardown sequence.
//! - [`pump`] — Status → handler transition table for one frame.
//! - [`decoder`] — `HwJpegDecoder`, the public entry point.
//! - [`clock`] — Decode unit clock control.
//!
//! # Data flow
//!
//! 1. The caller copies compressed bytes into the [`InputStream`] and prepares it.
//! 2. [`DecodePump::run`] polls the engine and reacts to each status.
//! 3. The engine consumes chunks and fills the picture buffer.
//! 4. [`PixelConverter`](crate::convert::PixelConverter) writes RGB24 or BGRA32
//!    into the caller's surface and the picture buffer is freed.

pub mod chunker;
pub mod clock;
pub mod decoder;
pub mod engine;
pub mod memory;
pub mod pump;
pub mod session;
pub mod stream;

pub use chunker::{BitstreamChunk, Chunker};
pub use clock::{ClockControl, ClockError, SysfsClock};
pub use decoder::{DecodeRequest, HwJpegDecoder};
pub use engine::{
    Command, DecodeEngine, DecodeInfo, EngineBuffer, EngineDriver, EngineStatus,
    PictureDescriptor, ReconfigParams, Roi, SessionParams,
};
pub use memory::{CachePolicy, DmaAllocator, DmaBlock, DmaError, DmaRegion, HeapDma};
pub use pump::{DecodePump, FrameContext, PictureBuffer, Transition};
pub use session::{DrainStats, VmetaSession};
pub use stream::InputStream;
