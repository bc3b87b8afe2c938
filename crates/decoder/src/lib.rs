//! `jhw-decoder` — Hardware JPEG decoding with packed 4:2:2 → RGB output.
//!
//! Drives a vMeta-style decode engine through its status protocol, feeding
//! compressed bytes in bounded DMA chunks and harvesting one decoded picture
//! per frame, then converts the engine's interleaved YCbCr into RGB24 or
//! BGRA32 with table-driven fixed-point arithmetic.
//!
//! ## Module Overview
//!
//! - [`vmeta`] — Engine interface, DMA memory, decode pump, public decoder
//! - [`convert`] — Colour tables and the packed 4:2:2 converter
//! - [`sim`] — Software engine speaking the same protocol, for hosts
//!   without the decode unit and for tests
//!
//! ## Usage
//!
//! ```ignore
//! use jhw_common::{DecoderConfig, PixelFormat};
//! use jhw_decoder::sim::SimDriver;
//! use jhw_decoder::vmeta::{DecodeRequest, HeapDma, HwJpegDecoder};
//!
//! let heap = HeapDma::shared();
//! let mut decoder = HwJpegDecoder::new(SimDriver::new(heap.clone()), heap, DecoderConfig::default())?;
//! decoder.initialize()?;
//!
//! decoder.load(&jpeg)?;
//! let request = DecodeRequest::new(PixelFormat::Rgb24, 200, 200);
//! let size = decoder.decode(&mut surface, 200 * 3, &request)?;
//! ```

pub mod convert;
pub mod sim;
pub mod vmeta;

pub use convert::PixelConverter;
pub use vmeta::{DecodeRequest, HwJpegDecoder};
