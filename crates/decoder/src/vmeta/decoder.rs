//! High-level hardware JPEG decoder.
//!
//! `HwJpegDecoder` owns the engine session, the decode pump and the pixel
//! converter. A typical caller:
//!
//! ```ignore
//! let mut decoder = HwJpegDecoder::new(driver, allocator, DecoderConfig::default())?;
//! decoder.initialize()?;
//!
//! if decoder.can_accelerate(width, height) {
//!     decoder.load(&jpeg_bytes)?;
//!     let size = decoder.decode(&mut surface, stride, &DecodeRequest::new(PixelFormat::Bgra32, width, height))?;
//! }
//! ```
//!
//! Per-frame failures leave the session usable: the picture of a failed
//! frame is freed and every chunk reclaimed before `decode` returns.

use std::sync::Arc;

use tracing::{debug, info, warn};

use jhw_common::{
    ClockRate, DecodeError, DecoderConfig, PixelFormat, Resolution, ScaleFactor,
};

use super::clock::{ClockControl, SysfsClock};
use super::engine::{EngineDriver, SessionParams};
use super::memory::DmaAllocator;
use super::pump::DecodePump;
use super::session::VmetaSession;
use crate::convert::PixelConverter;

/// Parameters of one `decode` call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeRequest {
    pub format: PixelFormat,
    pub max_width: u32,
    pub max_height: u32,
    /// Output scale; the engine applies `denom / num` at the next sequence.
    pub scale: ScaleFactor,
}

impl DecodeRequest {
    pub fn new(format: PixelFormat, max_width: u32, max_height: u32) -> Self {
        Self {
            format,
            max_width,
            max_height,
            scale: ScaleFactor::FULL,
        }
    }

    pub fn with_scale(mut self, num: u32, denom: u32) -> Self {
        self.scale = ScaleFactor::new(num, denom);
        self
    }
}

pub struct HwJpegDecoder<D: EngineDriver> {
    driver: D,
    config: DecoderConfig,
    params: SessionParams,
    clock: Option<Box<dyn ClockControl>>,
    session: Option<VmetaSession<D::Engine>>,
    pump: DecodePump,
    converter: PixelConverter,
    frames_decoded: u64,
}

impl<D: EngineDriver> std::fmt::Debug for HwJpegDecoder<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwJpegDecoder")
            .field("initialized", &self.is_initialized())
            .field("matrix", &self.converter.matrix())
            .field("stream_capacity", &self.pump.stream().capacity())
            .field("frames_decoded", &self.frames_decoded)
            .finish()
    }
}

impl<D: EngineDriver> HwJpegDecoder<D> {
    /// Create a decoder. No hardware is touched until [`initialize`](Self::initialize).
    ///
    /// # Errors
    /// `DecodeError::InvalidConfig` if `config` fails validation.
    pub fn new(
        driver: D,
        allocator: Arc<dyn DmaAllocator>,
        config: DecoderConfig,
    ) -> Result<Self, DecodeError> {
        config.validate()?;
        let clock = config
            .clock
            .as_ref()
            .map(|c| Box::new(SysfsClock::from_config(c)) as Box<dyn ClockControl>);
        Ok(Self {
            driver,
            params: SessionParams::default(),
            clock,
            session: None,
            pump: DecodePump::new(allocator, &config),
            converter: PixelConverter::new(config.color_matrix),
            frames_decoded: 0,
            config,
        })
    }

    /// Replace the clock controller derived from the configuration.
    pub fn with_clock(mut self, clock: Box<dyn ClockControl>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.session.as_ref().is_some_and(VmetaSession::is_open)
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn outstanding_chunks(&self) -> usize {
        self.pump.outstanding_chunks()
    }

    /// Acquire the hardware session. Calling it on a live decoder is a no-op.
    pub fn initialize(&mut self) -> Result<(), DecodeError> {
        if self.is_initialized() {
            return Ok(());
        }

        let rate = self.config.clock.as_ref().map(|c| c.rate);
        if let Some(rate) = rate {
            self.set_clock(rate);
        }

        match VmetaSession::open(&self.driver, &self.params) {
            Ok(session) => {
                self.session = Some(session);
                info!(matrix = ?self.converter.matrix(), "HW JPEG decoder initialized");
                Ok(())
            }
            Err(err) => {
                if rate.is_some() {
                    self.set_clock(ClockRate::Mhz500);
                }
                Err(err)
            }
        }
    }

    /// Whether a `width` x `height` picture is worth decoding in hardware.
    pub fn can_accelerate(&self, width: u32, height: u32) -> bool {
        self.is_initialized()
            && Resolution::new(width, height).pixel_count() >= self.config.min_accel_pixels
    }

    /// Scale to try first.
    pub fn first_scale() -> u32 {
        2
    }

    /// Shift `current` left by `direction` steps, or right for a negative one.
    pub fn next_scale(current: u32, direction: i32) -> u32 {
        let steps = direction.unsigned_abs();
        if direction < 0 {
            current.checked_shr(steps).unwrap_or(0)
        } else {
            current.checked_shl(steps).unwrap_or(0)
        }
    }

    /// Host view of the input buffer, grown to hold at least `size` bytes.
    pub fn stream_buffer(&mut self, size: usize) -> Result<&mut [u8], DecodeError> {
        let stream = self.pump.stream_mut();
        stream.ensure_capacity(size)?;
        Ok(stream.as_mut_slice())
    }

    /// Declare how many bytes of the input buffer hold the picture.
    pub fn prepare(&mut self, data_len: usize) -> Result<usize, DecodeError> {
        self.pump.stream_mut().prepare(data_len)
    }

    /// Copy a compressed picture into the input buffer and prepare it.
    pub fn load(&mut self, data: &[u8]) -> Result<usize, DecodeError> {
        self.pump.stream_mut().load(data)
    }

    /// Decode the prepared picture into `dst`.
    ///
    /// Returns the converted size: the requested maximum clamped to the
    /// decoded picture.
    ///
    /// # Errors
    /// Session not initialized, unsupported format or scale, any engine
    /// failure, or a destination too small for the output.
    pub fn decode(
        &mut self,
        dst: &mut [u8],
        stride: usize,
        request: &DecodeRequest,
    ) -> Result<Resolution, DecodeError> {
        let session = self.session.as_mut().ok_or(DecodeError::InvalidSession)?;
        let engine = session.engine_mut()?;

        if !request.format.is_convert_target() {
            warn!(format = ?request.format, "Incorrect output format requested");
            return Err(DecodeError::UnsupportedFormat(request.format));
        }
        let divider = request.scale.divider().ok_or(DecodeError::InvalidScale {
            num: request.scale.num,
            denom: request.scale.denom,
        })?;

        self.pump.run(engine, divider)?;

        let Some(picture) = self.pump.picture() else {
            return Err(DecodeError::NoPicture);
        };
        let decoded = picture.resolution();
        let output = Resolution::new(request.max_width, request.max_height).min(decoded);
        let result = self.converter.convert(
            picture.data(),
            decoded,
            dst,
            stride,
            output,
            request.format,
        );
        self.pump.release_picture();
        result?;

        self.frames_decoded += 1;
        debug!(
            decoded = %decoded,
            output = %output,
            format = ?request.format,
            scale = %request.scale,
            "Picture decoded"
        );
        Ok(output)
    }

    /// Release every buffer and the hardware session. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let Some(mut session) = self.session.take() {
            let pump = &mut self.pump;
            session.shutdown(|buffer| pump.reclaim(buffer));
            self.pump.release_picture();
            if self.config.clock.is_some() {
                self.set_clock(ClockRate::Mhz500);
            }
        }
        self.pump.stream_mut().free();
    }

    fn set_clock(&mut self, rate: ClockRate) {
        if let Some(clock) = self.clock.as_mut() {
            if let Err(err) = clock.set_rate(rate) {
                warn!(error = %err, "Unable to set decode clock");
            }
        }
    }
}

impl<D: EngineDriver> Drop for HwJpegDecoder<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}
