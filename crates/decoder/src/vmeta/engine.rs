//! Decode engine interface.
//!
//! The engine is an opaque, poll-driven state machine: every call returns an
//! [`EngineStatus`], and buffers travel between the host and the engine as
//! tagged [`EngineBuffer`] values. Memory behind the buffers stays owned by
//! the host; the engine only sees device addresses.

use std::fmt;

use jhw_common::{BufferKind, PixelFormat, Resolution};

use super::chunker::BitstreamChunk;

/// Status returned by every engine call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    NoError,
    /// The engine wants more bitstream.
    NeedInput,
    /// The engine is done with some stream buffers.
    ReturnInputBuf,
    /// The engine wants a picture buffer to decode into.
    NeedOutputBuf,
    /// A picture has been fully decoded.
    FrameComplete,
    /// The end-of-stream command has been processed.
    EndOfStream,
    /// Still busy; poll again.
    WaitForEvent,
    /// A new sequence header was parsed; geometry is known.
    NewVideoSeq,
    /// Anything else, including failures.
    Other(i32),
}

impl EngineStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::NeedInput => 1,
            Self::ReturnInputBuf => 2,
            Self::NeedOutputBuf => 3,
            Self::FrameComplete => 4,
            Self::EndOfStream => 5,
            Self::WaitForEvent => 6,
            Self::NewVideoSeq => 7,
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::NeedInput,
            2 => Self::ReturnInputBuf,
            3 => Self::NeedOutputBuf,
            4 => Self::FrameComplete,
            5 => Self::EndOfStream,
            6 => Self::WaitForEvent,
            7 => Self::NewVideoSeq,
            other => Self::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::NoError
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "status {code}"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// Output picture as seen by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PictureDescriptor {
    pub device_addr: u64,
    /// Capacity of the buffer behind `device_addr`.
    pub buf_len: usize,
    /// Bytes written by the engine.
    pub data_len: usize,
    /// Geometry of the decoded picture (internal aligned width).
    pub resolution: Resolution,
}

impl PictureDescriptor {
    pub fn empty(device_addr: u64, buf_len: usize) -> Self {
        Self {
            device_addr,
            buf_len,
            data_len: 0,
            resolution: Resolution::ZERO,
        }
    }
}

/// A buffer exchanged with the engine, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineBuffer {
    Stream(BitstreamChunk),
    Picture(PictureDescriptor),
}

impl EngineBuffer {
    pub fn kind(&self) -> BufferKind {
        match self {
            Self::Stream(_) => BufferKind::Stream,
            Self::Picture(_) => BufferKind::Picture,
        }
    }
}

/// Filled in by [`DecodeEngine::decode_step`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeInfo {
    /// Picture buffer size the engine needs, valid from `NewVideoSeq` on.
    pub display_buffer_size: usize,
    /// Decoded geometry, valid from `NewVideoSeq` on.
    pub picture: Resolution,
}

/// Region of interest; all zero means the full frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const FULL_FRAME: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn is_full_frame(&self) -> bool {
        *self == Self::FULL_FRAME
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReconfigParams {
    pub h_scale: u32,
    pub v_scale: u32,
    pub roi: Roi,
}

/// Commands sent to the engine out of band.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// No more input for this unit.
    EndOfStream,
    /// Abort decoding so every buffer can be popped.
    StopDecodeStream,
    /// Apply scaling and cropping from the next sequence on.
    Reconfigure(ReconfigParams),
}

/// Parameters used to open a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionParams {
    /// Layout the engine writes into picture buffers.
    pub output_format: PixelFormat,
    /// Allow other processes to share the unit.
    pub multi_instance: bool,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            output_format: PixelFormat::Ycbcr422Interleaved,
            multi_instance: true,
        }
    }
}

/// One open decode engine instance.
pub trait DecodeEngine: Send {
    /// Advance the engine by one step.
    fn decode_step(&mut self, info: &mut DecodeInfo) -> EngineStatus;

    /// Hand a buffer to the engine.
    fn push_buffer(&mut self, buffer: EngineBuffer) -> EngineStatus;

    /// Take back one buffer of `kind`, if the engine has any to return.
    fn pop_buffer(&mut self, kind: BufferKind) -> Option<EngineBuffer>;

    fn send_command(&mut self, command: Command) -> EngineStatus;

    /// Release the engine. Called once, after every buffer has been popped.
    fn close(&mut self);
}

/// Factory for engines; the vendor library or a software stand-in.
pub trait EngineDriver {
    type Engine: DecodeEngine;

    fn open(&self, params: &SessionParams) -> Result<Self::Engine, EngineStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip_through_other() {
        assert_eq!(EngineStatus::from_code(7), EngineStatus::NewVideoSeq);
        assert_eq!(EngineStatus::from_code(-9), EngineStatus::Other(-9));
        assert_eq!(EngineStatus::Other(-9).code(), -9);
        assert_eq!(EngineStatus::Other(-9).to_string(), "status -9");
        assert_eq!(EngineStatus::WaitForEvent.to_string(), "WaitForEvent");
    }

    #[test]
    fn buffer_kind_follows_tag() {
        let pic = EngineBuffer::Picture(PictureDescriptor::empty(0x1000, 64));
        assert_eq!(pic.kind(), BufferKind::Picture);
        assert!(Roi::default().is_full_frame());
    }
}
