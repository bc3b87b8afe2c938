//! Software decode engine.
//!
//! [`SimEngine`] speaks the same status protocol as the hardware unit, so
//! the pump, the session teardown and the converter can run on any host.
//! It does not decode anything: it finds the SOF marker in the pushed
//! bitstream to learn the image size, asks for a picture buffer sized for
//! its aligned internal width and fills it with one configured macropixel.
//!
//! Buffers are accessed through [`DmaAllocator::host_view`], the same way
//! the device reaches them through their device addresses.
//!
//! [`SimConfig`] can inject faults (rejected pushes, a rejected
//! reconfiguration, repeated sequence headers, unknown statuses, a failing
//! open) and [`SimStats`] records what the engine saw.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use jhw_common::{BufferKind, Resolution};

use crate::vmeta::chunker::BitstreamChunk;
use crate::vmeta::engine::{
    Command, DecodeEngine, DecodeInfo, EngineBuffer, EngineDriver, EngineStatus,
    PictureDescriptor, SessionParams,
};
use crate::vmeta::memory::DmaAllocator;

/// Internal picture width alignment.
pub const WIDTH_ALIGN: u32 = 16;

/// Mid-gray macropixel (Cb, Y0, Cr, Y1).
pub const GRAY: [u8; 4] = [128, 128, 128, 128];

/// Behaviour of a simulated engine.
///
/// Injected faults fire once; the engine then drops the frame in progress
/// and behaves normally on the next one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Macropixel written across the whole picture.
    pub fill: [u8; 4],
    /// `WaitForEvent` polls before the picture is ready.
    pub wait_cycles: usize,
    /// Sequence headers reported again after the first output buffer.
    pub extra_sequences: usize,
    pub fail_open: Option<i32>,
    pub reject_stream_push: Option<i32>,
    pub reject_picture_push: Option<i32>,
    pub reject_reconfig: Option<i32>,
    /// Reported instead of `FrameComplete`.
    pub unknown_status: Option<i32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fill: GRAY,
            wait_cycles: 1,
            extra_sequences: 0,
            fail_open: None,
            reject_stream_push: None,
            reject_picture_push: None,
            reject_reconfig: None,
            unknown_status: None,
        }
    }
}

/// Counters shared by a driver and every engine it opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub opened: usize,
    pub closed: usize,
    pub stream_pushes: usize,
    pub picture_pushes: usize,
    pub sequences: usize,
    pub frames: usize,
    pub commands: Vec<Command>,
}

/// Opens [`SimEngine`]s.
#[derive(Debug, Clone)]
pub struct SimDriver {
    allocator: Arc<dyn DmaAllocator>,
    config: SimConfig,
    stats: Arc<Mutex<SimStats>>,
}

impl SimDriver {
    pub fn new(allocator: Arc<dyn DmaAllocator>) -> Self {
        Self::with_config(allocator, SimConfig::default())
    }

    pub fn with_config(allocator: Arc<dyn DmaAllocator>, config: SimConfig) -> Self {
        Self {
            allocator,
            config,
            stats: Arc::new(Mutex::new(SimStats::default())),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SimStats {
        self.stats.lock().clone()
    }
}

impl EngineDriver for SimDriver {
    type Engine = SimEngine;

    fn open(&self, params: &SessionParams) -> Result<SimEngine, EngineStatus> {
        if let Some(code) = self.config.fail_open {
            return Err(EngineStatus::Other(code));
        }
        self.stats.lock().opened += 1;
        debug!(output_format = ?params.output_format, "Simulated engine opened");
        Ok(SimEngine {
            allocator: self.allocator.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
            phase: Phase::Input,
            bitstream: Vec::new(),
            input_done: false,
            eos_requested: false,
            source: None,
            scale: 1,
            streams: VecDeque::new(),
            picture: None,
            waits_left: 0,
            sequences_left: 0,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    /// Collecting bitstream until the SOF marker shows up.
    Input,
    /// Geometry known, sequence header not yet reported.
    Sequence,
    /// Waiting for an output buffer.
    Output,
    Decoding,
    /// Picture written, input buffers not yet handed back.
    Returning,
    Stopped,
}

/// A simulated decode engine instance.
pub struct SimEngine {
    allocator: Arc<dyn DmaAllocator>,
    config: SimConfig,
    stats: Arc<Mutex<SimStats>>,
    phase: Phase,
    bitstream: Vec<u8>,
    input_done: bool,
    eos_requested: bool,
    source: Option<Resolution>,
    scale: u32,
    streams: VecDeque<BitstreamChunk>,
    picture: Option<PictureDescriptor>,
    waits_left: usize,
    sequences_left: usize,
}

impl SimEngine {
    /// Geometry of the picture the engine writes at the current scale.
    fn output_geometry(&self) -> Resolution {
        let source = self.source.unwrap_or(Resolution::ZERO);
        let width = source.width.div_ceil(self.scale);
        let height = source.height.div_ceil(self.scale);
        Resolution::new(width.next_multiple_of(WIDTH_ALIGN), height)
    }

    fn read_chunk(&mut self, chunk: &BitstreamChunk) {
        if chunk.data_len == 0 {
            return;
        }
        if let Some(ptr) = self.allocator.host_view(chunk.device_addr, chunk.data_len) {
            // SAFETY: host_view guarantees `data_len` bytes inside a live block.
            let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), chunk.data_len) };
            self.bitstream.extend_from_slice(bytes);
        }
    }

    /// Write the fill macropixel over `data_len` bytes of the held picture.
    fn render(&mut self) -> Option<PictureDescriptor> {
        let mut desc = self.picture.take()?;
        let geometry = self.output_geometry();
        let len = geometry.packed_422_byte_size().min(desc.buf_len);
        if let Some(ptr) = self.allocator.host_view(desc.device_addr, len) {
            // SAFETY: host_view guarantees `len` bytes inside a live block, and
            // the host does not touch a picture while the engine holds it.
            let out = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) };
            for mp in out.chunks_exact_mut(4) {
                mp.copy_from_slice(&self.config.fill);
            }
        }
        desc.data_len = len;
        desc.resolution = geometry;
        Some(desc)
    }

    fn reset_frame(&mut self) {
        self.phase = Phase::Input;
        self.bitstream.clear();
        self.input_done = false;
        self.eos_requested = false;
        self.source = None;
    }
}

impl DecodeEngine for SimEngine {
    fn decode_step(&mut self, info: &mut DecodeInfo) -> EngineStatus {
        let status = match self.phase {
            Phase::Input => {
                self.source = find_sof(&self.bitstream);
                match self.source {
                    Some(source) => {
                        trace!(%source, "SOF found");
                        self.phase = Phase::Sequence;
                        self.sequences_left = self.config.extra_sequences;
                        EngineStatus::WaitForEvent
                    }
                    None if self.eos_requested => {
                        self.reset_frame();
                        EngineStatus::EndOfStream
                    }
                    None => EngineStatus::NeedInput,
                }
            }
            Phase::Sequence => {
                self.stats.lock().sequences += 1;
                let geometry = self.output_geometry();
                info.picture = geometry;
                info.display_buffer_size = geometry.packed_422_byte_size();
                self.phase = Phase::Output;
                EngineStatus::NewVideoSeq
            }
            Phase::Output => {
                let geometry = self.output_geometry();
                info.picture = geometry;
                info.display_buffer_size = geometry.packed_422_byte_size();
                if self.picture.is_none() {
                    EngineStatus::NeedOutputBuf
                } else if self.sequences_left > 0 {
                    self.sequences_left -= 1;
                    self.phase = Phase::Sequence;
                    EngineStatus::WaitForEvent
                } else {
                    self.phase = Phase::Decoding;
                    self.waits_left = self.config.wait_cycles;
                    EngineStatus::WaitForEvent
                }
            }
            Phase::Decoding => {
                if !self.input_done && !self.eos_requested {
                    EngineStatus::NeedInput
                } else if self.waits_left > 0 {
                    self.waits_left -= 1;
                    EngineStatus::WaitForEvent
                } else if let Some(code) = self.config.unknown_status.take() {
                    self.reset_frame();
                    EngineStatus::Other(code)
                } else {
                    self.phase = Phase::Returning;
                    EngineStatus::ReturnInputBuf
                }
            }
            Phase::Returning => match self.render() {
                Some(desc) => {
                    self.picture = Some(desc);
                    self.stats.lock().frames += 1;
                    self.reset_frame();
                    EngineStatus::FrameComplete
                }
                None => {
                    self.reset_frame();
                    EngineStatus::EndOfStream
                }
            },
            Phase::Stopped => EngineStatus::EndOfStream,
        };
        trace!(%status, phase = ?self.phase, "Simulated step");
        status
    }

    fn push_buffer(&mut self, buffer: EngineBuffer) -> EngineStatus {
        match buffer {
            EngineBuffer::Stream(chunk) => {
                if let Some(code) = self.config.reject_stream_push.take() {
                    self.reset_frame();
                    return EngineStatus::Other(code);
                }
                self.stats.lock().stream_pushes += 1;
                self.read_chunk(&chunk);
                self.input_done |= chunk.end_of_unit;
                self.streams.push_back(chunk);
            }
            EngineBuffer::Picture(desc) => {
                if let Some(code) = self.config.reject_picture_push.take() {
                    self.reset_frame();
                    return EngineStatus::Other(code);
                }
                self.stats.lock().picture_pushes += 1;
                self.picture = Some(desc);
            }
        }
        EngineStatus::NoError
    }

    fn pop_buffer(&mut self, kind: BufferKind) -> Option<EngineBuffer> {
        match kind {
            BufferKind::Stream => self.streams.pop_front().map(EngineBuffer::Stream),
            BufferKind::Picture => self.picture.take().map(EngineBuffer::Picture),
        }
    }

    fn send_command(&mut self, command: Command) -> EngineStatus {
        self.stats.lock().commands.push(command);
        match command {
            Command::EndOfStream => {
                self.eos_requested = true;
                EngineStatus::NoError
            }
            Command::StopDecodeStream => {
                self.phase = Phase::Stopped;
                EngineStatus::NoError
            }
            Command::Reconfigure(params) => {
                if let Some(code) = self.config.reject_reconfig.take() {
                    self.reset_frame();
                    return EngineStatus::Other(code);
                }
                self.scale = params.h_scale.max(1);
                EngineStatus::NoError
            }
        }
    }

    fn close(&mut self) {
        self.stats.lock().closed += 1;
        debug!("Simulated engine closed");
    }
}

/// Frame size from the first SOF0/1/2 segment of a JPEG bitstream.
pub fn find_sof(bytes: &[u8]) -> Option<Resolution> {
    bytes.windows(9).find_map(|w| {
        if w[0] != 0xff || !(0xc0..=0xc2).contains(&w[1]) {
            return None;
        }
        let height = u16::from_be_bytes([w[5], w[6]]) as u32;
        let width = u16::from_be_bytes([w[7], w[8]]) as u32;
        (width > 0 && height > 0).then(|| Resolution::new(width, height))
    })
}

/// Build a tiny JFIF-shaped stream: SOI, a baseline SOF for
/// `width` x `height`, `payload` filler bytes and EOI.
pub fn synthetic_jpeg(width: u16, height: u16, payload: usize) -> Vec<u8> {
    let mut out = vec![0xff, 0xd8, 0xff, 0xc0, 0x00, 0x11, 0x08];
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    // three components, 2x1 / 1x1 / 1x1 sampling
    out.extend_from_slice(&[0x03, 0x01, 0x21, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    out.resize(out.len() + payload, 0x5a);
    out.extend_from_slice(&[0xff, 0xd9]);
    out
}
