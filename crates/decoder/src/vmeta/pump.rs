//! The decode pump: drives one frame through the engine.
//!
//! Each poll of [`DecodeEngine::decode_step`] yields a status. The status is
//! looked up in an explicit transition table and its handler runs against
//! the pump state plus a per-frame [`FrameContext`]. Handlers return a
//! [`Transition`] telling the loop whether to poll again, stop, or abort.
//!
//! | Status            | Handler                                           |
//! |-------------------|---------------------------------------------------|
//! | `NeedInput`       | push the next chunk, or send `EndOfStream`        |
//! | `ReturnInputBuf`  | reclaim every outstanding chunk                   |
//! | `NeedOutputBuf`   | allocate and push the picture buffer (once)       |
//! | `FrameComplete`   | pop the picture, reclaim chunks, finish           |
//! | `EndOfStream`     | reclaim chunks, finish without a picture          |
//! | `WaitForEvent`    | poll again                                        |
//! | `NewVideoSeq`     | drop a stale picture, reconfigure the scale       |
//! | anything else     | abort                                             |
//!
//! Between polls there is at most one picture buffer alive, and the
//! chunker's outstanding count equals chunks pushed minus chunks reclaimed.
//! Both are back to their resting state (no chunks, picture only after
//! `FrameComplete`) whenever [`DecodePump::run`] returns.

use std::sync::Arc;

use tracing::{debug, error, warn};

use jhw_common::{BufferKind, DecodeError, DecoderConfig, Resolution};

use super::chunker::Chunker;
use super::engine::{
    Command, DecodeEngine, DecodeInfo, EngineBuffer, EngineStatus, PictureDescriptor,
    ReconfigParams, Roi,
};
use super::memory::{CachePolicy, DmaAllocator, DmaBlock};
use super::stream::InputStream;

// ---------------------------------------------------------------------------
// Picture buffer
// ---------------------------------------------------------------------------

/// Output picture owned by the pump while the engine writes into it.
#[derive(Debug)]
pub struct PictureBuffer {
    block: DmaBlock,
    data_len: usize,
    resolution: Resolution,
}

impl PictureBuffer {
    pub fn capacity(&self) -> usize {
        self.block.size()
    }

    pub fn device_addr(&self) -> u64 {
        self.block.device_addr()
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Decoded geometry, zero until the frame completes.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Bytes written by the engine.
    pub fn data(&self) -> &[u8] {
        &self.block.as_slice()[..self.data_len]
    }

    fn descriptor(&self) -> PictureDescriptor {
        PictureDescriptor::empty(self.device_addr(), self.capacity())
    }

    fn complete(&mut self, desc: &PictureDescriptor) {
        self.data_len = desc.data_len.min(self.capacity());
        self.resolution = desc.resolution;
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Outcome of one handler.
#[derive(Debug)]
pub enum Transition {
    /// Poll the engine again.
    Continue,
    /// Frame decoded; the picture is held.
    Complete,
    /// Stream ended without a picture.
    Finished,
    /// Frame failed.
    Abort(DecodeError),
}

/// Per-frame state shared by the handlers.
#[derive(Debug)]
pub struct FrameContext {
    pub info: DecodeInfo,
    /// Horizontal and vertical scale divider for the next reconfiguration.
    pub divider: u32,
    /// Chunks pushed during this frame.
    pub pushed: usize,
    /// `EndOfStream` command already sent.
    pub eos_sent: bool,
    /// `NewVideoSeq` events seen during this frame.
    pub sequences: usize,
}

impl FrameContext {
    pub fn new(divider: u32) -> Self {
        Self {
            info: DecodeInfo::default(),
            divider,
            pushed: 0,
            eos_sent: false,
            sequences: 0,
        }
    }
}

pub type Handler<E> = fn(&mut DecodePump, &mut E, &mut FrameContext) -> Transition;

/// Status → handler mapping. Statuses not listed abort the frame.
pub fn transitions<E: DecodeEngine>() -> [(EngineStatus, Handler<E>); 7] {
    [
        (EngineStatus::NeedInput, on_need_input::<E> as Handler<E>),
        (EngineStatus::ReturnInputBuf, on_return_input::<E> as Handler<E>),
        (EngineStatus::NeedOutputBuf, on_need_output::<E> as Handler<E>),
        (EngineStatus::FrameComplete, on_frame_complete::<E> as Handler<E>),
        (EngineStatus::EndOfStream, on_end_of_stream::<E> as Handler<E>),
        (EngineStatus::WaitForEvent, on_wait::<E> as Handler<E>),
        (EngineStatus::NewVideoSeq, on_new_sequence::<E> as Handler<E>),
    ]
}

fn handler_for<E: DecodeEngine>(status: EngineStatus) -> Option<Handler<E>> {
    transitions::<E>()
        .into_iter()
        .find(|(s, _)| *s == status)
        .map(|(_, handler)| handler)
}

fn on_need_input<E: DecodeEngine>(
    pump: &mut DecodePump,
    engine: &mut E,
    ctx: &mut FrameContext,
) -> Transition {
    let Some(chunk) = pump.chunker.next_chunk(&mut pump.stream) else {
        if !ctx.eos_sent {
            debug!(pushed = ctx.pushed, "Input exhausted, sending end of stream");
        }
        let status = engine.send_command(Command::EndOfStream);
        if !status.is_ok() {
            warn!(%status, "End-of-stream command not accepted");
        }
        ctx.eos_sent = true;
        return Transition::Continue;
    };

    let status = engine.push_buffer(EngineBuffer::Stream(chunk));
    if !status.is_ok() {
        pump.chunker.release(1);
        return Transition::Abort(DecodeError::PushRejected {
            kind: BufferKind::Stream,
            status: status.code(),
        });
    }
    ctx.pushed += 1;
    Transition::Continue
}

fn on_return_input<E: DecodeEngine>(
    pump: &mut DecodePump,
    engine: &mut E,
    _ctx: &mut FrameContext,
) -> Transition {
    pump.reclaim_chunks(engine);
    Transition::Continue
}

fn on_need_output<E: DecodeEngine>(
    pump: &mut DecodePump,
    engine: &mut E,
    ctx: &mut FrameContext,
) -> Transition {
    if pump.picture.is_some() {
        return Transition::Continue;
    }

    let size = ctx.info.display_buffer_size;
    let block = match DmaBlock::alloc(
        &pump.allocator,
        size,
        pump.picture_align,
        CachePolicy::Uncached,
    ) {
        Ok(block) => block,
        Err(err) => return Transition::Abort(err.into()),
    };
    let picture = PictureBuffer {
        block,
        data_len: 0,
        resolution: Resolution::ZERO,
    };

    let status = engine.push_buffer(EngineBuffer::Picture(picture.descriptor()));
    if !status.is_ok() {
        return Transition::Abort(DecodeError::PushRejected {
            kind: BufferKind::Picture,
            status: status.code(),
        });
    }
    debug!(size, device_addr = picture.device_addr(), "Picture buffer pushed");
    pump.picture = Some(picture);
    Transition::Continue
}

fn on_frame_complete<E: DecodeEngine>(
    pump: &mut DecodePump,
    engine: &mut E,
    _ctx: &mut FrameContext,
) -> Transition {
    if let Some(EngineBuffer::Picture(desc)) = engine.pop_buffer(BufferKind::Picture) {
        match pump.picture.as_mut() {
            Some(picture) if picture.device_addr() == desc.device_addr => picture.complete(&desc),
            held => {
                warn!(
                    returned = desc.device_addr,
                    held = ?held.map(|p| p.device_addr()),
                    "Engine completed a picture buffer it was not given"
                );
                return Transition::Abort(DecodeError::UnexpectedStatus(
                    EngineStatus::FrameComplete.code(),
                ));
            }
        }
    }
    pump.reclaim_chunks(engine);
    if pump.picture.is_some() {
        Transition::Complete
    } else {
        Transition::Finished
    }
}

fn on_end_of_stream<E: DecodeEngine>(
    pump: &mut DecodePump,
    engine: &mut E,
    _ctx: &mut FrameContext,
) -> Transition {
    pump.reclaim_chunks(engine);
    Transition::Finished
}

fn on_wait<E: DecodeEngine>(
    _pump: &mut DecodePump,
    _engine: &mut E,
    _ctx: &mut FrameContext,
) -> Transition {
    Transition::Continue
}

fn on_new_sequence<E: DecodeEngine>(
    pump: &mut DecodePump,
    engine: &mut E,
    ctx: &mut FrameContext,
) -> Transition {
    ctx.sequences += 1;
    if pump.picture.is_some() {
        debug!("Dropping stale picture buffer");
        pump.recall_picture(engine);
    }

    let params = ReconfigParams {
        h_scale: ctx.divider,
        v_scale: ctx.divider,
        roi: Roi::FULL_FRAME,
    };
    let status = engine.send_command(Command::Reconfigure(params));
    if !status.is_ok() {
        return Transition::Abort(DecodeError::ReconfigFailed(status.code()));
    }
    debug!(
        divider = ctx.divider,
        picture = %ctx.info.picture,
        display_buffer_size = ctx.info.display_buffer_size,
        "New video sequence"
    );
    Transition::Continue
}

// ---------------------------------------------------------------------------
// DecodePump
// ---------------------------------------------------------------------------

/// Input stream, chunk accounting and the held picture of one decoder.
#[derive(Debug)]
pub struct DecodePump {
    allocator: Arc<dyn DmaAllocator>,
    stream: InputStream,
    chunker: Chunker,
    picture: Option<PictureBuffer>,
    picture_align: usize,
}

impl DecodePump {
    pub fn new(allocator: Arc<dyn DmaAllocator>, config: &DecoderConfig) -> Self {
        Self {
            stream: InputStream::new(allocator.clone(), config),
            allocator,
            chunker: Chunker::new(config.chunk_limit),
            picture: None,
            picture_align: config.picture_align,
        }
    }

    pub fn stream(&self) -> &InputStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut InputStream {
        &mut self.stream
    }

    pub fn outstanding_chunks(&self) -> usize {
        self.chunker.outstanding()
    }

    pub fn picture(&self) -> Option<&PictureBuffer> {
        self.picture.as_ref()
    }

    /// Free the held picture.
    pub fn release_picture(&mut self) {
        if let Some(picture) = self.picture.take() {
            debug!(device_addr = picture.device_addr(), "Picture buffer released");
        }
    }

    /// Account for a buffer handed back outside the frame loop.
    pub fn reclaim(&mut self, buffer: EngineBuffer) {
        match buffer {
            EngineBuffer::Stream(_) => self.chunker.release(1),
            EngineBuffer::Picture(desc) => {
                if self.picture.as_ref().map(PictureBuffer::device_addr) == Some(desc.device_addr)
                {
                    self.release_picture();
                }
            }
        }
    }

    /// Decode the prepared input into the held picture.
    ///
    /// On success a completed picture is held until [`release_picture`].
    /// On failure no picture is held and every chunk has been reclaimed.
    ///
    /// [`release_picture`]: Self::release_picture
    pub fn run<E: DecodeEngine>(&mut self, engine: &mut E, divider: u32) -> Result<(), DecodeError> {
        if !self.stream.end_of_unit() {
            return Err(DecodeError::NoInput);
        }
        self.release_picture();
        self.stream.rewind();

        let mut ctx = FrameContext::new(divider);
        loop {
            let status = engine.decode_step(&mut ctx.info);
            let transition = match handler_for::<E>(status) {
                Some(handler) => handler(self, engine, &mut ctx),
                None => Transition::Abort(DecodeError::UnexpectedStatus(status.code())),
            };

            match transition {
                Transition::Continue => {}
                Transition::Complete => {
                    self.check_drained();
                    return Ok(());
                }
                Transition::Finished => {
                    self.recall_picture(engine);
                    self.check_drained();
                    debug!(pushed = ctx.pushed, "Stream ended without a picture");
                    return Err(DecodeError::NoPicture);
                }
                Transition::Abort(err) => {
                    error!(%status, error = %err, "Frame aborted");
                    self.recall_picture(engine);
                    self.reclaim_chunks(engine);
                    self.check_drained();
                    return Err(err);
                }
            }
        }
    }

    /// Pop every outstanding chunk back from the engine.
    fn reclaim_chunks<E: DecodeEngine>(&mut self, engine: &mut E) -> usize {
        let mut count = 0;
        while self.chunker.outstanding() > 0 {
            match engine.pop_buffer(BufferKind::Stream) {
                Some(EngineBuffer::Stream(_)) => {
                    self.chunker.release(1);
                    count += 1;
                }
                Some(other) => warn!(kind = ?other.kind(), "Unexpected buffer kind returned"),
                None => break,
            }
        }
        if count > 0 {
            debug!(count, "Chunks reclaimed");
        }
        count
    }

    /// Take the held picture back from the engine and free it.
    fn recall_picture<E: DecodeEngine>(&mut self, engine: &mut E) {
        if self.picture.is_none() {
            return;
        }
        while let Some(buffer) = engine.pop_buffer(BufferKind::Picture) {
            self.reclaim(buffer);
        }
        self.release_picture();
    }

    fn check_drained(&self) {
        if self.chunker.outstanding() > 0 {
            warn!(
                outstanding = self.chunker.outstanding(),
                "Engine kept chunks past the end of the frame"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::vmeta::chunker::BitstreamChunk;
    use crate::vmeta::memory::HeapDma;

    const PIC: Resolution = Resolution {
        width: 32,
        height: 16,
    };

    /// Engine that replays a fixed status script.
    #[derive(Default)]
    struct Scripted {
        script: VecDeque<EngineStatus>,
        streams: VecDeque<BitstreamChunk>,
        pictures: Vec<PictureDescriptor>,
        commands: Vec<Command>,
        stream_pushes: usize,
        picture_pushes: usize,
        reject_push: Option<BufferKind>,
        reject_reconfig: bool,
        foreign_picture: bool,
    }

    impl Scripted {
        fn new(script: &[EngineStatus]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl DecodeEngine for Scripted {
        fn decode_step(&mut self, info: &mut DecodeInfo) -> EngineStatus {
            let status = self.script.pop_front().unwrap_or(EngineStatus::Other(-99));
            if status == EngineStatus::NewVideoSeq {
                info.picture = PIC;
                info.display_buffer_size = PIC.packed_422_byte_size();
            }
            status
        }

        fn push_buffer(&mut self, buffer: EngineBuffer) -> EngineStatus {
            if self.reject_push == Some(buffer.kind()) {
                return EngineStatus::Other(-5);
            }
            match buffer {
                EngineBuffer::Stream(chunk) => {
                    self.stream_pushes += 1;
                    self.streams.push_back(chunk);
                }
                EngineBuffer::Picture(desc) => {
                    self.picture_pushes += 1;
                    self.pictures.push(desc);
                }
            }
            EngineStatus::NoError
        }

        fn pop_buffer(&mut self, kind: BufferKind) -> Option<EngineBuffer> {
            match kind {
                BufferKind::Stream => self.streams.pop_front().map(EngineBuffer::Stream),
                BufferKind::Picture => self.pictures.pop().map(|mut desc| {
                    if self.foreign_picture {
                        desc.device_addr += 0x1000;
                    }
                    desc.data_len = PIC.packed_422_byte_size();
                    desc.resolution = PIC;
                    EngineBuffer::Picture(desc)
                }),
            }
        }

        fn send_command(&mut self, command: Command) -> EngineStatus {
            self.commands.push(command);
            match command {
                Command::Reconfigure(_) if self.reject_reconfig => EngineStatus::Other(-7),
                _ => EngineStatus::NoError,
            }
        }

        fn close(&mut self) {}
    }

    fn pump() -> (Arc<HeapDma>, DecodePump) {
        let heap = HeapDma::shared();
        let mut pump = DecodePump::new(heap.clone(), &DecoderConfig::default());
        pump.stream_mut().load(&[0xff, 0xd8, 0xff, 0xd9]).unwrap();
        (heap, pump)
    }

    use crate::vmeta::engine::EngineStatus::*;

    #[test]
    fn table_covers_every_protocol_status() {
        for status in [
            NeedInput,
            ReturnInputBuf,
            NeedOutputBuf,
            FrameComplete,
            EndOfStream,
            WaitForEvent,
            NewVideoSeq,
        ] {
            assert!(handler_for::<Scripted>(status).is_some(), "{status}");
        }
        assert!(handler_for::<Scripted>(NoError).is_none());
        assert!(handler_for::<Scripted>(Other(3)).is_none());
    }

    #[test]
    fn need_input_pushes_once_then_signals_end_of_stream() {
        let (_heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput, NeedInput, NeedInput, EndOfStream]);

        let err = pump.run(&mut engine, 1).unwrap_err();
        assert!(matches!(err, DecodeError::NoPicture));
        assert_eq!(engine.stream_pushes, 1);
        assert_eq!(
            engine.commands,
            vec![Command::EndOfStream, Command::EndOfStream]
        );
        assert_eq!(pump.outstanding_chunks(), 0);
    }

    #[test]
    fn return_input_reclaims_outstanding_chunks() {
        let (_heap, mut pump) = pump();
        let mut ctx = FrameContext::new(1);
        let mut engine = Scripted::default();

        on_need_input(&mut pump, &mut engine, &mut ctx);
        assert_eq!(pump.outstanding_chunks(), 1);
        on_return_input(&mut pump, &mut engine, &mut ctx);
        assert_eq!(pump.outstanding_chunks(), 0);
        assert!(engine.streams.is_empty());
    }

    #[test]
    fn need_output_allocates_once() {
        let (heap, mut pump) = pump();
        let mut ctx = FrameContext::new(1);
        ctx.info.display_buffer_size = 4096;
        let mut engine = Scripted::default();

        assert!(matches!(
            on_need_output(&mut pump, &mut engine, &mut ctx),
            Transition::Continue
        ));
        assert!(matches!(
            on_need_output(&mut pump, &mut engine, &mut ctx),
            Transition::Continue
        ));
        assert_eq!(engine.picture_pushes, 1);
        assert_eq!(pump.picture().map(PictureBuffer::capacity), Some(4096));
        // stream + picture
        assert_eq!(heap.live_blocks(), 2);
    }

    #[test]
    fn need_output_allocation_failure_aborts() {
        let (heap, mut pump) = pump();
        heap.set_budget(Some(heap.live_bytes()));
        let mut ctx = FrameContext::new(1);
        ctx.info.display_buffer_size = 4096;
        let mut engine = Scripted::default();

        match on_need_output(&mut pump, &mut engine, &mut ctx) {
            Transition::Abort(DecodeError::AllocFailed { size, .. }) => assert_eq!(size, 4096),
            other => panic!("unexpected {other:?}"),
        }
        assert!(pump.picture().is_none());
        assert_eq!(engine.picture_pushes, 0);
    }

    #[test]
    fn rejected_picture_push_frees_the_allocation() {
        let (heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NewVideoSeq, NeedOutputBuf]);
        engine.reject_push = Some(BufferKind::Picture);

        let err = pump.run(&mut engine, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::PushRejected {
                kind: BufferKind::Picture,
                status: -5
            }
        ));
        assert!(pump.picture().is_none());
        assert_eq!(heap.live_blocks(), 1);
    }

    #[test]
    fn rejected_stream_push_releases_the_chunk() {
        let (_heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput]);
        engine.reject_push = Some(BufferKind::Stream);

        assert!(matches!(
            pump.run(&mut engine, 1),
            Err(DecodeError::PushRejected {
                kind: BufferKind::Stream,
                ..
            })
        ));
        assert_eq!(pump.outstanding_chunks(), 0);
    }

    #[test]
    fn frame_complete_copies_geometry_and_keeps_memory() {
        let (heap, mut pump) = pump();
        let mut engine = Scripted::new(&[
            NeedInput,
            NewVideoSeq,
            NeedOutputBuf,
            WaitForEvent,
            ReturnInputBuf,
            FrameComplete,
        ]);

        pump.run(&mut engine, 1).unwrap();
        let picture = pump.picture().unwrap();
        assert_eq!(picture.resolution(), PIC);
        assert_eq!(picture.data().len(), PIC.packed_422_byte_size());
        assert_eq!(pump.outstanding_chunks(), 0);
        assert_eq!(heap.live_blocks(), 2);

        pump.release_picture();
        assert_eq!(heap.live_blocks(), 1);
    }

    #[test]
    fn frame_complete_reclaims_chunks_the_engine_still_holds() {
        let (_heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput, NewVideoSeq, NeedOutputBuf, FrameComplete]);

        pump.run(&mut engine, 1).unwrap();
        assert_eq!(pump.outstanding_chunks(), 0);
        assert!(engine.streams.is_empty());
    }

    #[test]
    fn completed_picture_must_be_the_one_pushed() {
        let (heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput, NewVideoSeq, NeedOutputBuf, FrameComplete]);
        engine.foreign_picture = true;

        let err = pump.run(&mut engine, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedStatus(code) if code == FrameComplete.code()
        ));
        assert!(pump.picture().is_none());
        assert_eq!(pump.outstanding_chunks(), 0);
        assert_eq!(heap.live_blocks(), 1);
    }

    #[test]
    fn prepared_input_decodes_again_without_reloading() {
        let (_heap, mut pump) = pump();
        let frame = [NeedInput, NewVideoSeq, NeedOutputBuf, FrameComplete];
        let mut engine = Scripted::new(&[&frame[..], &frame[..]].concat());

        pump.run(&mut engine, 1).unwrap();
        pump.release_picture();
        pump.run(&mut engine, 2).unwrap();
        assert_eq!(engine.stream_pushes, 2);
        assert!(!engine.commands.contains(&Command::EndOfStream));
        assert_eq!(pump.picture().map(PictureBuffer::resolution), Some(PIC));
    }

    #[test]
    fn second_sequence_discards_interim_picture() {
        let (heap, mut pump) = pump();
        let mut engine = Scripted::new(&[
            NeedInput,
            NewVideoSeq,
            NeedOutputBuf,
            NewVideoSeq,
            NeedOutputBuf,
            FrameComplete,
        ]);

        pump.run(&mut engine, 2).unwrap();
        assert_eq!(engine.picture_pushes, 2);
        assert_eq!(heap.total_allocs(), 3);
        assert_eq!(heap.live_blocks(), 2);

        let reconfigs: Vec<_> = engine
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Reconfigure(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(reconfigs.len(), 2);
        assert!(reconfigs
            .iter()
            .all(|p| p.h_scale == 2 && p.v_scale == 2 && p.roi.is_full_frame()));
    }

    #[test]
    fn reconfig_failure_aborts() {
        let (_heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput, NewVideoSeq]);
        engine.reject_reconfig = true;

        assert!(matches!(
            pump.run(&mut engine, 1),
            Err(DecodeError::ReconfigFailed(-7))
        ));
        assert_eq!(pump.outstanding_chunks(), 0);
    }

    #[test]
    fn unknown_status_aborts_and_frees_picture() {
        let (heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput, NewVideoSeq, NeedOutputBuf, Other(-42)]);

        assert!(matches!(
            pump.run(&mut engine, 1),
            Err(DecodeError::UnexpectedStatus(-42))
        ));
        assert!(pump.picture().is_none());
        assert!(engine.pictures.is_empty());
        assert_eq!(pump.outstanding_chunks(), 0);
        assert_eq!(heap.live_blocks(), 1);
    }

    #[test]
    fn end_of_stream_after_output_request_frees_picture() {
        let (heap, mut pump) = pump();
        let mut engine = Scripted::new(&[NeedInput, NewVideoSeq, NeedOutputBuf, EndOfStream]);

        assert!(matches!(
            pump.run(&mut engine, 1),
            Err(DecodeError::NoPicture)
        ));
        assert!(pump.picture().is_none());
        assert_eq!(heap.live_blocks(), 1);
    }

    #[test]
    fn run_without_prepared_input_fails() {
        let mut pump = DecodePump::new(HeapDma::shared(), &DecoderConfig::default());
        let mut engine = Scripted::new(&[NeedInput]);
        assert!(matches!(
            pump.run(&mut engine, 1),
            Err(DecodeError::NoInput)
        ));
        assert_eq!(engine.script.len(), 1);
    }
}
