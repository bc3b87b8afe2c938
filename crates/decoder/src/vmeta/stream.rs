//! Growable DMA input buffer holding one compressed picture.
//!
//! The buffer lives across frames: it only grows, its capacity is always a
//! multiple of the allocation granularity, and prior contents survive a
//! reallocation. After the caller has copied the bitstream in,
//! [`InputStream::prepare`] marks the end of the unit and pads it with the
//! sentinel byte the engine expects.

use std::sync::Arc;

use tracing::{debug, warn};

use jhw_common::{DecodeError, DecoderConfig};

use super::memory::{CachePolicy, DmaAllocator, DmaBlock};

/// Filler written after the valid data.
pub const PADDING_BYTE: u8 = 0x88;

/// Compressed input buffer shared with the engine.
#[derive(Debug)]
pub struct InputStream {
    allocator: Arc<dyn DmaAllocator>,
    block: Option<DmaBlock>,
    data_len: usize,
    read_offset: usize,
    end_of_unit: bool,
    granularity: usize,
    padding: usize,
    align: usize,
}

impl InputStream {
    pub fn new(allocator: Arc<dyn DmaAllocator>, config: &DecoderConfig) -> Self {
        Self {
            allocator,
            block: None,
            data_len: 0,
            read_offset: 0,
            end_of_unit: false,
            granularity: config.stream_alloc_granularity,
            padding: config.stream_padding,
            align: config.stream_align,
        }
    }

    /// Current capacity in bytes (0 without a buffer).
    pub fn capacity(&self) -> usize {
        self.block.as_ref().map_or(0, DmaBlock::size)
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    pub fn read_offset(&self) -> usize {
        self.read_offset
    }

    pub fn end_of_unit(&self) -> bool {
        self.end_of_unit
    }

    pub fn device_addr(&self) -> Option<u64> {
        self.block.as_ref().map(DmaBlock::device_addr)
    }

    /// Whether part of the buffer has not been handed out as a chunk yet.
    pub fn has_unread(&self) -> bool {
        self.read_offset < self.capacity()
    }

    /// Hand the prepared unit out again from its first byte.
    ///
    /// The valid length, end-of-unit mark and padding are kept, so the same
    /// bytes can be decoded again at another scale or after a failed frame.
    pub(crate) fn rewind(&mut self) {
        self.read_offset = 0;
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.read_offset = (self.read_offset + n).min(self.capacity());
    }

    pub fn as_slice(&self) -> &[u8] {
        match self.block.as_ref() {
            Some(block) => block.as_slice(),
            None => &[],
        }
    }

    /// Host view of the whole buffer, for the caller to copy bytes into.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.block.as_mut() {
            Some(block) => block.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Make room for `requested` bytes plus padding.
    ///
    /// A buffer that is already large enough is kept as is. Otherwise a new
    /// one is allocated, the old contents copied over and the old one
    /// released. On allocation failure the stream is left without a buffer.
    pub fn ensure_capacity(&mut self, requested: usize) -> Result<usize, DecodeError> {
        let mask = self.granularity - 1;
        let size = requested
            .checked_add(self.padding + mask)
            .map(|s| s & !mask)
            .ok_or(DecodeError::AllocFailed {
                size: usize::MAX,
                align: self.align,
            })?;

        if size <= self.capacity() {
            return Ok(self.capacity());
        }

        let old = self.block.take();
        let mut block =
            match DmaBlock::alloc(&self.allocator, size, self.align, CachePolicy::Cached) {
                Ok(block) => block,
                Err(err) => {
                    self.reset_state();
                    return Err(err.into());
                }
            };
        if let Some(old) = old {
            block.as_mut_slice()[..old.size()].copy_from_slice(old.as_slice());
        }
        debug!(
            requested,
            capacity = size,
            device_addr = block.device_addr(),
            "Input stream reallocated"
        );
        self.block = Some(block);
        Ok(size)
    }

    /// Declare `data_len` valid bytes and pad the end of the unit.
    ///
    /// Returns the (possibly clamped) data length.
    pub fn prepare(&mut self, data_len: usize) -> Result<usize, DecodeError> {
        let capacity = self.capacity();
        if capacity == 0 {
            return Err(DecodeError::NoInput);
        }

        let mut len = data_len;
        if len > capacity {
            warn!(data_len, capacity, "Stream data exceeds buffer, clamping");
            len = capacity;
        }
        self.data_len = len;
        self.read_offset = 0;
        self.end_of_unit = true;

        let pad_end = ((len + 255) & !127).min(capacity);
        if pad_end > len {
            self.as_mut_slice()[len..pad_end].fill(PADDING_BYTE);
        }
        Ok(len)
    }

    /// Copy `data` in and prepare it as one unit.
    pub fn load(&mut self, data: &[u8]) -> Result<usize, DecodeError> {
        self.ensure_capacity(data.len())?;
        self.as_mut_slice()[..data.len()].copy_from_slice(data);
        self.prepare(data.len())
    }

    /// Release the buffer.
    pub fn free(&mut self) {
        if self.block.is_some() {
            debug!(capacity = self.capacity(), "Input stream freed");
        }
        self.block = None;
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.data_len = 0;
        self.read_offset = 0;
        self.end_of_unit = false;
    }
}
