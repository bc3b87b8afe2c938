//! Splits the input stream into bounded bitstream chunks.

use tracing::{debug, warn};

use super::stream::InputStream;

/// One transfer unit handed to the engine: a window into the input stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitstreamChunk {
    /// Offset of the window in the input stream.
    pub offset: usize,
    /// Device address of the first byte of the window.
    pub device_addr: u64,
    /// Valid compressed bytes in the window.
    pub data_len: usize,
    /// Size of the window, padding included.
    pub buf_len: usize,
    /// Set on the chunk holding the last valid byte.
    pub end_of_unit: bool,
}

/// Hands out chunks in source order and counts those the engine holds.
#[derive(Debug)]
pub struct Chunker {
    limit: usize,
    outstanding: usize,
}

impl Chunker {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            outstanding: 0,
        }
    }

    /// Chunks handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Cut the next window from `stream` and advance its read offset.
    ///
    /// Returns `None` once the window holding the end of the unit has been
    /// handed out, or the whole buffer has.
    pub fn next_chunk(&mut self, stream: &mut InputStream) -> Option<BitstreamChunk> {
        let offset = stream.read_offset();
        // Everything after the window holding the last valid byte is padding.
        if !stream.has_unread() || (offset > 0 && offset >= stream.data_len()) {
            return None;
        }
        let base = stream.device_addr()?;
        let buf_len = (stream.capacity() - offset).min(self.limit);
        let remaining = stream.data_len().saturating_sub(offset);
        let data_len = remaining.min(self.limit);

        stream.advance(buf_len);
        self.outstanding += 1;

        let chunk = BitstreamChunk {
            offset,
            device_addr: base + offset as u64,
            data_len,
            buf_len,
            end_of_unit: data_len == remaining,
        };
        debug!(
            offset,
            data_len,
            buf_len,
            end_of_unit = chunk.end_of_unit,
            "Chunk out"
        );
        Some(chunk)
    }

    /// Account for `n` chunks coming back from the engine.
    pub fn release(&mut self, n: usize) {
        if n > self.outstanding {
            warn!(
                released = n,
                outstanding = self.outstanding,
                "More chunks returned than handed out"
            );
        }
        self.outstanding = self.outstanding.saturating_sub(n);
    }
}
