//! RAII wrapper around one open decode engine.
//!
//! A [`VmetaSession`] is exclusively owned by one decoder. Shutting it down
//! follows the fixed teardown order the engine requires:
//!
//! 1. `StopDecodeStream`, so the engine gives up every buffer.
//! 2. Pop all picture buffers.
//! 3. Pop all stream buffers.
//! 4. Close the engine.
//!
//! Dropping a session that was never shut down runs the same sequence.

use tracing::{debug, info, warn};

use jhw_common::{BufferKind, DecodeError};

use super::engine::{Command, DecodeEngine, EngineBuffer, EngineDriver, SessionParams};

/// Buffers popped during shutdown.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub pictures: usize,
    pub streams: usize,
}

/// Owned engine instance; invalid once shut down.
pub struct VmetaSession<E: DecodeEngine> {
    engine: Option<E>,
}

impl<E: DecodeEngine> std::fmt::Debug for VmetaSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmetaSession")
            .field("open", &self.is_open())
            .finish()
    }
}

impl<E: DecodeEngine> VmetaSession<E> {
    /// Open an engine through `driver`.
    ///
    /// # Errors
    /// `DecodeError::HwDecoderInit` with the status the driver returned.
    pub fn open<D>(driver: &D, params: &SessionParams) -> Result<Self, DecodeError>
    where
        D: EngineDriver<Engine = E>,
    {
        let engine = driver
            .open(params)
            .map_err(|status| DecodeError::HwDecoderInit {
                reason: format!("engine open failed with {status}"),
            })?;
        info!(
            output_format = ?params.output_format,
            multi_instance = params.multi_instance,
            "Decode session opened"
        );
        Ok(Self {
            engine: Some(engine),
        })
    }

    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine_mut(&mut self) -> Result<&mut E, DecodeError> {
        self.engine.as_mut().ok_or(DecodeError::InvalidSession)
    }

    /// Stop the engine, hand every buffer it still holds to `reclaim`, then
    /// close it. A no-op on a session that is already shut down.
    pub fn shutdown(&mut self, mut reclaim: impl FnMut(EngineBuffer)) -> DrainStats {
        let Some(mut engine) = self.engine.take() else {
            return DrainStats::default();
        };

        let status = engine.send_command(Command::StopDecodeStream);
        if !status.is_ok() {
            warn!(%status, "Stop command failed, draining anyway");
        }

        let mut stats = DrainStats::default();
        while let Some(buffer) = engine.pop_buffer(BufferKind::Picture) {
            stats.pictures += 1;
            reclaim(buffer);
        }
        while let Some(buffer) = engine.pop_buffer(BufferKind::Stream) {
            stats.streams += 1;
            reclaim(buffer);
        }
        engine.close();

        info!(
            pictures = stats.pictures,
            streams = stats.streams,
            "Decode session closed"
        );
        stats
    }
}

impl<E: DecodeEngine> Drop for VmetaSession<E> {
    fn drop(&mut self) {
        if self.is_open() {
            debug!("Session dropped while open, shutting down");
            self.shutdown(|_| {});
        }
    }
}
