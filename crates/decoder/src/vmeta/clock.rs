//! Decode unit clock control.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use jhw_common::{ClockConfig, ClockRate};

#[derive(Error, Debug)]
pub enum ClockError {
    #[error("Unable to write clock setting to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Something that can set the decode unit clock.
pub trait ClockControl: Send + fmt::Debug {
    fn set_rate(&mut self, rate: ClockRate) -> Result<(), ClockError>;
}

/// Writes the frequency in Hz to a sysfs node.
#[derive(Debug, Clone)]
pub struct SysfsClock {
    path: PathBuf,
}

impl SysfsClock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &ClockConfig) -> Self {
        Self::new(&config.sysfs_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClockControl for SysfsClock {
    fn set_rate(&mut self, rate: ClockRate) -> Result<(), ClockError> {
        fs::write(&self.path, rate.hz().to_string()).map_err(|source| ClockError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(hz = rate.hz(), path = %self.path.display(), "Clock set");
        Ok(())
    }
}
