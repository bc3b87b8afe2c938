//! Decoder configuration.

use serde::{Deserialize, Serialize};

use crate::color::ColorMatrix;
use crate::error::DecodeError;

/// Default sysfs node controlling the vMeta clock on Dove platforms.
pub const DEFAULT_CLOCK_SYSFS: &str = "/sys/devices/platform/dove_clocks_sysfs.0/vmeta";

/// Hardware clock rate for the decode unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockRate {
    /// 500 MHz, the power-on default.
    #[default]
    Mhz500,
    /// 667 MHz.
    Mhz667,
}

impl ClockRate {
    pub fn hz(self) -> u32 {
        match self {
            Self::Mhz500 => 500_000_000,
            Self::Mhz667 => 667_000_000,
        }
    }
}

/// Where and how to set the hardware clock while a session is open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    pub rate: ClockRate,
    pub sysfs_path: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            rate: ClockRate::Mhz500,
            sysfs_path: DEFAULT_CLOCK_SYSFS.to_string(),
        }
    }
}

/// Hardware JPEG decoder configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Input stream capacity is rounded up to a multiple of this (power of two).
    pub stream_alloc_granularity: usize,
    /// Bytes reserved past the requested stream size for end-of-unit padding.
    pub stream_padding: usize,
    /// Upper bound on a single bitstream chunk handed to the engine.
    pub chunk_limit: usize,
    /// DMA alignment of the input stream buffer.
    pub stream_align: usize,
    /// DMA alignment of the decoded picture buffer.
    pub picture_align: usize,
    /// Pictures with fewer pixels than this are not worth the hardware setup.
    pub min_accel_pixels: u64,
    /// Matrix used when converting decoded pictures to RGB.
    pub color_matrix: ColorMatrix,
    /// Optional clock override applied for the lifetime of the session.
    pub clock: Option<ClockConfig>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            stream_alloc_granularity: 64 * 1024,
            stream_padding: 256,
            chunk_limit: 1024 * 1024,
            stream_align: 8,
            picture_align: 32,
            min_accel_pixels: 100 * 100,
            color_matrix: ColorMatrix::Jpeg,
            clock: None,
        }
    }
}

impl DecoderConfig {
    /// Check the invariants the stream and chunk arithmetic relies on.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if !self.stream_alloc_granularity.is_power_of_two() {
            return Err(DecodeError::InvalidConfig(format!(
                "stream_alloc_granularity must be a power of two, got {}",
                self.stream_alloc_granularity
            )));
        }
        if self.chunk_limit == 0 {
            return Err(DecodeError::InvalidConfig(
                "chunk_limit must be > 0".to_string(),
            ));
        }
        for (name, align) in [
            ("stream_align", self.stream_align),
            ("picture_align", self.picture_align),
        ] {
            if !align.is_power_of_two() {
                return Err(DecodeError::InvalidConfig(format!(
                    "{name} must be a power of two, got {align}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_accel_pixels, 10_000);
        assert!(config.clock.is_none());
    }

    #[test]
    fn rejects_bad_granularity() {
        let config = DecoderConfig {
            stream_alloc_granularity: 3000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DecodeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_chunk_limit_and_alignment() {
        let config = DecoderConfig {
            chunk_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DecoderConfig {
            picture_align: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn clock_rates() {
        assert_eq!(ClockRate::Mhz500.hz(), 500_000_000);
        assert_eq!(ClockRate::Mhz667.hz(), 667_000_000);
        assert_eq!(ClockConfig::default().sysfs_path, DEFAULT_CLOCK_SYSFS);
    }
}
