//! Pixel formats and YCbCr colour matrices.

use serde::{Deserialize, Serialize};

/// Pixel layout of a surface in memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 3 bytes per pixel, R G B in memory order.
    Rgb24,
    /// 4 bytes per pixel, B G R A in memory order (A8R8G8B8 little-endian).
    Bgra32,
    /// Interleaved YCbCr 4:2:2, one 32-bit macropixel per two pixels
    /// (Cb Y0 Cr Y1). This is what the hardware engine writes.
    Ycbcr422Interleaved,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgb24 => 3,
            Self::Bgra32 => 4,
            Self::Ycbcr422Interleaved => 2,
        }
    }

    /// Whether the converter can produce this format.
    pub fn is_convert_target(self) -> bool {
        matches!(self, Self::Rgb24 | Self::Bgra32)
    }
}

/// YCbCr → RGB matrix preset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMatrix {
    /// BT.601 full range as used by JFIF (Y and chroma span 0..=255).
    #[default]
    Jpeg,
    /// ITU-R BT.601, limited range (Y 16..=235).
    Bt601,
    /// ITU-R BT.709, limited range (Y 16..=235).
    Bt709,
}

impl ColorMatrix {
    pub const ALL: [Self; 3] = [Self::Jpeg, Self::Bt601, Self::Bt709];

    /// The BT.601 coefficients without the limited-range luma expansion.
    pub const BT601_FULL_RANGE: Self = Self::Jpeg;

    /// Row index into the coefficient table set.
    pub fn index(self) -> usize {
        match self {
            Self::Jpeg => 0,
            Self::Bt601 => 1,
            Self::Bt709 => 2,
        }
    }

    /// Whether luma is expanded from the 16..=235 range.
    pub fn is_limited_range(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}
