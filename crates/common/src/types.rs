//! Core value types with newtype-style wrappers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Picture resolution in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Component-wise minimum, used to clamp a requested size to a decoded one.
    pub fn min(self, other: Self) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }

    /// Byte size of a packed YCbCr 4:2:2 picture (two bytes per pixel).
    pub fn packed_422_byte_size(self) -> usize {
        self.width as usize * self.height as usize * 2
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output scale expressed as a rational `num / denom` (e.g. 1/2 = half size).
///
/// The hardware only understands an integer divider, which is
/// `denom / num` truncated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaleFactor {
    pub num: u32,
    pub denom: u32,
}

impl ScaleFactor {
    pub const FULL: Self = Self { num: 1, denom: 1 };

    pub fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }

    /// Integer divider handed to the engine, `None` if the scale is degenerate
    /// (zero numerator or a result of zero).
    pub fn divider(self) -> Option<u32> {
        if self.num == 0 {
            return None;
        }
        match self.denom / self.num {
            0 => None,
            d => Some(d),
        }
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_clamp() {
        let requested = Resolution::new(1920, 100);
        let decoded = Resolution::new(208, 200);
        assert_eq!(requested.min(decoded), Resolution::new(208, 100));
    }

    #[test]
    fn packed_size() {
        assert_eq!(Resolution::new(208, 200).packed_422_byte_size(), 208 * 200 * 2);
    }

    #[test]
    fn scale_divider() {
        assert_eq!(ScaleFactor::FULL.divider(), Some(1));
        assert_eq!(ScaleFactor::new(1, 4).divider(), Some(4));
        assert_eq!(ScaleFactor::new(3, 8).divider(), Some(2));
        assert_eq!(ScaleFactor::new(0, 1).divider(), None);
        assert_eq!(ScaleFactor::new(2, 1).divider(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Resolution::new(640, 480).to_string(), "640x480");
        assert_eq!(ScaleFactor::new(1, 2).to_string(), "1/2");
    }
}
