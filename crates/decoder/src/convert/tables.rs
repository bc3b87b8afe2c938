//! Process-wide YCbCr → RGB lookup tables.
//!
//! Two families of tables are built once, on first use, and shared read-only:
//!
//! - **Clip tables** map a biased intermediate sum to an 8-bit channel value
//!   already shifted into its byte lane. Indices below [`CLIP_RANGE`] saturate
//!   to 0, indices past `CLIP_RANGE + 255` saturate to 255.
//! - **YCbCr tables** (one set per [`ColorMatrix`]) hold the luma term, biased
//!   by `CLIP_RANGE`, and the chroma terms in 16.16 fixed point.
//!
//! The chroma tables pack two results per entry. For Cr the high half holds
//! the R contribution and the low half the G contribution; for Cb the high
//! half holds B and the low half G. The converter sums the two sign-extended
//! low halves to get the full G term with a single add, then shifts the high
//! halves down.

use jhw_common::ColorMatrix;
use once_cell::sync::Lazy;

/// Guard band on either side of the 0..=255 range of the clip tables.
/// The worst case is BT.709 (about 320), rounded up.
pub const CLIP_RANGE: usize = 384;

/// Length of each clip table.
pub const CLIP_LEN: usize = CLIP_RANGE + 256 + CLIP_RANGE;

/// Alpha byte pre-ORed into [`ClipTables::byte1_alpha`].
const OPAQUE: u32 = 0xff00_0000;

// [luma, Cr→R, Cb→B, Cb→G, Cr→G]
const COEFFICIENTS: [[f64; 5]; 3] = [
    [1.000, 1.402, 1.772, -0.34414, -0.71414], // BT.601 full range (JFIF)
    [1.164, 1.596, 2.018, -0.391, -0.813],     // BT.601 limited range
    [1.164, 1.793, 2.115, -0.213, -0.534],     // BT.709
];

static TABLES: Lazy<ColorTables> = Lazy::new(ColorTables::build);

/// Byte-lane clip tables.
pub struct ClipTables {
    /// Value in byte 0.
    pub byte0: [u32; CLIP_LEN],
    /// Value in byte 1.
    pub byte1: [u32; CLIP_LEN],
    /// Value in byte 1 with byte 3 forced to 0xFF (BGRA alpha).
    pub byte1_alpha: [u32; CLIP_LEN],
    /// Value in byte 2.
    pub byte2: [u32; CLIP_LEN],
}

/// Per-matrix luma and packed chroma tables.
pub struct YcbcrTable {
    /// Luma term plus `CLIP_RANGE`.
    pub luma: [i32; 256],
    /// `R << 16 | G & 0xffff` contribution of Cr.
    pub cr: [i32; 256],
    /// `B << 16 | G & 0xffff` contribution of Cb.
    pub cb: [i32; 256],
}

/// All colour conversion tables.
pub struct ColorTables {
    clip: ClipTables,
    ycbcr: [YcbcrTable; 3],
}

impl ColorTables {
    /// The shared tables, built on first access.
    pub fn get() -> &'static ColorTables {
        &TABLES
    }

    pub fn clip(&self) -> &ClipTables {
        &self.clip
    }

    pub fn ycbcr(&self, matrix: ColorMatrix) -> &YcbcrTable {
        &self.ycbcr[matrix.index()]
    }

    fn build() -> Self {
        Self {
            clip: ClipTables::build(),
            ycbcr: ColorMatrix::ALL.map(YcbcrTable::build),
        }
    }
}

impl ClipTables {
    fn build() -> Self {
        let mut tables = Self {
            byte0: [0; CLIP_LEN],
            byte1: [0; CLIP_LEN],
            byte1_alpha: [0; CLIP_LEN],
            byte2: [0; CLIP_LEN],
        };
        for i in 0..CLIP_LEN {
            let c = i.saturating_sub(CLIP_RANGE).min(255) as u32;
            tables.byte0[i] = c;
            tables.byte1[i] = c << 8;
            tables.byte1_alpha[i] = (c << 8) | OPAQUE;
            tables.byte2[i] = c << 16;
        }
        tables
    }
}

/// 16.16 fixed-point coefficient, truncated like the hardware reference.
fn fixed(c: f64) -> i32 {
    (65536.0 * c) as i32
}

/// High half: rounded product in bits 16..32. Low half: rounded product as i16.
fn pack(hi_coeff: i32, lo_coeff: i32, x: i32) -> i32 {
    let hi = (hi_coeff * x + 32768) & !0xffff;
    let lo = ((lo_coeff * x + 32768) >> 16) & 0xffff;
    hi | lo
}

impl YcbcrTable {
    fn build(matrix: ColorMatrix) -> Self {
        let [cy, crv, cbu, cgu, cgv] = COEFFICIENTS[matrix.index()].map(fixed);
        let bias = CLIP_RANGE as i32;

        let mut table = Self {
            luma: [0; 256],
            cr: [0; 256],
            cb: [0; 256],
        };
        for i in 0..256i32 {
            let idx = i as usize;
            table.luma[idx] = if matrix.is_limited_range() {
                ((cy * (i - 16) + 32768) >> 16) + bias
            } else {
                i + bias
            };
            table.cr[idx] = pack(crv, cgv, i - 128);
            table.cb[idx] = pack(cbu, cgu, i - 128);
        }
        table
    }
}
