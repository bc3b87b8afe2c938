//! Packed YCbCr 4:2:2 → RGB24 / BGRA32 conversion.
//!
//! The decode engine writes one little-endian 32-bit macropixel per pair of
//! horizontally adjacent pixels:
//!
//! ```text
//! byte 0   byte 1   byte 2   byte 3
//!   Cb       Y0       Cr       Y1
//! ```
//!
//! Every macropixel costs two chroma lookups (shared by both pixels), two
//! luma lookups and three clip lookups per pixel. There is no floating point
//! and no branch-based clamping in the inner loop: see [`tables`] for how the
//! guard band removes the range checks.
//!
//! The engine decodes to an internal width that is at least the requested
//! width. Each output row reads the first `ceil(width / 2)` macropixels of
//! the matching source row and skips the remaining
//! `(picture_width - width) / 2` macropixels, so the crop keeps the left edge
//! of the decoded picture.

pub mod tables;

use jhw_common::{ColorMatrix, DecodeError, PixelFormat, Resolution};

use self::tables::{ClipTables, ColorTables, YcbcrTable};

/// Colour converter bound to one matrix preset.
#[derive(Clone, Copy)]
pub struct PixelConverter {
    tables: &'static ColorTables,
    matrix: ColorMatrix,
}

impl std::fmt::Debug for PixelConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelConverter")
            .field("matrix", &self.matrix)
            .finish()
    }
}

impl PixelConverter {
    pub fn new(matrix: ColorMatrix) -> Self {
        Self {
            tables: ColorTables::get(),
            matrix,
        }
    }

    pub fn matrix(&self) -> ColorMatrix {
        self.matrix
    }

    /// Convert `output` pixels of a packed picture into `dst`.
    ///
    /// # Arguments
    /// * `src` — packed macropixels, row pitch `ceil(picture.width / 2) * 4` bytes.
    /// * `picture` — geometry the engine decoded to.
    /// * `dst` — destination surface; row `r` starts at `r * stride`.
    /// * `stride` — destination row pitch in bytes.
    /// * `output` — size to convert; clamped to `picture`.
    /// * `format` — [`PixelFormat::Rgb24`] or [`PixelFormat::Bgra32`].
    ///
    /// Only `width * bytes_per_pixel` bytes of each destination row are
    /// written, so the last row needs no stride slack.
    ///
    /// # Errors
    /// Unsupported target format, a stride narrower than a row, or a source or
    /// destination slice too short for the requested geometry.
    pub fn convert(
        &self,
        src: &[u8],
        picture: Resolution,
        dst: &mut [u8],
        stride: usize,
        output: Resolution,
        format: PixelFormat,
    ) -> Result<(), DecodeError> {
        if !format.is_convert_target() {
            return Err(DecodeError::UnsupportedFormat(format));
        }

        let output = output.min(picture);
        let width = output.width as usize;
        let height = output.height as usize;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let src_pitch = (picture.width as usize).div_ceil(2) * 4;
        let src_row_bytes = width.div_ceil(2) * 4;
        let src_needed = (height - 1) * src_pitch + src_row_bytes;
        if src.len() < src_needed {
            return Err(DecodeError::PictureTooSmall {
                needed: src_needed,
                got: src.len(),
            });
        }

        let row_bytes = width * format.bytes_per_pixel() as usize;
        if stride < row_bytes {
            return Err(DecodeError::StrideTooSmall { stride, row_bytes });
        }
        let dst_needed = (height - 1) * stride + row_bytes;
        if dst.len() < dst_needed {
            return Err(DecodeError::DestinationTooSmall {
                needed: dst_needed,
                got: dst.len(),
            });
        }

        let rows = Rows {
            clip: self.tables.clip(),
            ycbcr: self.tables.ycbcr(self.matrix),
        };
        for row in 0..height {
            let s = &src[row * src_pitch..row * src_pitch + src_row_bytes];
            let d = &mut dst[row * stride..row * stride + row_bytes];
            match format {
                PixelFormat::Rgb24 => rows.rgb24(s, d),
                _ => rows.bgra32(s, d),
            }
        }
        Ok(())
    }
}

/// Table references for one conversion call.
struct Rows<'t> {
    clip: &'t ClipTables,
    ycbcr: &'t YcbcrTable,
}

#[inline(always)]
fn word(mp: &[u8]) -> u32 {
    u32::from_le_bytes([mp[0], mp[1], mp[2], mp[3]])
}

#[inline(always)]
fn lane(table: &[u32; tables::CLIP_LEN], index: i32) -> u32 {
    table[index as usize]
}

impl Rows<'_> {
    /// Chroma terms `(cr, cg, cb)` shared by both pixels of a macropixel.
    #[inline(always)]
    fn chroma(&self, v: u32) -> (i32, i32, i32) {
        let cr = self.ycbcr.cr[((v >> 16) & 0xff) as usize];
        let cb = self.ycbcr.cb[(v & 0xff) as usize];
        let cg = cr as i16 as i32 + cb as i16 as i32;
        (cr >> 16, cg, cb >> 16)
    }

    #[inline(always)]
    fn rgb(&self, y: u32, (cr, cg, cb): (i32, i32, i32)) -> u32 {
        let y = self.ycbcr.luma[(y & 0xff) as usize];
        lane(&self.clip.byte0, y + cr)
            | lane(&self.clip.byte1, y + cg)
            | lane(&self.clip.byte2, y + cb)
    }

    #[inline(always)]
    fn bgra(&self, y: u32, (cr, cg, cb): (i32, i32, i32)) -> u32 {
        let y = self.ycbcr.luma[(y & 0xff) as usize];
        lane(&self.clip.byte0, y + cb)
            | lane(&self.clip.byte1_alpha, y + cg)
            | lane(&self.clip.byte2, y + cr)
    }

    fn rgb24(&self, src: &[u8], dst: &mut [u8]) {
        let mut out = dst.chunks_exact_mut(6);
        let mut mps = src.chunks_exact(4);
        for (q, mp) in (&mut out).zip(&mut mps) {
            let v = word(mp);
            let c = self.chroma(v);
            let u1 = self.rgb(v >> 8, c);
            let u2 = self.rgb(v >> 24, c);
            // 4-byte store: pixel 0 plus R of pixel 1; 2-byte store: G, B of pixel 1.
            q[..4].copy_from_slice(&(u1 | (u2 << 24)).to_le_bytes());
            q[4..].copy_from_slice(&((u2 >> 8) as u16).to_le_bytes());
        }

        // Odd width: lone Y0 of the last macropixel.
        let tail = out.into_remainder();
        if !tail.is_empty() {
            if let Some(mp) = mps.next() {
                let v = word(mp);
                let u1 = self.rgb(v >> 8, self.chroma(v));
                tail.copy_from_slice(&u1.to_le_bytes()[..3]);
            }
        }
    }

    fn bgra32(&self, src: &[u8], dst: &mut [u8]) {
        let mut out = dst.chunks_exact_mut(8);
        let mut mps = src.chunks_exact(4);
        for (q, mp) in (&mut out).zip(&mut mps) {
            let v = word(mp);
            let c = self.chroma(v);
            q[..4].copy_from_slice(&self.bgra(v >> 8, c).to_le_bytes());
            q[4..].copy_from_slice(&self.bgra(v >> 24, c).to_le_bytes());
        }

        let tail = out.into_remainder();
        if !tail.is_empty() {
            if let Some(mp) = mps.next() {
                let v = word(mp);
                tail.copy_from_slice(&self.bgra(v >> 8, self.chroma(v)).to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Packed picture where every macropixel is `[cb, y0, cr, y1]`.
    fn solid(picture: Resolution, mp: [u8; 4]) -> Vec<u8> {
        let count = (picture.width as usize).div_ceil(2) * picture.height as usize;
        mp.iter().copied().cycle().take(count * 4).collect()
    }

    fn convert(
        matrix: ColorMatrix,
        src: &[u8],
        picture: Resolution,
        output: Resolution,
        format: PixelFormat,
        stride: usize,
    ) -> Vec<u8> {
        let mut dst = vec![0xAAu8; stride * output.height as usize];
        PixelConverter::new(matrix)
            .convert(src, picture, &mut dst, stride, output, format)
            .unwrap();
        dst
    }

    #[test]
    fn bt601_full_range_gray_point_is_identity() {
        let res = Resolution::new(16, 4);
        let src = solid(res, [128, 128, 128, 128]);
        for format in [PixelFormat::Rgb24, PixelFormat::Bgra32] {
            let bpp = format.bytes_per_pixel() as usize;
            let dst = convert(ColorMatrix::BT601_FULL_RANGE, &src, res, res, format, 16 * bpp);
            let color_bytes = dst
                .chunks_exact(bpp)
                .flat_map(|px| &px[..3]);
            assert!(color_bytes.copied().all(|b| b == 128), "{format:?}");
        }
    }

    #[test]
    fn bt601_expands_limited_range() {
        let res = Resolution::new(4, 1);
        for (y, expected) in [(16u8, 0u8), (128, 130), (235, 255)] {
            let src = solid(res, [128, y, 128, y]);
            let dst = convert(ColorMatrix::Bt601, &src, res, res, PixelFormat::Rgb24, 12);
            assert!(
                dst.iter().all(|&b| b.abs_diff(expected) <= 1),
                "Y={y}: {dst:?}"
            );
        }
    }

    #[test]
    fn jpeg_red() {
        let res = Resolution::new(2, 1);
        let src = solid(res, [85, 76, 255, 76]);
        let dst = convert(ColorMatrix::Jpeg, &src, res, res, PixelFormat::Rgb24, 6);
        assert_eq!(dst, vec![254, 0, 0, 254, 0, 0]);

        let dst = convert(ColorMatrix::Jpeg, &src, res, res, PixelFormat::Bgra32, 8);
        assert_eq!(dst, vec![0, 0, 254, 255, 0, 0, 254, 255]);
    }

    #[test]
    fn two_lumas_share_chroma() {
        let res = Resolution::new(2, 1);
        let src = solid(res, [128, 10, 128, 200]);
        let dst = convert(ColorMatrix::Jpeg, &src, res, res, PixelFormat::Rgb24, 6);
        assert_eq!(dst, vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn bgra_alpha_is_opaque() {
        let res = Resolution::new(8, 2);
        let src = solid(res, [0, 0, 0, 0]);
        let dst = convert(ColorMatrix::Bt709, &src, res, res, PixelFormat::Bgra32, 32);
        for px in dst.chunks_exact(4) {
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn crop_skips_row_tail() {
        // 8 wide picture, each row gets its own luma value.
        let picture = Resolution::new(8, 3);
        let mut src = Vec::new();
        for row in 0..3u8 {
            for _ in 0..4 {
                src.extend_from_slice(&[128, 50 + row * 50, 128, 50 + row * 50]);
            }
        }
        let output = Resolution::new(4, 3);
        let dst = convert(ColorMatrix::Jpeg, &src, picture, output, PixelFormat::Rgb24, 12);
        for (row, line) in dst.chunks_exact(12).enumerate() {
            let expected = 50 + row as u8 * 50;
            assert!(line.iter().all(|&b| b == expected), "row {row}: {line:?}");
        }
    }

    #[test]
    fn rgb24_leaves_stride_slack_untouched() {
        let res = Resolution::new(6, 3);
        let src = solid(res, [128, 90, 128, 90]);
        let stride = 6 * 3 + 5;
        let dst = convert(ColorMatrix::Jpeg, &src, res, res, PixelFormat::Rgb24, stride);
        for line in dst.chunks_exact(stride) {
            assert!(line[..18].iter().all(|&b| b == 90));
            assert!(line[18..].iter().all(|&b| b == 0xAA));
        }
    }

    #[test]
    fn last_row_needs_no_slack() {
        let res = Resolution::new(4, 2);
        let src = solid(res, [128, 60, 128, 60]);
        let stride = 16;
        // Exactly one full stride plus one packed row.
        let mut dst = vec![0u8; stride + 12];
        PixelConverter::new(ColorMatrix::Jpeg)
            .convert(&src, res, &mut dst, stride, res, PixelFormat::Rgb24)
            .unwrap();
        assert!(dst[stride..].iter().all(|&b| b == 60));
    }

    #[test]
    fn odd_width_converts_last_pixel() {
        let picture = Resolution::new(4, 1);
        let src = solid(picture, [128, 40, 128, 80]);
        let output = Resolution::new(3, 1);

        let dst = convert(ColorMatrix::Jpeg, &src, picture, output, PixelFormat::Rgb24, 9);
        assert_eq!(dst, vec![40, 40, 40, 80, 80, 80, 40, 40, 40]);

        let dst = convert(ColorMatrix::Jpeg, &src, picture, output, PixelFormat::Bgra32, 12);
        assert_eq!(&dst[8..], &[40, 40, 40, 255]);
    }

    #[test]
    fn output_is_clamped_to_picture() {
        let picture = Resolution::new(2, 1);
        let src = solid(picture, [128, 30, 128, 30]);
        let mut dst = vec![0xAAu8; 64];
        PixelConverter::new(ColorMatrix::Jpeg)
            .convert(&src, picture, &mut dst, 32, Resolution::new(10, 10), PixelFormat::Rgb24)
            .unwrap();
        assert!(dst[..6].iter().all(|&b| b == 30));
        assert!(dst[6..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn rejects_bad_arguments() {
        let conv = PixelConverter::new(ColorMatrix::Jpeg);
        let res = Resolution::new(4, 2);
        let src = solid(res, [128; 4]);
        let mut dst = vec![0u8; 24];

        assert!(matches!(
            conv.convert(&src, res, &mut dst, 12, res, PixelFormat::Ycbcr422Interleaved),
            Err(DecodeError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            conv.convert(&src, res, &mut dst, 8, res, PixelFormat::Rgb24),
            Err(DecodeError::StrideTooSmall { .. })
        ));
        assert!(matches!(
            conv.convert(&src, res, &mut dst, 16, res, PixelFormat::Bgra32),
            Err(DecodeError::DestinationTooSmall { .. })
        ));
        assert!(matches!(
            conv.convert(&src[..8], res, &mut dst, 12, res, PixelFormat::Rgb24),
            Err(DecodeError::PictureTooSmall { .. })
        ));
    }

    #[test]
    fn empty_output_is_a_no_op() {
        let conv = PixelConverter::new(ColorMatrix::Jpeg);
        let mut dst: [u8; 0] = [];
        assert!(conv
            .convert(&[], Resolution::ZERO, &mut dst, 0, Resolution::ZERO, PixelFormat::Rgb24)
            .is_ok());
    }
}
