//! Loading-screen decoders.
//!
//! Each graphics mode turns a fixed-size block of packed bytes into a
//! [`PixelImage`]. The decoders are pure functions of the block bytes, the
//! shared [`Palette`] and the [`ScreenParams`] derived from the header.
//!
//! | Mode | Block size | Output | Pixel source |
//! |------|-----------:|--------|--------------|
//! | [`ScreenMode::Ula`]           |  6912 | 256×192 | 1bpp bitmap + 8×8 attributes |
//! | [`ScreenMode::Layer2`]        | 49152 | 256×192 | 8bpp palette index, row-major |
//! | [`ScreenMode::Layer2_320`]    | 81920 | 320×256 | 8bpp palette index, column-major |
//! | [`ScreenMode::Layer2_640`]    | 81920 | 640×256 | 4bpp palette index, column-major |
//! | [`ScreenMode::LoRes`]         | 12288 | 256×192 | 128×96 palette indices, 2×2 blocks |
//! | [`ScreenMode::TimexHiRes`]    | 12288 | 512×192 | two interleaved 1bpp bitmaps |
//! | [`ScreenMode::TimexHiColour`] | 12288 | 256×192 | 1bpp bitmap + 8×1 attributes |
//!
//! The `image` crate (behind the `cli` feature) turns a [`PixelImage`] into
//! a PNG; the library itself never encodes images.

mod layer2;
mod lores;
mod timex;
mod ula;

use std::fmt;

use crate::palette::Palette;
use crate::{Error, Result};

pub use ula::{ZX_COLOR_NAMES, zx_color};

/// Graphics modes a loading screen can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenMode {
    /// Classic Spectrum screen.
    Ula,
    /// Layer 2, 256×192, 8 bits per pixel.
    Layer2,
    /// Layer 2, 320×256, 8 bits per pixel.
    Layer2_320,
    /// Layer 2, 640×256, 4 bits per pixel.
    Layer2_640,
    /// LoRes, 128×96, 8 bits per pixel.
    LoRes,
    /// Timex 512×192 monochrome.
    TimexHiRes,
    /// Timex 256×192 with 8×1 attributes.
    TimexHiColour,
}

impl ScreenMode {
    /// Size in bytes of a stored screen block of this mode.
    pub const fn block_size(self) -> usize {
        match self {
            ScreenMode::Ula => 6912,
            ScreenMode::Layer2 => 49152,
            ScreenMode::Layer2_320 | ScreenMode::Layer2_640 => 81920,
            ScreenMode::LoRes | ScreenMode::TimexHiRes | ScreenMode::TimexHiColour => 12288,
        }
    }

    /// Width and height of the decoded image.
    pub const fn dimensions(self) -> (usize, usize) {
        match self {
            ScreenMode::Ula | ScreenMode::Layer2 | ScreenMode::TimexHiColour => (256, 192),
            ScreenMode::Layer2_320 => (320, 256),
            ScreenMode::Layer2_640 => (640, 256),
            ScreenMode::LoRes => (256, 192),
            ScreenMode::TimexHiRes => (512, 192),
        }
    }

    /// Human-readable mode name.
    pub const fn name(self) -> &'static str {
        match self {
            ScreenMode::Ula => "ULA",
            ScreenMode::Layer2 => "Layer2",
            ScreenMode::Layer2_320 => "Layer2 320x256x8",
            ScreenMode::Layer2_640 => "Layer2 640x256x4",
            ScreenMode::LoRes => "LoRes",
            ScreenMode::TimexHiRes => "Timex HiRes",
            ScreenMode::TimexHiColour => "Timex HiColour",
        }
    }
}

impl fmt::Display for ScreenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode-specific side values taken from the header's HIRESCOL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenParams {
    /// Layer 2 sub-palette selector, 0-15.
    pub palette_offset: u8,
    /// Timex HiRes ink colour, 0-7.
    pub hires_ink: u8,
}

impl ScreenParams {
    /// Derive the parameters from the header's HIRESCOL value.
    pub fn from_hires_color(value: u8) -> Self {
        Self {
            palette_offset: value & 0x0F,
            hires_ink: (value >> 2) & 0b111,
        }
    }
}

/// Decoded RGB image, 3 bytes per pixel, rows top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelImage {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Packed RGB triples, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl PixelImage {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 3],
        }
    }

    /// Set the pixel at (`x`, `y`). Coordinates outside the image are ignored.
    pub fn set(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.pixels[i..i + 3].copy_from_slice(&rgb);
        }
    }

    /// The pixel at (`x`, `y`); black outside the image.
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
        } else {
            [0; 3]
        }
    }
}

impl fmt::Debug for PixelImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Decode the screen block at `offset..offset + size` of `data`.
///
/// `size` must equal [`ScreenMode::block_size`]; a block running past the
/// end of `data` is reported as [`Error::ImageDecode`].
pub fn decode_screen(
    data: &[u8],
    offset: usize,
    size: usize,
    mode: ScreenMode,
    palette: &Palette,
    params: &ScreenParams,
) -> Result<PixelImage> {
    if size != mode.block_size() {
        return Err(Error::ImageDecode(format!(
            "{mode} screen must be {} bytes, got {size}",
            mode.block_size()
        )));
    }
    let block = offset
        .checked_add(size)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            Error::ImageDecode(format!(
                "{mode} screen at offset {offset} truncated: buffer holds {} bytes",
                data.len()
            ))
        })?;

    let image = match mode {
        ScreenMode::Ula => ula::decode(block),
        ScreenMode::Layer2 => layer2::decode_256(block, palette, params.palette_offset),
        ScreenMode::Layer2_320 => layer2::decode_320(block, palette, params.palette_offset),
        ScreenMode::Layer2_640 => layer2::decode_640(block, palette, params.palette_offset),
        ScreenMode::LoRes => lores::decode(block, palette),
        ScreenMode::TimexHiRes => timex::decode_hires(block, params.hires_ink),
        ScreenMode::TimexHiColour => timex::decode_hicolour(block),
    };
    Ok(image)
}

/// Offset of the bitmap byte holding pixel column `x / 8` of scanline `y` in
/// a Spectrum-layout 6144-byte bitmap.
///
/// ```text
/// address = y7 y6 y2 y1 y0 y5 y4 y3 x7 x6 x5 x4 x3
/// ```
pub(crate) fn bitmap_address(x: usize, y: usize) -> usize {
    ((y & 0xC0) << 5) | ((y & 0x07) << 8) | ((y & 0x38) << 2) | (x >> 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_rows_are_interleaved() {
        assert_eq!(bitmap_address(0, 0), 0);
        assert_eq!(bitmap_address(0, 1), 256);
        assert_eq!(bitmap_address(0, 8), 32);
        assert_eq!(bitmap_address(8, 8), 33);
        assert_eq!(bitmap_address(0, 64), 2048);
        assert_eq!(bitmap_address(255, 191), 6143);
    }

    #[test]
    fn params_split_hires_color() {
        let params = ScreenParams::from_hires_color(0b0001_1101);
        assert_eq!(params.palette_offset, 0b1101);
        assert_eq!(params.hires_ink, 0b111);
    }

    #[test]
    fn wrong_size_is_an_image_error() {
        let data = vec![0u8; 7000];
        let err = decode_screen(
            &data,
            0,
            6000,
            ScreenMode::Ula,
            &Palette::default(),
            &ScreenParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn truncated_block_is_an_image_error() {
        let data = vec![0u8; 7000];
        let err = decode_screen(
            &data,
            512,
            6912,
            ScreenMode::Ula,
            &Palette::default(),
            &ScreenParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn every_mode_produces_its_geometry() {
        let palette = Palette::default();
        let params = ScreenParams::default();
        for mode in [
            ScreenMode::Ula,
            ScreenMode::Layer2,
            ScreenMode::Layer2_320,
            ScreenMode::Layer2_640,
            ScreenMode::LoRes,
            ScreenMode::TimexHiRes,
            ScreenMode::TimexHiColour,
        ] {
            let data = vec![0u8; mode.block_size()];
            let image = decode_screen(&data, 0, data.len(), mode, &palette, &params).unwrap();
            let (w, h) = mode.dimensions();
            assert_eq!((image.width, image.height), (w, h), "{mode}");
            assert_eq!(image.pixels.len(), w * h * 3, "{mode}");
        }
    }
}
