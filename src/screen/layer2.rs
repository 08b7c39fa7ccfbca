//! Layer 2 screens.
//!
//! All three variants store palette indices that are resolved through the
//! Layer 2 palette offset. The 256×192 mode is stored row by row; the
//! 320×256 and 640×256 modes are stored column by column, 256 bytes per
//! column, the way the Next maps them into memory.

use super::PixelImage;
use crate::palette::Palette;

pub(super) fn decode_256(block: &[u8], palette: &Palette, offset: u8) -> PixelImage {
    let palette = palette.offset(offset);
    let mut image = PixelImage::new(256, 192);
    for (i, &index) in block.iter().enumerate() {
        image.set(i % 256, i / 256, palette.rgb(index));
    }
    image
}

pub(super) fn decode_320(block: &[u8], palette: &Palette, offset: u8) -> PixelImage {
    let palette = palette.offset(offset);
    let mut image = PixelImage::new(320, 256);
    for (i, &index) in block.iter().enumerate() {
        image.set(i / 256, i % 256, palette.rgb(index));
    }
    image
}

pub(super) fn decode_640(block: &[u8], palette: &Palette, offset: u8) -> PixelImage {
    let palette = palette.offset(offset);
    let mut image = PixelImage::new(640, 256);
    for (i, &pair) in block.iter().enumerate() {
        let x = (i / 256) * 2;
        let y = i % 256;
        image.set(x, y, palette.rgb(pair >> 4));
        image.set(x + 1, y, palette.rgb(pair & 0x0F));
    }
    image
}
