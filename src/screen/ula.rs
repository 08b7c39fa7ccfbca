//! Classic ULA screen: 6144-byte interleaved bitmap followed by 768 attribute
//! bytes, one per 8×8 cell.
//!
//! ```text
//! attribute: F B PPP III   flash, bright, paper, ink
//! ```
//!
//! The block has no notion of time, so flashing cells are always drawn in
//! their swapped phase.

use super::{PixelImage, bitmap_address};

const BITMAP_SIZE: usize = 6144;

/// Colour names for the eight Spectrum colours, by value.
pub const ZX_COLOR_NAMES: [&str; 8] = [
    "BLACK", "BLUE", "RED", "MAGENTA", "GREEN", "CYAN", "YELLOW", "WHITE",
];

/// RGB value of Spectrum colour `index` (0-7).
pub fn zx_color(index: u8, bright: bool) -> [u8; 3] {
    let level = if bright { 0xFF } else { 0xD7 };
    let on = |bit: u8| if index & bit != 0 { level } else { 0 };
    // GRB bit order
    [on(0b010), on(0b100), on(0b001)]
}

/// Ink and paper colours for one attribute byte, flash applied.
pub(super) fn attribute_colors(attr: u8) -> ([u8; 3], [u8; 3]) {
    let bright = attr & 0x40 != 0;
    let ink = zx_color(attr & 0b111, bright);
    let paper = zx_color((attr >> 3) & 0b111, bright);
    if attr & 0x80 != 0 {
        (paper, ink)
    } else {
        (ink, paper)
    }
}

pub(super) fn decode(block: &[u8]) -> PixelImage {
    let (bitmap, attributes) = block.split_at(BITMAP_SIZE);
    let mut image = PixelImage::new(256, 192);
    for y in 0..192 {
        for column in 0..32 {
            let x = column * 8;
            let pixels = bitmap[bitmap_address(x, y)];
            let attr = attributes[(y / 8) * 32 + column];
            let (ink, paper) = attribute_colors(attr);
            for bit in 0..8 {
                let set = pixels & (0x80 >> bit) != 0;
                image.set(x + bit, y, if set { ink } else { paper });
            }
        }
    }
    image
}
