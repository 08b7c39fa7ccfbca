//! Timex screen modes. Both split the block into two 6144-byte halves laid
//! out like the ULA bitmap.
//!
//! * HiRes: the halves hold the even and odd 8-pixel columns of a 512-pixel
//!   scanline. Two colours only: the ink from HIRESCOL and its complement as
//!   paper.
//! * HiColour: the first half is the bitmap, the second holds one attribute
//!   byte per 8×1 segment at the same address as the bitmap byte it colours.

use super::ula::{attribute_colors, zx_color};
use super::{PixelImage, bitmap_address};

const HALF: usize = 6144;

pub(super) fn decode_hires(block: &[u8], ink: u8) -> PixelImage {
    let (even, odd) = block.split_at(HALF);
    let ink_rgb = zx_color(ink & 0b111, false);
    let paper_rgb = zx_color(!ink & 0b111, false);
    let mut image = PixelImage::new(512, 192);
    for y in 0..192 {
        for column in 0..32 {
            let address = bitmap_address(column * 8, y);
            for (half, pixels) in [even[address], odd[address]].into_iter().enumerate() {
                let x = column * 16 + half * 8;
                for bit in 0..8 {
                    let set = pixels & (0x80 >> bit) != 0;
                    image.set(x + bit, y, if set { ink_rgb } else { paper_rgb });
                }
            }
        }
    }
    image
}

pub(super) fn decode_hicolour(block: &[u8]) -> PixelImage {
    let (bitmap, attributes) = block.split_at(HALF);
    let mut image = PixelImage::new(256, 192);
    for y in 0..192 {
        for column in 0..32 {
            let x = column * 8;
            let address = bitmap_address(x, y);
            let (ink, paper) = attribute_colors(attributes[address]);
            let pixels = bitmap[address];
            for bit in 0..8 {
                let set = pixels & (0x80 >> bit) != 0;
                image.set(x + bit, y, if set { ink } else { paper });
            }
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hires_interleaves_columns() {
        let mut block = vec![0u8; 12288];
        block[0] = 0x80;
        block[HALF] = 0x01;
        // ink red, paper is its complement (cyan)
        let image = decode_hires(&block, 2);
        assert_eq!(image.get(0, 0), [0xD7, 0, 0]);
        assert_eq!(image.get(1, 0), [0, 0xD7, 0xD7]);
        assert_eq!(image.get(15, 0), [0xD7, 0, 0]);
        assert_eq!(image.get(16, 0), [0, 0xD7, 0xD7]);
    }

    #[test]
    fn hicolour_attributes_change_per_scanline() {
        let mut block = vec![0u8; 12288];
        // scanline 0 paper green, scanline 1 paper magenta
        block[HALF] = 0b100 << 3;
        block[HALF + 256] = 0b011 << 3;
        let image = decode_hicolour(&block);
        assert_eq!(image.get(0, 0), [0, 0xD7, 0]);
        assert_eq!(image.get(0, 1), [0xD7, 0, 0xD7]);
        assert_eq!(image.get(0, 2), [0, 0, 0]);
    }
}
