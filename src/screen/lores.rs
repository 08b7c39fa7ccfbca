//! LoRes: 128×96 palette indices, one byte per sample, drawn as 2×2 blocks.

use super::PixelImage;
use crate::palette::Palette;

const WIDTH: usize = 128;

pub(super) fn decode(block: &[u8], palette: &Palette) -> PixelImage {
    let mut image = PixelImage::new(WIDTH * 2, 96 * 2);
    for (i, &index) in block.iter().enumerate() {
        let rgb = palette.rgb(index);
        let (x, y) = ((i % WIDTH) * 2, (i / WIDTH) * 2);
        image.set(x, y, rgb);
        image.set(x + 1, y, rgb);
        image.set(x, y + 1, rgb);
        image.set(x + 1, y + 1, rgb);
    }
    image
}
