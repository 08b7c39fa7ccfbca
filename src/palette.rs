//! ZX Spectrum Next palettes.
//!
//! ## Block layout (512 bytes, 256 entries of 2 bytes)
//! ```text
//! byte 0: RRRGGGBB   red, green, high two bits of blue
//! byte 1: P000000B   priority bit, low bit of blue
//! ```
//!
//! Channels are 3-bit (0-7) and are scaled by 32 for display.
//!
//! When a file carries no palette block the Next's power-on palette is used:
//! entry `i` is `i` read as `RRRGGGBB`, with the ninth blue bit always clear.

use crate::screen::PixelImage;
use crate::{Error, Result};

/// Number of entries in a palette.
pub const PALETTE_ENTRIES: usize = 256;

/// One palette entry with 3-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteEntry {
    /// Red, 0-7.
    pub red: u8,
    /// Green, 0-7.
    pub green: u8,
    /// Blue, 0-7.
    pub blue: u8,
    /// Layer 2 priority bit.
    pub priority: bool,
}

impl PaletteEntry {
    /// Decode an entry from its two stored bytes.
    pub fn decode(b0: u8, b1: u8) -> Self {
        Self {
            red: b0 >> 5,
            green: (b0 >> 2) & 0b111,
            blue: ((b0 << 1) & 0b110) | (b1 & 1),
            priority: b1 >> 7 == 1,
        }
    }

    /// The power-on entry for `index`.
    pub fn default_for(index: u8) -> Self {
        Self {
            red: index >> 5,
            green: (index >> 2) & 0b111,
            blue: (index << 1) & 0b110,
            priority: false,
        }
    }

    /// Display colour, each channel scaled to 0-224.
    pub fn rgb(&self) -> [u8; 3] {
        [self.red * 32, self.green * 32, self.blue * 32]
    }

    /// The entry re-encoded as the little-endian 16-bit word it is stored as
    /// (`P000_000B_RRRG_GGBB`).
    pub fn raw(&self) -> u16 {
        let b0 = (self.red << 5) | (self.green << 2) | (self.blue >> 1);
        let b1 = (u8::from(self.priority) << 7) | (self.blue & 1);
        u16::from_le_bytes([b0, b1])
    }
}

/// A full 256-entry palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [PaletteEntry; PALETTE_ENTRIES],
}

impl Palette {
    /// Size of a stored palette block in bytes.
    pub const BLOCK_SIZE: usize = 2 * PALETTE_ENTRIES;

    /// Decode a 512-byte palette block.
    pub fn decode(block: &[u8]) -> Result<Self> {
        if block.len() != Self::BLOCK_SIZE {
            return Err(Error::ImageDecode(format!(
                "palette block must be {} bytes, got {}",
                Self::BLOCK_SIZE,
                block.len()
            )));
        }
        let mut entries = [PaletteEntry::default(); PALETTE_ENTRIES];
        for (entry, pair) in entries.iter_mut().zip(block.chunks_exact(2)) {
            *entry = PaletteEntry::decode(pair[0], pair[1]);
        }
        Ok(Self { entries })
    }

    /// The Next's power-on palette.
    pub fn next_default() -> Self {
        let mut entries = [PaletteEntry::default(); PALETTE_ENTRIES];
        for (i, entry) in entries.iter_mut().enumerate() {
            *entry = PaletteEntry::default_for(i as u8);
        }
        Self { entries }
    }

    /// Entry at `index`.
    pub fn entry(&self, index: u8) -> PaletteEntry {
        self.entries[index as usize]
    }

    /// Display colour at `index`.
    pub fn rgb(&self, index: u8) -> [u8; 3] {
        self.entry(index).rgb()
    }

    /// All entries in index order.
    pub fn entries(&self) -> &[PaletteEntry; PALETTE_ENTRIES] {
        &self.entries
    }

    /// View selecting the 16-entry sub-palette `offset` (taken mod 16).
    pub fn offset(&self, offset: u8) -> OffsetPalette<'_> {
        OffsetPalette {
            base: self,
            shift: (offset & 0x0F) * 16,
        }
    }

    /// 16x16 swatch, one pixel per entry in index order.
    pub fn swatch(&self) -> PixelImage {
        let mut image = PixelImage::new(16, 16);
        for (i, entry) in self.entries.iter().enumerate() {
            image.set(i % 16, i / 16, entry.rgb());
        }
        image
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::next_default()
    }
}

/// A palette seen through the Layer 2 palette offset: index `i` resolves to
/// `base[(i + 16 * offset) mod 256]`.
#[derive(Debug, Clone, Copy)]
pub struct OffsetPalette<'a> {
    base: &'a Palette,
    shift: u8,
}

impl OffsetPalette<'_> {
    /// Entry for pixel value `index`.
    pub fn entry(&self, index: u8) -> PaletteEntry {
        self.base.entry(index.wrapping_add(self.shift))
    }

    /// Display colour for pixel value `index`.
    pub fn rgb(&self, index: u8) -> [u8; 3] {
        self.entry(index).rgb()
    }
}
