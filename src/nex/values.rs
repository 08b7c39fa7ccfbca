//! Small enumerations and bit sets found in the NEX header.

use std::fmt;

use crate::screen::ZX_COLOR_NAMES;

/// Number of logical 16K banks a NEX file can carry.
pub const BANK_COUNT: usize = 112;

/// Size of one bank payload.
pub const BANK_SIZE: usize = 16384;

/// Logical bank stored in slot `i`.
///
/// Banks 5, 2, 0, 1, 3 and 4 come first, then 6 to 111 in order.
pub const fn bank_storage_order(i: usize) -> usize {
    const FIRST: [usize; 6] = [5, 2, 0, 1, 3, 4];
    if i < FIRST.len() { FIRST[i] } else { i }
}

/// RAMREQ byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamRequirement {
    /// Standard 768K machine.
    Ram768k,
    /// Expanded 1792K machine.
    Ram1792k,
    /// Any other stored value.
    Other(u8),
}

impl From<u8> for RamRequirement {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Ram768k,
            1 => Self::Ram1792k,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for RamRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ram768k => f.write_str("768k"),
            Self::Ram1792k => f.write_str("1792k"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Name of Spectrum colour `value`, `"UNKNOWN"` outside 0-7.
pub fn zx_color_name(value: u8) -> &'static str {
    ZX_COLOR_NAMES
        .get(value as usize)
        .copied()
        .unwrap_or("UNKNOWN")
}

/// LOADSCR bit set: which loading-screen blocks follow the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadScreenFlags(pub u8);

impl LoadScreenFlags {
    /// No palette block, use the default palette.
    pub const NO_PALETTE: u8 = 0x80;
    /// LOADSCR2 selects an extra screen block.
    pub const FLAGS2: u8 = 0x40;
    /// Timex HiColour block.
    pub const HI_COLOUR: u8 = 0x10;
    /// Timex HiRes block.
    pub const HI_RES: u8 = 0x08;
    /// LoRes block.
    pub const LO_RES: u8 = 0x04;
    /// ULA block.
    pub const ULA: u8 = 0x02;
    /// Layer 2 256×192 block.
    pub const LAYER2: u8 = 0x01;

    /// Whether every bit of `mask` is set.
    pub fn has(self, mask: u8) -> bool {
        self.0 & mask == mask
    }
}

/// LOADSCR2 values (V1.3 headers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenFlags2 {
    /// No extra screen.
    #[default]
    None,
    /// Layer 2 320×256, 8 bits per pixel.
    Layer2_320,
    /// Layer 2 640×256, 4 bits per pixel.
    Layer2_640,
    /// Tilemap screen.
    Tilemap,
    /// Any other stored value.
    Other(u8),
}

impl From<u8> for ScreenFlags2 {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::None,
            1 => Self::Layer2_320,
            2 => Self::Layer2_640,
            3 => Self::Tilemap,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ScreenFlags2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Layer2_320 => f.write_str("Layer2 320x256x8"),
            Self::Layer2_640 => f.write_str("Layer2 640x256x4"),
            Self::Tilemap => f.write_str("Tilemap"),
            Self::Other(v) => write!(f, "unknown ({v})"),
        }
    }
}

/// Minimum core version the program needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct CoreVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Sub-minor version.
    pub subminor: u8,
}

impl fmt::Display for CoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.subminor)
    }
}

/// Space-separated numbers of the included banks; `"..."` once the text
/// grows past `limit` characters.
pub fn bank_summary(flags: &[u8], limit: usize) -> String {
    let mut s = String::new();
    for (bank, _) in flags.iter().enumerate().filter(|&(_, &f)| f != 0) {
        s.push_str(&bank.to_string());
        s.push(' ');
        if s.len() > limit {
            return "...".to_owned();
        }
    }
    s.trim_end().to_owned()
}
