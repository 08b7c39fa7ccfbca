//! NEX - ZX Spectrum Next executable container.
//!
//! Bundles a machine snapshot (16K memory banks) with optional loading
//! screens, a palette and a copper program.
//!
//! ## Layout
//! ```text
//! [0x000] Header                  (512 bytes, see [`header`])
//! [0x200] Palette                 (512 bytes, optional)
//!         Layer 2 256×192 screen  (49152 bytes, LOADSCR bit 0)
//!         ULA screen              (6912 bytes,  LOADSCR bit 1)
//!         LoRes screen            (12288 bytes, LOADSCR bit 2)
//!         Timex HiRes screen      (12288 bytes, LOADSCR bit 3)
//!         Timex HiColour screen   (12288 bytes, LOADSCR bit 4)
//!         Layer 2 320/640 screen  (81920 bytes, LOADSCR bit 6 + LOADSCR2)
//!         Copper code             (2048 bytes, V1.3 has-copper flag)
//!         Banks                   (16384 bytes each, storage order)
//!         Custom data             (anything left)
//! ```
//!
//! ## Palette block
//! Present when LOADSCR bit 7 is clear and the file has a Layer 2 or LoRes
//! screen, or LOADSCR2 selects a tilemap. Otherwise the default palette
//! applies and no bytes are consumed.
//!
//! ## Bank storage order
//! Included banks are stored in the order 5, 2, 0, 1, 3, 4, 6, 7, ..., 111;
//! banks whose inclusion byte is 0 take no space.
//!
//! ## Error recovery
//! Decoding never fails as a whole. When a block does not fit in the buffer
//! or a header length check fails, everything decoded so far is kept and the
//! rest of the buffer becomes a single "Unparsed data" node, see
//! [`ParseStatus`]. NUMBANKS and BANKSOFFSET are advisory: a disagreement
//! with the layout is logged and annotated but does not stop the walk.

pub mod header;
pub mod values;

use std::sync::Arc;

use tracing::{debug, warn};

pub use header::{
    CHECKSUM_OFFSET, ExtendedHeader, FIXED_HEADER_SIZE, HEADER_SIZE, HeaderInfo, SIGNATURE,
};
pub use values::{
    BANK_COUNT, BANK_SIZE, CoreVersion, LoadScreenFlags, RamRequirement, ScreenFlags2,
    bank_storage_order,
};

use crate::cursor::Cursor;
use crate::field::{DeferredKind, ParsedField};
use crate::options::DecodeOptions;
use crate::palette::Palette;
use crate::screen::{PixelImage, ScreenMode, ScreenParams, decode_screen};
use crate::{Error, Result};

/// Size of the copper code block.
pub const COPPER_SIZE: usize = 2048;

/// What a carved region of the file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// 512-byte palette.
    Palette,
    /// A loading screen nexkit can render.
    Screen(ScreenMode),
    /// The 81920-byte LOADSCR2 block for a value without a pixel decoder.
    ExtendedScreen(ScreenFlags2),
    /// Copper program.
    Copper,
    /// Payload of the given logical bank.
    Bank(u8),
    /// Data after the last bank.
    CustomData,
    /// Bytes left over after a structural error.
    Unparsed,
}

impl BlockKind {
    /// Node name used in the field tree.
    pub fn name(&self) -> String {
        match self {
            BlockKind::Palette => "Palette".to_owned(),
            BlockKind::Screen(mode) => format!("{mode} screen"),
            BlockKind::ExtendedScreen(ScreenFlags2::Tilemap) => "Tilemap screen".to_owned(),
            BlockKind::ExtendedScreen(_) => "Extended screen".to_owned(),
            BlockKind::Copper => "Copper code".to_owned(),
            BlockKind::Bank(bank) => format!("Bank {bank}"),
            BlockKind::CustomData => "Custom data".to_owned(),
            BlockKind::Unparsed => "Unparsed data".to_owned(),
        }
    }
}

/// A carved region of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Contents.
    pub kind: BlockKind,
    /// Absolute start offset.
    pub offset: usize,
    /// Size in bytes.
    pub size: usize,
}

impl Block {
    /// First byte after the block.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Where the palette in effect came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteSource {
    /// No palette block, the default palette applies.
    #[default]
    Default,
    /// Palette block at this offset.
    Block(usize),
}

/// Outcome of the structured walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseStatus {
    /// Every byte was accounted for.
    #[default]
    Complete,
    /// The walk stopped early; `raw` covers the rest of the buffer.
    Partial {
        /// Why the walk stopped.
        error: Error,
        /// The undecoded remainder, possibly empty.
        raw: Block,
    },
}

/// A decoded NEX file: typed view plus the field tree.
///
/// Holds no reference to the buffer; pass the same bytes back to
/// [`NexFile::screen`] or [`ParsedField::resolve`] to decode deferred parts.
#[derive(Debug, Clone)]
pub struct NexFile {
    /// Header, if it decoded completely.
    pub header: Option<HeaderInfo>,
    /// Palette shared by every screen of the file.
    pub palette: Arc<Palette>,
    /// Origin of [`NexFile::palette`].
    pub palette_source: PaletteSource,
    /// Blocks after the header in file order, excluding the raw remainder.
    pub blocks: Vec<Block>,
    /// Whether the walk covered the whole buffer.
    pub status: ParseStatus,
    /// Root of the field tree.
    pub root: ParsedField,
}

impl NexFile {
    /// Decode `data` with default options.
    pub fn parse(data: &[u8]) -> Self {
        Self::parse_with(data, &DecodeOptions::default())
    }

    /// Decode `data`. Never fails: see [`ParseStatus`].
    pub fn parse_with(data: &[u8], options: &DecodeOptions) -> Self {
        let root = ParsedField::new(0, data.len(), "NEX file")
            .with_value(format!("Length: {}", data.len()))
            .with_short("ZX Spectrum Next NEX file");
        let mut assembler = Assembler {
            cur: Cursor::new(data),
            options,
            file: NexFile {
                header: None,
                palette: Arc::new(Palette::next_default()),
                palette_source: PaletteSource::Default,
                blocks: Vec::new(),
                status: ParseStatus::Complete,
                root,
            },
        };

        if let Err(error) = assembler.run() {
            assembler.fall_back(error);
        }
        assembler.file
    }

    /// Whether every byte was decoded structurally.
    pub fn is_complete(&self) -> bool {
        self.status == ParseStatus::Complete
    }

    /// Screen parameters taken from the header (zero without a header).
    pub fn screen_params(&self) -> ScreenParams {
        self.header
            .as_ref()
            .map(|h| ScreenParams::from_hires_color(h.hires_color))
            .unwrap_or_default()
    }

    /// The renderable screen blocks.
    pub fn screens(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Screen(_)))
    }

    /// Included banks in storage order.
    pub fn banks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Bank(_)))
    }

    /// Render a screen block of this file from `data`.
    pub fn screen(&self, data: &[u8], block: &Block) -> Result<PixelImage> {
        match block.kind {
            BlockKind::Screen(mode) => decode_screen(
                data,
                block.offset,
                block.size,
                mode,
                &self.palette,
                &self.screen_params(),
            ),
            BlockKind::ExtendedScreen(ScreenFlags2::Tilemap) => {
                Err(Error::UnsupportedMode("tilemap screens"))
            }
            _ => Err(Error::UnsupportedMode("non-screen blocks")),
        }
    }

    /// Number of bytes covered by the structured walk.
    pub fn consumed(&self) -> usize {
        match &self.status {
            ParseStatus::Partial { raw, .. } => raw.offset,
            ParseStatus::Complete => self.root.size,
        }
    }
}

/// Walks the buffer after the header, carving one block per present part.
struct Assembler<'a, 'o> {
    cur: Cursor<'a>,
    options: &'o DecodeOptions,
    file: NexFile,
}

impl Assembler<'_, '_> {
    fn run(&mut self) -> Result<()> {
        let mut header_node = ParsedField::new(0, HEADER_SIZE, "Header").with_short("NEX header");
        let header = header::decode_header(&mut self.cur, &mut header_node, self.options);
        self.file.root.push(header_node);
        let header = header?;
        debug!(version = %header.version, flags = header.load_screen_flags.0, "decoded NEX header");

        let flags = header.load_screen_flags;
        let flags2 = header.load_screen_flags2();
        let params = ScreenParams::from_hires_color(header.hires_color);
        let has_copper = header.has_copper_code();
        let inclusion = header.bank_inclusion;
        let banks_offset = header.extended.map_or(0, |ext| ext.banks_offset);
        let declared_banks = header.num_banks;
        self.file.header = Some(header);

        let needs_palette = !flags.has(LoadScreenFlags::NO_PALETTE)
            && (flags.has(LoadScreenFlags::LO_RES)
                || flags.has(LoadScreenFlags::LAYER2)
                || (flags.has(LoadScreenFlags::FLAGS2) && flags2 == ScreenFlags2::Tilemap));
        if needs_palette {
            let block = self.carve(BlockKind::Palette, Palette::BLOCK_SIZE, DeferredKind::PaletteEntries)?;
            self.file.palette = Arc::new(Palette::decode(self.cur.bytes()?)?);
            self.file.palette_source = PaletteSource::Block(block.offset);
        }

        for (bit, mode) in [
            (LoadScreenFlags::LAYER2, ScreenMode::Layer2),
            (LoadScreenFlags::ULA, ScreenMode::Ula),
            (LoadScreenFlags::LO_RES, ScreenMode::LoRes),
            (LoadScreenFlags::HI_RES, ScreenMode::TimexHiRes),
            (LoadScreenFlags::HI_COLOUR, ScreenMode::TimexHiColour),
        ] {
            if flags.has(bit) {
                self.screen(mode, params)?;
            }
        }

        if flags.has(LoadScreenFlags::FLAGS2) {
            match flags2 {
                ScreenFlags2::Layer2_320 => {
                    self.screen(ScreenMode::Layer2_320, params)?;
                }
                ScreenFlags2::Layer2_640 => {
                    self.screen(ScreenMode::Layer2_640, params)?;
                }
                other => {
                    self.carve(
                        BlockKind::ExtendedScreen(other),
                        ScreenMode::Layer2_320.block_size(),
                        self.dump(),
                    )?;
                }
            }
        }

        if has_copper {
            self.carve(BlockKind::Copper, COPPER_SIZE, self.dump())?;
        }

        let included = inclusion.iter().filter(|&&b| b).count();
        if included != declared_banks as usize {
            warn!(declared = declared_banks, included, "NUMBANKS disagrees with bank inclusion table");
        }
        if banks_offset != 0 && included > 0 && self.cur.end() != banks_offset as usize {
            let error = Error::LengthMismatch {
                expected: banks_offset as usize,
                actual: self.cur.end(),
            };
            warn!(%error, "BANKSOFFSET disagrees with the block layout");
            if let Some(node) = self
                .file
                .root
                .child_mut("Header")
                .and_then(|header| header.child_mut("BANKSOFFSET"))
            {
                node.error = Some(error);
            }
        }
        for slot in 0..BANK_COUNT {
            let bank = bank_storage_order(slot);
            if inclusion[bank] {
                self.carve(BlockKind::Bank(bank as u8), BANK_SIZE, self.dump())?;
            }
        }

        let len = self.cur.data().len();
        let remainder = len.checked_sub(self.cur.end()).ok_or(Error::OutOfBounds {
            offset: self.cur.offset(),
            size: self.cur.last_size(),
            len,
        })?;
        if remainder > 0 {
            self.carve(BlockKind::CustomData, remainder, self.dump())?;
        }
        Ok(())
    }

    fn screen(&mut self, mode: ScreenMode, params: ScreenParams) -> Result<Block> {
        let deferred = DeferredKind::Screen {
            mode,
            palette: Arc::clone(&self.file.palette),
            params,
        };
        self.carve(BlockKind::Screen(mode), mode.block_size(), deferred)
    }

    fn dump(&self) -> DeferredKind {
        DeferredKind::MemoryDump {
            collapse: self.options.collapse_repeated_rows,
        }
    }

    fn carve(&mut self, kind: BlockKind, size: usize, deferred: DeferredKind) -> Result<Block> {
        self.cur.read(size)?;
        let block = Block {
            kind,
            offset: self.cur.offset(),
            size,
        };
        debug!(?kind, offset = block.offset, size, "carved block");
        self.file.root.push(
            ParsedField::new(block.offset, size, kind.name())
                .with_value(format!("{size} bytes"))
                .with_deferred(deferred),
        );
        self.file.blocks.push(block);
        Ok(block)
    }

    /// Expose everything from the failure point on as one raw node.
    fn fall_back(&mut self, error: Error) {
        let len = self.cur.data().len();
        let start = match error {
            Error::OutOfBounds { .. } => self.cur.offset(),
            _ => self.cur.end(),
        }
        .min(len);
        warn!(%error, offset = start, "NEX structure ends early, dumping remainder");

        let raw = Block {
            kind: BlockKind::Unparsed,
            offset: start,
            size: len - start,
        };
        let node = ParsedField::new(raw.offset, raw.size, BlockKind::Unparsed.name())
            .with_value(format!("{} bytes", raw.size))
            .with_short("Not decodable as NEX structure")
            .with_error(error.clone())
            .with_deferred(self.dump());
        self.file.root.push(node);
        self.file.status = ParseStatus::Partial { error, raw };
    }
}

/// Decode `data` into a field tree with default options.
pub fn decode(data: &[u8]) -> ParsedField {
    NexFile::parse(data).root
}

/// Decode `data` into a field tree.
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> ParsedField {
    NexFile::parse_with(data, options).root
}
