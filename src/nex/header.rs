//! The 512-byte NEX header.
//!
//! ## Version-independent part (142 bytes)
//! ```text
//! [0x00] Signature "Next"                         (4 bytes)
//! [0x04] Version "V1.0".."V1.3"                   (4 bytes)
//! [0x08] RAMREQ (0 = 768k, 1 = 1792k)             (u8)
//! [0x09] NUMBANKS                                 (u8)
//! [0x0A] LOADSCR flags                            (u8)
//! [0x0B] BORDERCOL 0-7                            (u8)
//! [0x0C] SP                                       (u16 LE)
//! [0x0E] PC (0 = don't run)                       (u16 LE)
//! [0x10] NUMFILES (obsolete)                      (u16 LE)
//! [0x12] Bank inclusion, one byte per bank        (112 bytes)
//! [0x82] LOADBAR enable                           (u8)
//! [0x83] LOADCOL                                  (u8)
//! [0x84] LOADDEL, frames per bank                 (u8)
//! [0x85] STARTDEL, frames before start            (u8)
//! [0x86] DONTRESETNEXTREGS                        (u8)
//! [0x87] Core version major.minor.subminor        (3 × u8)
//! [0x8A] HIRESCOL / Layer 2 palette offset        (u8)
//! [0x8B] ENTRYBANK                                (u8)
//! [0x8C] FILEHANDLEADDR                           (u16 LE)
//! ```
//!
//! ## Rest of the header
//! Versions up to "V1.2" leave the remaining 370 bytes reserved. Later
//! versions define:
//! ```text
//! [0x8E] EXPBUSENABLE                             (u8)
//! [0x8F] Has checksum                             (u8)
//! [0x90] Banks offset (file offset of bank data)  (u32 LE)
//! [0x94] CLI buffer address                       (u16 LE)
//! [0x96] CLI buffer size                          (u16 LE)
//! [0x98] LOADSCR2 (1 = L2 320, 2 = L2 640, 3 = tilemap) (u8)
//! [0x99] Has copper code                          (u8)
//! [0x9A] Tilemap mode configuration               (4 bytes)
//! [0x9E] Big Layer 2 loading bar Y                (u8)
//! [0x9F] Reserved                                 (349 bytes)
//! [0x1FC] CRC-32C                                 (u32 LE)
//! ```

use tracing::warn;

use super::values::{
    BANK_COUNT, CoreVersion, LoadScreenFlags, RamRequirement, ScreenFlags2, bank_summary,
    zx_color_name,
};
use crate::checksum::nex_checksum;
use crate::cursor::Cursor;
use crate::field::{DeferredKind, ParsedField};
use crate::options::DecodeOptions;
use crate::utils::hex_string;
use crate::{Error, Result};

/// Size of the whole header.
pub const HEADER_SIZE: usize = 512;
/// Size of the part every version shares.
pub const FIXED_HEADER_SIZE: usize = 142;
/// Header-relative offset of the CRC-32C field.
pub const CHECKSUM_OFFSET: usize = 508;
/// Expected signature.
pub const SIGNATURE: &str = "Next";

/// Newest version whose header ends in reserved bytes.
const LAST_SHORT_VERSION: &str = "V1.2";
/// Reserved gap between the last extended field and the checksum.
const EXTENDED_RESERVED_SIZE: usize = 349;

/// Decoded header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Signature as stored; "Next" in a valid file.
    pub signature: String,
    /// Version string as stored, e.g. "V1.2".
    pub version: String,
    /// Memory the program needs.
    pub ram_required: RamRequirement,
    /// Declared number of banks.
    pub num_banks: u8,
    /// Loading-screen blocks present.
    pub load_screen_flags: LoadScreenFlags,
    /// Border colour, 0-7.
    pub border_color: u8,
    /// Initial stack pointer.
    pub stack_pointer: u16,
    /// Entry point, 0 to load without running.
    pub program_counter: u16,
    /// Obsolete extra-file count.
    pub num_extra_files: u16,
    /// Inclusion flag per logical bank.
    pub bank_inclusion: [bool; BANK_COUNT],
    /// Show a loading bar.
    pub loading_bar: bool,
    /// Loading bar colour.
    pub loading_bar_color: u8,
    /// Frames to wait after each bank.
    pub loading_delay: u8,
    /// Frames to wait before starting.
    pub start_delay: u8,
    /// Keep Next registers as they are.
    pub preserve_registers: bool,
    /// Minimum core version.
    pub core_version: CoreVersion,
    /// Timex HiRes colour and Layer 2 palette offset.
    pub hires_color: u8,
    /// Bank mapped at 0xC000 on entry.
    pub entry_bank: u8,
    /// Where to store the open file handle, 0 to close the file.
    pub file_handle_address: u16,
    /// Fields of post-V1.2 headers.
    pub extended: Option<ExtendedHeader>,
}

/// Header fields that only exist after "V1.2".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedHeader {
    /// Expansion bus enable.
    pub expansion_bus_enable: u8,
    /// The CRC-32C field is meaningful.
    pub has_checksum: bool,
    /// File offset of the first bank payload.
    pub banks_offset: u32,
    /// Address of the command-line buffer.
    pub cli_buffer_address: u16,
    /// Size of the command-line buffer.
    pub cli_buffer_size: u16,
    /// Extra loading screen.
    pub load_screen_flags2: ScreenFlags2,
    /// A 2048-byte copper block follows the screens.
    pub has_copper_code: bool,
    /// Tilemap mode registers.
    pub tilemap_config: [u8; 4],
    /// Y position of the loading bar in big Layer 2 modes.
    pub big_layer2_bar_y: u8,
    /// Stored CRC-32C.
    pub crc32c: u32,
}

impl HeaderInfo {
    /// Whether the signature reads "Next".
    pub fn signature_valid(&self) -> bool {
        self.signature == SIGNATURE
    }

    /// LOADSCR2, [`ScreenFlags2::None`] for short headers.
    pub fn load_screen_flags2(&self) -> ScreenFlags2 {
        self.extended
            .map_or(ScreenFlags2::None, |ext| ext.load_screen_flags2)
    }

    /// Whether a copper block is present.
    pub fn has_copper_code(&self) -> bool {
        self.extended.is_some_and(|ext| ext.has_copper_code)
    }

    /// Stored checksum, if the header has the field.
    pub fn crc32c(&self) -> Option<u32> {
        self.extended.map(|ext| ext.crc32c)
    }

    /// Logical numbers of the included banks.
    pub fn included_banks(&self) -> impl Iterator<Item = usize> + '_ {
        self.bank_inclusion
            .iter()
            .enumerate()
            .filter_map(|(bank, &included)| included.then_some(bank))
    }
}

/// Node for the current cursor window.
fn field(cur: &Cursor<'_>, name: &str) -> ParsedField {
    ParsedField::new(cur.offset(), cur.last_size(), name)
}

fn check_length(cur: &Cursor<'_>, start: usize, expected: usize) -> Result<()> {
    let actual = cur.consumed_since(start);
    if actual != expected {
        return Err(Error::LengthMismatch { expected, actual });
    }
    Ok(())
}

const LOADSCR_BITS: [(u32, &str, &str); 8] = [
    (7, "No palette block", "Use the default palette instead of a palette block."),
    (6, "flags 2", "LOADSCR2 in the V1.3 part of the header selects a screen."),
    (5, "Unused", ""),
    (4, "Hi-Colour", "Timex HiColour screen, 12288 bytes."),
    (3, "Hi-Res", "Timex HiRes screen, 12288 bytes."),
    (2, "Lo-Res", "LoRes screen, 12288 bytes."),
    (1, "ULA", "ULA screen, 6912 bytes."),
    (0, "Layer 2", "Layer 2 screen, 49152 bytes."),
];

const LOADSCR_DESCRIPTION: &str = "Loading-screen blocks in the file (bit flags): \
128 = no palette block, 64 = LOADSCR2 defines the screen, 16 = Hi-Colour, 8 = Hi-Res, \
4 = Lo-Res, 2 = ULA, 1 = Layer 2.\n\
Only Layer 2, LoRes and tilemap screens use the palette block. Several screens may be \
stored, but a file normally carries one.";

/// Decode the header at the cursor, appending one node per field to `node`.
///
/// On error the nodes built so far stay in `node`.
pub(crate) fn decode_header(
    cur: &mut Cursor<'_>,
    node: &mut ParsedField,
    options: &DecodeOptions,
) -> Result<HeaderInfo> {
    let start = cur.end();

    cur.read(4)?;
    let signature = cur.string_value()?;
    let mut sig = field(cur, "NEXT")
        .with_value(signature.as_str())
        .with_short("Signature");
    if signature != SIGNATURE {
        warn!(found = %signature.escape_default(), "NEX signature mismatch");
        sig = sig.with_error(Error::BadSignature(signature.clone()));
    }
    node.push(sig);

    cur.read(4)?;
    let version = cur.string_value()?;
    node.push(
        field(cur, "VERSION")
            .with_value(version.as_str())
            .with_short("File format version"),
    );

    cur.read(1)?;
    let ram_required = RamRequirement::from(cur.u8_value()?);
    node.push(
        field(cur, "RAMREQ")
            .with_value(ram_required.to_string())
            .with_short("RAM required"),
    );

    cur.read(1)?;
    let num_banks = cur.u8_value()?;
    node.push(
        field(cur, "NUMBANKS")
            .with_value(num_banks.to_string())
            .with_short("Number of 16k banks to load: 0-112"),
    );

    cur.read(1)?;
    let load_screen_flags = LoadScreenFlags(cur.u8_value()?);
    let flags_node = node.push(
        field(cur, "LOADSCR")
            .with_value(load_screen_flags.0.to_string())
            .with_short("Loading-screen flags")
            .with_long(LOADSCR_DESCRIPTION),
    );
    for (bit, name, description) in LOADSCR_BITS {
        let mut bit_node = field(cur, name).with_value(if cur.bit_value(bit)? { "1" } else { "0" });
        if !description.is_empty() {
            bit_node = bit_node.with_short(description);
        }
        flags_node.push(bit_node);
    }

    cur.read(1)?;
    let border_color = cur.u8_value()?;
    node.push(
        field(cur, "BORDERCOL")
            .with_value(zx_color_name(border_color))
            .with_short("Border colour: 0-7")
            .with_long(format!("Value (dec): {border_color}")),
    );

    cur.read(2)?;
    let stack_pointer = cur.u16_value()?;
    node.push(word_field(cur, "SP", stack_pointer, "Stack pointer"));

    cur.read(2)?;
    let program_counter = cur.u16_value()?;
    node.push(word_field(cur, "PC", program_counter, "Program counter, 0 = don't run"));

    cur.read(2)?;
    let num_extra_files = cur.u16_value()?;
    node.push(
        field(cur, "NUMFILES")
            .with_value(num_extra_files.to_string())
            .with_short("Number of extra files (obsolete)"),
    );

    cur.read(BANK_COUNT)?;
    let inclusion = cur.bytes()?;
    let mut bank_inclusion = [false; BANK_COUNT];
    for (flag, &byte) in bank_inclusion.iter_mut().zip(inclusion) {
        *flag = byte != 0;
    }
    node.push(
        field(cur, "BANKS")
            .with_value(bank_summary(inclusion, options.bank_summary_limit))
            .with_short("Included banks, one byte per bank")
            .with_deferred(DeferredKind::BankFlags),
    );

    cur.read(1)?;
    let loading_bar = cur.u8_value()? != 0;
    node.push(flag_field(cur, "LOADBAR", loading_bar, "Show loading bar"));

    cur.read(1)?;
    let loading_bar_color = cur.u8_value()?;
    node.push(
        field(cur, "LOADCOL")
            .with_value(loading_bar_color.to_string())
            .with_short("Loading bar colour"),
    );

    cur.read(1)?;
    let loading_delay = cur.u8_value()?;
    node.push(
        field(cur, "LOADDEL")
            .with_value(loading_delay.to_string())
            .with_short("Frames to wait after each bank"),
    );

    cur.read(1)?;
    let start_delay = cur.u8_value()?;
    node.push(
        field(cur, "STARTDEL")
            .with_value(start_delay.to_string())
            .with_short("Frames to wait before start"),
    );

    cur.read(1)?;
    let preserve_registers = cur.u8_value()? != 0;
    node.push(flag_field(
        cur,
        "DONTRESETNEXTREGS",
        preserve_registers,
        "Keep Next registers",
    ));

    cur.read(3)?;
    let core = cur.bytes()?;
    let core_version = CoreVersion {
        major: core[0],
        minor: core[1],
        subminor: core[2],
    };
    node.push(
        field(cur, "CORE_VERSION")
            .with_value(core_version.to_string())
            .with_short("Required core version: major.minor.subminor"),
    );

    cur.read(1)?;
    let hires_color = cur.u8_value()?;
    node.push(
        field(cur, "HIRESCOL")
            .with_value(hires_color.to_string())
            .with_short("Timex HiRes colour / Layer 2 palette offset")
            .with_long(format!(
                "HiRes ink (bits 4-2): {}\nLayer 2 palette offset (bits 3-0): {}",
                (hires_color >> 2) & 0b111,
                hires_color & 0x0F
            )),
    );

    cur.read(1)?;
    let entry_bank = cur.u8_value()?;
    node.push(
        field(cur, "ENTRYBANK")
            .with_value(entry_bank.to_string())
            .with_short("Bank mapped at 0xC000 on entry"),
    );

    cur.read(2)?;
    let file_handle_address = cur.u16_value()?;
    node.push(word_field(
        cur,
        "FILEHANDLEADDR",
        file_handle_address,
        "Address for the open file handle, 0 = close file",
    ));

    check_length(cur, start, FIXED_HEADER_SIZE)?;

    let extended = if version.as_str() <= LAST_SHORT_VERSION {
        cur.read(HEADER_SIZE - FIXED_HEADER_SIZE)?;
        node.push(
            field(cur, "RESERVED")
                .with_short("Reserved")
                .with_deferred(DeferredKind::MemoryDump {
                    collapse: options.collapse_repeated_rows,
                }),
        );
        None
    } else {
        Some(decode_extended(cur, node, options)?)
    };

    check_length(cur, start, HEADER_SIZE)?;

    Ok(HeaderInfo {
        signature,
        version,
        ram_required,
        num_banks,
        load_screen_flags,
        border_color,
        stack_pointer,
        program_counter,
        num_extra_files,
        bank_inclusion,
        loading_bar,
        loading_bar_color,
        loading_delay,
        start_delay,
        preserve_registers,
        core_version,
        hires_color,
        entry_bank,
        file_handle_address,
        extended,
    })
}

fn decode_extended(
    cur: &mut Cursor<'_>,
    node: &mut ParsedField,
    options: &DecodeOptions,
) -> Result<ExtendedHeader> {
    cur.read(1)?;
    let expansion_bus_enable = cur.u8_value()?;
    node.push(
        field(cur, "EXPBUSENABLE")
            .with_value(expansion_bus_enable.to_string())
            .with_short("Expansion bus enable"),
    );

    cur.read(1)?;
    let has_checksum = cur.u8_value()? != 0;
    node.push(flag_field(cur, "HASCHECKSUM", has_checksum, "CRC-32C checksum present"));

    cur.read(4)?;
    let banks_offset = cur.u32_value()?;
    node.push(
        field(cur, "BANKSOFFSET")
            .with_value(banks_offset.to_string())
            .with_short("File offset of the first bank"),
    );

    cur.read(2)?;
    let cli_buffer_address = cur.u16_value()?;
    node.push(word_field(cur, "CLIBUFADDR", cli_buffer_address, "CLI buffer address"));

    cur.read(2)?;
    let cli_buffer_size = cur.u16_value()?;
    node.push(
        field(cur, "CLIBUFSIZE")
            .with_value(cli_buffer_size.to_string())
            .with_short("CLI buffer size"),
    );

    cur.read(1)?;
    let load_screen_flags2 = ScreenFlags2::from(cur.u8_value()?);
    node.push(
        field(cur, "LOADSCR2")
            .with_value(load_screen_flags2.to_string())
            .with_short("Extra loading screen: 1 = Layer 2 320x256, 2 = Layer 2 640x256, 3 = tilemap"),
    );

    cur.read(1)?;
    let has_copper_code = cur.u8_value()? != 0;
    node.push(flag_field(cur, "HASCOPPERCODE", has_copper_code, "2048-byte copper block present"));

    cur.read(4)?;
    let mut tilemap_config = [0u8; 4];
    tilemap_config.copy_from_slice(cur.bytes()?);
    node.push(
        field(cur, "TILEMODE")
            .with_value(
                tilemap_config
                    .iter()
                    .map(|&b| hex_string(b.into(), 2))
                    .collect::<Vec<_>>()
                    .join(" "),
            )
            .with_short("Tilemap mode configuration"),
    );

    cur.read(1)?;
    let big_layer2_bar_y = cur.u8_value()?;
    node.push(
        field(cur, "LOADBARY")
            .with_value(big_layer2_bar_y.to_string())
            .with_short("Loading bar Y position in big Layer 2 modes"),
    );

    cur.read(EXTENDED_RESERVED_SIZE)?;
    node.push(
        field(cur, "RESERVED")
            .with_short("Reserved")
            .with_deferred(DeferredKind::MemoryDump {
                collapse: options.collapse_repeated_rows,
            }),
    );

    cur.read(4)?;
    let crc32c = cur.u32_value()?;
    let mut crc_node = field(cur, "CRC32C")
        .with_value(format!("0x{}", hex_string(crc32c.into(), 8)))
        .with_short("CRC-32C of bytes 512..end, then 0..508");
    if options.verify_checksum
        && has_checksum
        && let Some(computed) = nex_checksum(cur.data())
    {
        let verdict = if computed == crc32c { "matches" } else { "does not match" };
        if computed != crc32c {
            warn!(stored = crc32c, computed, "NEX checksum does not match file contents");
        }
        crc_node = crc_node.with_long(format!(
            "Computed: 0x{} ({verdict})",
            hex_string(computed.into(), 8)
        ));
    }
    node.push(crc_node);

    Ok(ExtendedHeader {
        expansion_bus_enable,
        has_checksum,
        banks_offset,
        cli_buffer_address,
        cli_buffer_size,
        load_screen_flags2,
        has_copper_code,
        tilemap_config,
        big_layer2_bar_y,
        crc32c,
    })
}

fn word_field(cur: &Cursor<'_>, name: &str, value: u16, description: &str) -> ParsedField {
    field(cur, name)
        .with_value(format!("0x{}", hex_string(value.into(), 4)))
        .with_short(description)
        .with_long(format!("Value (dec): {value}"))
}

fn flag_field(cur: &Cursor<'_>, name: &str, value: bool, description: &str) -> ParsedField {
    field(cur, name)
        .with_value(if value { "1" } else { "0" })
        .with_short(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(version: &[u8; 4]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(b"Next");
        data[4..8].copy_from_slice(version);
        data[0x08] = 1;
        data[0x09] = 2;
        data[0x0A] = 0b1000_0010;
        data[0x0B] = 2;
        data[0x0C..0x0E].copy_from_slice(&0xFF00u16.to_le_bytes());
        data[0x0E..0x10].copy_from_slice(&0x8000u16.to_le_bytes());
        data[0x12 + 5] = 1;
        data[0x12 + 7] = 1;
        data[0x87..0x8A].copy_from_slice(&[3, 1, 10]);
        data[0x8A] = 0b0001_0011;
        data
    }

    fn decode(data: &[u8]) -> (Result<HeaderInfo>, ParsedField) {
        let mut cur = Cursor::new(data);
        let mut node = ParsedField::new(0, HEADER_SIZE, "Header");
        let header = decode_header(&mut cur, &mut node, &DecodeOptions::default());
        (header, node)
    }

    #[test]
    fn fixed_fields() {
        let (header, node) = decode(&sample(b"V1.2"));
        let header = header.unwrap();
        assert!(header.signature_valid());
        assert_eq!(header.ram_required, RamRequirement::Ram1792k);
        assert_eq!(header.stack_pointer, 0xFF00);
        assert_eq!(header.program_counter, 0x8000);
        assert_eq!(header.included_banks().collect::<Vec<_>>(), [5, 7]);
        assert_eq!(header.core_version.to_string(), "3.1.10");
        assert_eq!(header.extended, None);

        assert_eq!(node.child("BORDERCOL").unwrap().value, "RED");
        assert_eq!(node.child("BANKS").unwrap().value, "5 7");
        assert_eq!(node.child("SP").unwrap().value, "0xFF00");
        let hirescol = node.child("HIRESCOL").unwrap();
        assert_eq!((hirescol.offset, hirescol.size), (0x8A, 1));
    }

    #[test]
    fn load_screen_bits_are_children() {
        let (_, node) = decode(&sample(b"V1.2"));
        let bits: Vec<(&str, &str)> = node
            .child("LOADSCR")
            .unwrap()
            .children()
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(bits.len(), 8);
        assert_eq!(bits[0], ("No palette block", "1"));
        assert_eq!(bits[6], ("ULA", "1"));
        assert_eq!(bits[7], ("Layer 2", "0"));
    }

    #[test]
    fn version_gate() {
        for version in [b"V1.0", b"V1.1", b"V1.2"] {
            let (header, node) = decode(&sample(version));
            assert_eq!(header.unwrap().extended, None);
            assert!(node.child("RESERVED").is_some());
        }

        let mut data = sample(b"V1.3");
        data[0x8F] = 1;
        data[0x90..0x94].copy_from_slice(&1024u32.to_le_bytes());
        data[0x98] = 2;
        data[0x99] = 1;
        let (header, node) = decode(&data);
        let header = header.unwrap();
        let ext = header.extended.unwrap();
        assert!(ext.has_checksum);
        assert_eq!(ext.banks_offset, 1024);
        assert_eq!(header.load_screen_flags2(), ScreenFlags2::Layer2_640);
        assert!(header.has_copper_code());
        let reserved = node.child("RESERVED").unwrap();
        assert_eq!((reserved.offset, reserved.size), (0x9F, EXTENDED_RESERVED_SIZE));
    }

    #[test]
    fn out_of_range_border_colour() {
        let mut data = sample(b"V1.2");
        data[0x0B] = 9;
        let (_, node) = decode(&data);
        assert_eq!(node.child("BORDERCOL").unwrap().value, "UNKNOWN");
    }

    #[test]
    fn truncation_keeps_decoded_fields() {
        let data = sample(b"V1.3");
        let (header, node) = decode(&data[..0x90]);
        assert!(matches!(
            header,
            Err(Error::OutOfBounds { offset: 0x90, size: 4, .. })
        ));
        assert!(node.child("HASCHECKSUM").is_some());
        assert!(node.child("BANKSOFFSET").is_none());
    }
}
