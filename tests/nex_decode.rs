use nexkit::nex::{
    BANK_SIZE, Block, BlockKind, CHECKSUM_OFFSET, HEADER_SIZE, NexFile, PaletteSource, ParseStatus,
};
use nexkit::{DecodeOptions, Error, FieldContent, ParsedField, ScreenMode};
use pretty_assertions::assert_eq;

const ULA_SIZE: usize = 6912;
const BIG_SCREEN_SIZE: usize = 81920;

/// A 512-byte header with the given version, LOADSCR flags and banks.
fn header(version: &[u8; 4], flags: u8, banks: &[usize]) -> Vec<u8> {
    let mut h = vec![0u8; HEADER_SIZE];
    h[0..4].copy_from_slice(b"Next");
    h[4..8].copy_from_slice(version);
    h[0x09] = banks.len() as u8;
    h[0x0A] = flags;
    for &bank in banks {
        h[0x12 + bank] = 1;
    }
    h
}

fn names(root: &ParsedField) -> Vec<&str> {
    root.children().iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn ula_screen_then_custom_data() {
    let mut data = header(b"V1.2", 0x02, &[]);
    data.extend(std::iter::repeat_n(0x38, ULA_SIZE));
    data.extend([0xAA; 100]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    assert_eq!(file.palette_source, PaletteSource::Default);
    assert_eq!(
        file.blocks,
        vec![
            Block { kind: BlockKind::Screen(ScreenMode::Ula), offset: 512, size: ULA_SIZE },
            Block { kind: BlockKind::CustomData, offset: 512 + ULA_SIZE, size: 100 },
        ]
    );
    assert_eq!(names(&file.root), ["Header", "ULA screen", "Custom data"]);
    assert_eq!(file.consumed(), data.len());
}

#[test]
fn flags2_selects_layer2_320() {
    let mut data = header(b"V1.3", 0x40, &[]);
    data[0x98] = 1;
    data.extend(vec![0u8; BIG_SCREEN_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    assert_eq!(file.palette_source, PaletteSource::Default);
    let screens: Vec<&Block> = file.screens().collect();
    assert_eq!(screens.len(), 1);
    assert_eq!(screens[0].kind, BlockKind::Screen(ScreenMode::Layer2_320));
    assert_eq!(screens[0].size, BIG_SCREEN_SIZE);

    let image = file.screen(&data, screens[0]).unwrap();
    assert_eq!((image.width, image.height), (320, 256));
}

#[test]
fn unknown_flags2_is_kept_as_raw_block() {
    let mut data = header(b"V1.3", 0x40, &[]);
    data[0x98] = 7;
    data.extend(vec![0u8; BIG_SCREEN_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    assert_eq!(file.screens().count(), 0);
    assert_eq!(file.blocks.len(), 1);
    assert!(matches!(file.blocks[0].kind, BlockKind::ExtendedScreen(_)));
    assert!(matches!(
        file.screen(&data, &file.blocks[0]),
        Err(Error::UnsupportedMode(_))
    ));
}

#[test]
fn palette_block_colours_layer2_screen() {
    let mut data = header(b"V1.2", 0x01, &[]);
    let mut palette = vec![0u8; 512];
    palette[14] = 0xE0;
    data.extend(&palette);
    let mut screen = vec![0u8; 49152];
    screen[0] = 7;
    data.extend(&screen);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    assert_eq!(file.palette_source, PaletteSource::Block(512));
    assert_eq!(file.palette.rgb(7), [224, 0, 0]);

    let layer2 = file.screens().next().unwrap();
    assert_eq!(layer2.offset, 1024);
    let image = file.screen(&data, layer2).unwrap();
    assert_eq!(image.get(0, 0), [224, 0, 0]);
    assert_eq!(image.get(1, 0), [0, 0, 0]);
}

#[test]
fn no_palette_flag_skips_palette_block() {
    let mut data = header(b"V1.2", 0x81, &[]);
    data.extend(vec![0u8; 49152]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    assert_eq!(file.palette_source, PaletteSource::Default);
    assert_eq!(file.blocks[0].offset, 512);
}

#[test]
fn banks_follow_storage_order() {
    let mut data = header(b"V1.2", 0x00, &[2, 5]);
    data.extend(vec![0x55; BANK_SIZE]);
    data.extend(vec![0x22; BANK_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    let banks: Vec<(BlockKind, usize)> = file.banks().map(|b| (b.kind, b.offset)).collect();
    assert_eq!(
        banks,
        vec![(BlockKind::Bank(5), 512), (BlockKind::Bank(2), 512 + BANK_SIZE)]
    );

    let bank5 = file.root.child("Bank 5").unwrap();
    let rows = bank5.resolve(&data);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "0000-3FFF");
    assert_eq!(rows[0].value, "contain all 55");
}

#[test]
fn short_header_reserves_the_rest() {
    let data = header(b"V1.1", 0x00, &[]);
    let root = nexkit::decode(&data);
    let header = root.child("Header").unwrap();
    let reserved = header.child("RESERVED").unwrap();
    assert_eq!((reserved.offset, reserved.size), (142, 370));
    assert!(header.child("CRC32C").is_none());
}

#[test]
fn extended_header_ends_with_checksum() {
    let mut data = header(b"V1.3", 0x00, &[]);
    data[CHECKSUM_OFFSET..HEADER_SIZE].copy_from_slice(&0x1234_5678u32.to_le_bytes());

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    let header = file.root.child("Header").unwrap();
    let crc = header.child("CRC32C").unwrap();
    assert_eq!((crc.offset, crc.size), (CHECKSUM_OFFSET, 4));
    assert_eq!(crc.value, "0x12345678");
    assert_eq!(file.header.unwrap().crc32c(), Some(0x1234_5678));
}

#[test]
fn stored_checksum_is_verified() {
    let mut data = header(b"V1.3", 0x00, &[]);
    data[0x8F] = 1;
    data.extend([1, 2, 3, 4]);
    let crc = nexkit::checksum::nex_checksum(&data).unwrap();
    data[CHECKSUM_OFFSET..HEADER_SIZE].copy_from_slice(&crc.to_le_bytes());

    let root = nexkit::decode(&data);
    let node = root.child("Header").unwrap().child("CRC32C").unwrap();
    assert!(node.long_description.as_deref().unwrap().ends_with("(matches)"));

    let options = DecodeOptions { verify_checksum: false, ..DecodeOptions::default() };
    let root = nexkit::decode_with(&data, &options);
    let node = root.child("Header").unwrap().child("CRC32C").unwrap();
    assert_eq!(node.long_description, None);
}

#[test]
fn bad_signature_does_not_stop_decoding() {
    let mut data = header(b"V1.2", 0x02, &[]);
    data[0..4].copy_from_slice(b"Nope");
    data.extend(vec![0u8; ULA_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    assert!(!file.header.as_ref().unwrap().signature_valid());
    let sig = file.root.child("Header").unwrap().child("NEXT").unwrap();
    assert_eq!(sig.error, Some(Error::BadSignature("Nope".into())));
    assert_eq!(file.screens().count(), 1);
}

#[test]
fn truncated_header_becomes_raw_node() {
    let data = header(b"V1.2", 0x02, &[])[..100].to_vec();

    let file = NexFile::parse(&data);
    assert!(file.header.is_none());
    let ParseStatus::Partial { error, raw } = &file.status else {
        panic!("expected a partial parse");
    };
    assert!(matches!(error, Error::OutOfBounds { .. }));
    // BANKS at 0x12 is the first field that does not fit.
    assert_eq!((raw.offset, raw.size), (0x12, 100 - 0x12));

    let last = file.root.children().last().unwrap();
    assert_eq!(last.name, "Unparsed data");
    assert_eq!(last.offset, 0x12);
}

#[test]
fn empty_buffer_does_not_panic() {
    let file = NexFile::parse(&[]);
    let ParseStatus::Partial { raw, .. } = file.status else {
        panic!("expected a partial parse");
    };
    assert_eq!((raw.offset, raw.size), (0, 0));
}

#[test]
fn truncated_block_keeps_earlier_blocks() {
    let mut data = header(b"V1.2", 0x02, &[0]);
    data.extend(vec![0u8; ULA_SIZE]);
    data.extend(vec![0u8; 1000]);

    let file = NexFile::parse(&data);
    assert_eq!(file.screens().count(), 1);
    assert_eq!(file.banks().count(), 0);
    let ParseStatus::Partial { error, raw } = &file.status else {
        panic!("expected a partial parse");
    };
    assert!(matches!(error, Error::OutOfBounds { .. }));
    assert_eq!((raw.offset, raw.size), (512 + ULA_SIZE, 1000));
}

#[test]
fn banks_offset_mismatch_is_annotated() {
    let mut data = header(b"V1.3", 0x00, &[5]);
    data[0x90..0x94].copy_from_slice(&1024u32.to_le_bytes());
    data.extend(vec![0u8; BANK_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    let banks: Vec<(BlockKind, usize)> = file.banks().map(|b| (b.kind, b.offset)).collect();
    assert_eq!(banks, vec![(BlockKind::Bank(5), 512)]);

    let node = file.root.child("Header").unwrap().child("BANKSOFFSET").unwrap();
    assert_eq!(
        node.error,
        Some(Error::LengthMismatch { expected: 1024, actual: 512 })
    );
}

#[test]
fn matching_banks_offset_is_not_annotated() {
    let mut data = header(b"V1.3", 0x00, &[5]);
    data[0x90..0x94].copy_from_slice(&512u32.to_le_bytes());
    data.extend(vec![0u8; BANK_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    let node = file.root.child("Header").unwrap().child("BANKSOFFSET").unwrap();
    assert_eq!(node.error, None);
}

#[test]
fn banks_follow_screens_and_copper() {
    let mut data = header(b"V1.3", 0x02, &[2, 5]);
    data[0x99] = 1;
    data.extend(vec![0u8; ULA_SIZE]);
    data.extend(vec![0u8; 2048]);
    data.extend(vec![0x55; BANK_SIZE]);
    data.extend(vec![0x22; BANK_SIZE]);

    let file = NexFile::parse(&data);
    assert!(file.is_complete());
    let layout: Vec<(BlockKind, usize)> = file.blocks.iter().map(|b| (b.kind, b.offset)).collect();
    let first_bank = 512 + ULA_SIZE + 2048;
    assert_eq!(
        layout,
        vec![
            (BlockKind::Screen(ScreenMode::Ula), 512),
            (BlockKind::Copper, 512 + ULA_SIZE),
            (BlockKind::Bank(5), first_bank),
            (BlockKind::Bank(2), first_bank + BANK_SIZE),
        ]
    );
    assert_eq!(file.consumed(), data.len());
}

#[test]
fn screen_nodes_expand_to_images() {
    let mut data = header(b"V1.2", 0x02, &[]);
    data.extend(vec![0u8; ULA_SIZE]);

    let mut root = nexkit::decode(&data);
    root.expand_all(&data);
    let screen = root.child("ULA screen").unwrap();
    let FieldContent::Image(image) = &screen.children()[0].content else {
        panic!("expected an image node");
    };
    assert_eq!((image.width, image.height), (256, 192));
}
