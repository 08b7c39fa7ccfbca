//! Display helpers shared by the node builders.

use crate::cursor::Cursor;
use crate::field::{ParsedField, error_node};

/// Bytes per memory dump row.
pub(crate) const ROW_SIZE: usize = 16;

/// Upper-case hex, zero-padded to `digits`.
#[inline]
pub(crate) fn hex_string(value: u64, digits: usize) -> String {
    format!("{value:0digits$X}")
}

/// A 16-bit word as binary, grouped in nibbles: `0000_0001_1111_1111`.
pub(crate) fn bits_string(value: u16) -> String {
    let bits = format!("{value:016b}");
    bits.as_bytes()
        .chunks(4)
        .map(|nibble| String::from_utf8_lossy(nibble).into_owned())
        .collect::<Vec<_>>()
        .join("_")
}

/// Printable-ASCII rendering of `bytes`, `.` for everything else.
fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { '.' })
        .collect()
}

/// Split `size` bytes at `offset` into 16-byte rows.
///
/// Row names are offsets relative to the start of the region. With
/// `collapse`, a run of at least two full rows holding nothing but one
/// byte value becomes a single `"contain all VV"` row. A region running past
/// the end of `data` stops with an error row.
pub(crate) fn memory_dump(data: &[u8], offset: usize, size: usize, collapse: bool) -> Vec<ParsedField> {
    let mut rows = Vec::with_capacity(size.div_ceil(ROW_SIZE));
    let mut i = 0;
    while i < size {
        let len = ROW_SIZE.min(size - i);
        let mut cur = Cursor::at(data, offset + i);
        let row = match cur.take(len) {
            Ok(row) => row,
            Err(e) => {
                rows.push(error_node(offset + i, size - i, e));
                break;
            }
        };

        if collapse {
            let value = row[0];
            let run = data
                .get(offset + i..offset + size)
                .map_or(0, |rest| rest.iter().take_while(|&&b| b == value).count());
            let full_rows = run / ROW_SIZE * ROW_SIZE;
            if full_rows >= 2 * ROW_SIZE {
                rows.push(
                    ParsedField::new(offset + i, full_rows, format!(
                        "{}-{}",
                        hex_string(i as u64, 4),
                        hex_string((i + full_rows - 1) as u64, 4)
                    ))
                    .with_value(format!("contain all {}", hex_string(value.into(), 2)))
                    .with_long(format!("Index (dec): {}-{}\nValue (dec): {value}", i, i + full_rows - 1)),
                );
                i += full_rows;
                continue;
            }
        }

        let hex = row
            .iter()
            .map(|&b| hex_string(b.into(), 2))
            .collect::<Vec<_>>()
            .join(" ");
        rows.push(
            ParsedField::new(offset + i, len, hex_string(i as u64, 4))
                .with_value(hex)
                .with_short(ascii(row)),
        );
        i += len;
    }
    rows
}
