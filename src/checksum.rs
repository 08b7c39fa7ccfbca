//! CRC-32C (Castagnoli), as used by the optional NEX file checksum.
//!
//! The stored checksum covers everything after the header first, then the
//! header itself minus the 4-byte checksum field:
//! ```text
//! digest.update(file[512..])
//! digest.update(file[0..508])
//! ```
//! nexkit only computes and reports it; a mismatch never stops decoding.

use crc::{CRC_32_ISCSI, Crc, Digest};

use crate::nex::{CHECKSUM_OFFSET, HEADER_SIZE};

/// CRC-32C (iSCSI polynomial, reflected, standard inversion).
pub static CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Incremental CRC-32C over several slices.
pub fn crc32c_digest() -> Digest<'static, u32> {
    CASTAGNOLI.digest()
}

/// CRC-32C of `data`.
pub fn crc32c(data: &[u8]) -> u32 {
    CASTAGNOLI.checksum(data)
}

/// Checksum of a whole NEX file in the order the format defines.
///
/// [`None`] when the buffer is too short to hold a header.
pub fn nex_checksum(file: &[u8]) -> Option<u32> {
    let body = file.get(HEADER_SIZE..)?;
    let header = file.get(..CHECKSUM_OFFSET)?;
    let mut digest = crc32c_digest();
    digest.update(body);
    digest.update(header);
    Some(digest.finalize())
}
