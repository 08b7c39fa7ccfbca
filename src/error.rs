//! Library-wide error and result types.

use thiserror::Error;

/// Result alias used throughout nexkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// None of these ever escape [`crate::decode`]: structural errors end the
/// structured walk and leave a raw-dump node behind, image errors turn into an
/// inline error node. They are surfaced as annotations on [`crate::ParsedField`]
/// and through the typed [`crate::nex::ParseStatus`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The 4-byte signature did not read "Next". Non-fatal.
    #[error("bad signature: expected \"Next\", found {0:?}")]
    BadSignature(String),
    /// A self-checked cumulative length did not match its declared value.
    #[error("length mismatch: expected {expected} bytes, consumed {actual}")]
    LengthMismatch {
        /// Length the format mandates at this point.
        expected: usize,
        /// Length actually consumed.
        actual: usize,
    },
    /// A field or block would extend past the end of the buffer.
    #[error("block at offset {offset} with size {size} exceeds buffer length {len}")]
    OutOfBounds {
        /// Start of the offending range.
        offset: usize,
        /// Declared size of the range.
        size: usize,
        /// Length of the whole buffer.
        len: usize,
    },
    /// A screen or palette block could not be turned into pixels.
    #[error("error converting image: {0}")]
    ImageDecode(String),
    /// The block carries no pixel data nexkit knows how to render.
    #[error("no image decoder for {0}")]
    UnsupportedMode(&'static str),
}

impl Error {
    /// Whether this error ends the structured walk of the container.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::LengthMismatch { .. } | Error::OutOfBounds { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_layout_errors_are_structural() {
        let oob = Error::OutOfBounds { offset: 8, size: 4, len: 10 };
        assert!(oob.is_structural());
        assert!(Error::LengthMismatch { expected: 142, actual: 140 }.is_structural());
        assert!(!Error::BadSignature("NEXT".into()).is_structural());
        assert!(!Error::ImageDecode("short".into()).is_structural());
        assert_eq!(
            oob.to_string(),
            "block at offset 8 with size 4 exceeds buffer length 10"
        );
    }
}
