//! **nexkit** - a read-only decoder for ZX Spectrum Next NEX files.
//!
//! A NEX file is a 512-byte header followed by optional loading screens, a
//! palette, a copper program and up to 112 16K memory banks. nexkit walks the
//! file once, carves it into blocks and returns a tree of [`ParsedField`]s
//! for display. Large regions are decoded lazily through [`Deferred`] units.
//!
//! # Modules
//! | Module | Contents |
//! |--------|----------|
//! | [`nex`]     | Header, block layout, [`nex::NexFile`] |
//! | [`screen`]  | ULA, Layer 2, LoRes and Timex pixel decoders |
//! | [`palette`] | 9-bit Next palette |
//! | [`field`]   | The generic node tree |
//! | [`cursor`]  | Bounds-checked little-endian reader |
//!
//! # Example
//! ```no_run
//! let data = std::fs::read("game.nex")?;
//! let file = nexkit::nex::NexFile::parse(&data);
//! for block in file.screens() {
//!     let image = file.screen(&data, block)?;
//!     println!("{:?} {}x{}", block.kind, image.width, image.height);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checksum;
pub mod cursor;
pub mod error;
pub mod field;
pub mod nex;
pub mod options;
pub mod palette;
pub mod screen;
pub(crate) mod utils;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
pub use field::{Deferred, DeferredKind, FieldContent, ParsedField};
pub use nex::{decode, decode_with};
pub use options::DecodeOptions;
pub use palette::Palette;
pub use screen::{PixelImage, ScreenMode, ScreenParams, decode_screen};
