//! The generic node tree handed to viewers.
//!
//! Every decoded field becomes a [`ParsedField`]. Cheap fields are decoded
//! eagerly; large regions (memory dumps, palettes, screens) carry a
//! [`Deferred`] unit instead, which remembers its own byte range and whatever
//! context it needs and is expanded only when a viewer asks for it.

use std::sync::Arc;

use crate::Error;
use crate::cursor::Cursor;
use crate::palette::{Palette, PaletteEntry};
use crate::screen::{self, PixelImage, ScreenMode, ScreenParams};
use crate::utils::{self, hex_string};

/// One node of the decoded tree.
#[derive(Debug, Clone)]
pub struct ParsedField {
    /// Absolute offset of the field in the buffer.
    pub offset: usize,
    /// Size of the field in bytes.
    pub size: usize,
    /// Field name, e.g. `"NUMBANKS"`.
    pub name: String,
    /// Display value.
    pub value: String,
    /// One-line description.
    pub short_description: String,
    /// Optional longer explanation.
    pub long_description: Option<String>,
    /// Problem found while decoding this field, if any.
    pub error: Option<Error>,
    /// What lies beneath the node.
    pub content: FieldContent,
}

/// Children of a [`ParsedField`].
#[derive(Debug, Clone, Default)]
pub enum FieldContent {
    /// Nothing below this node.
    #[default]
    Leaf,
    /// Eagerly decoded children.
    Children(Vec<ParsedField>),
    /// Children decoded on demand with [`Deferred::expand`].
    Deferred(Deferred),
    /// A rendered image.
    Image(PixelImage),
}

impl ParsedField {
    /// New leaf node.
    pub fn new(offset: usize, size: usize, name: impl Into<String>) -> Self {
        Self {
            offset,
            size,
            name: name.into(),
            value: String::new(),
            short_description: String::new(),
            long_description: None,
            error: None,
            content: FieldContent::Leaf,
        }
    }

    /// Set the display value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the one-line description.
    pub fn with_short(mut self, description: impl Into<String>) -> Self {
        self.short_description = description.into();
        self
    }

    /// Set the long description.
    pub fn with_long(mut self, description: impl Into<String>) -> Self {
        self.long_description = Some(description.into());
        self
    }

    /// Attach an error annotation.
    pub fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Defer the children of this node.
    pub fn with_deferred(mut self, kind: DeferredKind) -> Self {
        self.content = FieldContent::Deferred(Deferred {
            offset: self.offset,
            size: self.size,
            kind,
        });
        self
    }

    /// Append an eager child and return a handle to it.
    ///
    /// Turns a leaf into a parent. A deferred or image node loses its
    /// previous content.
    pub fn push(&mut self, child: ParsedField) -> &mut ParsedField {
        if !matches!(self.content, FieldContent::Children(_)) {
            self.content = FieldContent::Children(Vec::new());
        }
        match &mut self.content {
            FieldContent::Children(children) => {
                children.push(child);
                let last = children.len() - 1;
                &mut children[last]
            }
            _ => unreachable!("content was just set to Children"),
        }
    }

    /// Eager children, empty for any other content.
    pub fn children(&self) -> &[ParsedField] {
        match &self.content {
            FieldContent::Children(children) => children,
            _ => &[],
        }
    }

    /// First eager child named `name`.
    pub fn child(&self, name: &str) -> Option<&ParsedField> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Mutable handle to the first eager child named `name`.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ParsedField> {
        match &mut self.content {
            FieldContent::Children(children) => children.iter_mut().find(|c| c.name == name),
            _ => None,
        }
    }

    /// The deferred unit of this node, if it has one.
    pub fn deferred(&self) -> Option<&Deferred> {
        match &self.content {
            FieldContent::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    /// Children of this node, expanding a deferred unit against `data`.
    /// Leaves the node itself untouched.
    pub fn resolve(&self, data: &[u8]) -> Vec<ParsedField> {
        match &self.content {
            FieldContent::Children(children) => children.clone(),
            FieldContent::Deferred(deferred) => deferred.expand(data),
            FieldContent::Leaf | FieldContent::Image(_) => Vec::new(),
        }
    }

    /// Replace every deferred unit in this subtree by its expansion.
    pub fn expand_all(&mut self, data: &[u8]) {
        if let FieldContent::Deferred(deferred) = &self.content {
            self.content = FieldContent::Children(deferred.expand(data));
        }
        if let FieldContent::Children(children) = &mut self.content {
            for child in children {
                child.expand_all(data);
            }
        }
    }
}

/// A decoding step postponed until a viewer opens the node.
///
/// Expanding never touches any other cursor: it starts its own at the saved
/// offset. The buffer is immutable, so a unit may be expanded any number of
/// times, from any thread, with identical results.
#[derive(Debug, Clone)]
pub struct Deferred {
    /// Start of the region.
    pub offset: usize,
    /// Size of the region.
    pub size: usize,
    /// How to decode it.
    pub kind: DeferredKind,
}

/// Decoders a [`Deferred`] unit can run.
#[derive(Debug, Clone)]
pub enum DeferredKind {
    /// 16-byte hex rows.
    MemoryDump {
        /// Fold runs of identical full rows into one row.
        collapse: bool,
    },
    /// 256 palette entries plus a swatch image.
    PaletteEntries,
    /// One flag per logical bank.
    BankFlags,
    /// A loading screen.
    Screen {
        /// Graphics mode of the block.
        mode: ScreenMode,
        /// Palette in effect for the file.
        palette: Arc<Palette>,
        /// Side values from the header.
        params: ScreenParams,
    },
}

impl Deferred {
    /// Decode the region into child nodes.
    ///
    /// Never fails; problems show up as nodes carrying an [`Error`].
    pub fn expand(&self, data: &[u8]) -> Vec<ParsedField> {
        tracing::trace!(offset = self.offset, size = self.size, "expanding deferred node");
        match &self.kind {
            DeferredKind::MemoryDump { collapse } => {
                utils::memory_dump(data, self.offset, self.size, *collapse)
            }
            DeferredKind::PaletteEntries => palette_entries(data, self.offset, self.size),
            DeferredKind::BankFlags => bank_flags(data, self.offset, self.size),
            DeferredKind::Screen {
                mode,
                palette,
                params,
            } => {
                let node = ParsedField::new(self.offset, self.size, "Image")
                    .with_short(format!("{mode} screen"));
                match screen::decode_screen(data, self.offset, self.size, *mode, palette, params) {
                    Ok(image) => {
                        let mut node = node.with_value(format!("{}x{}", image.width, image.height));
                        node.content = FieldContent::Image(image);
                        vec![node]
                    }
                    Err(e) => vec![error_node(self.offset, self.size, e)],
                }
            }
        }
    }
}

/// Placeholder node for a region that could not be decoded.
pub(crate) fn error_node(offset: usize, size: usize, error: Error) -> ParsedField {
    ParsedField::new(offset, size, "Error")
        .with_value(error.to_string())
        .with_error(error)
}

fn palette_entries(data: &[u8], offset: usize, size: usize) -> Vec<ParsedField> {
    let mut cur = Cursor::at(data, offset);
    let block = match cur.take(size) {
        Ok(block) => block,
        Err(e) => return vec![error_node(offset, size, e)],
    };
    let palette = match Palette::decode(block) {
        Ok(palette) => palette,
        Err(e) => return vec![error_node(offset, size, e)],
    };

    let mut nodes = Vec::with_capacity(palette.entries().len() + 1);
    let mut swatch = ParsedField::new(offset, size, "Swatch")
        .with_value("16x16")
        .with_short("One pixel per entry");
    swatch.content = FieldContent::Image(palette.swatch());
    nodes.push(swatch);

    for (i, entry) in palette.entries().iter().enumerate() {
        nodes.push(palette_entry_node(offset + 2 * i, i, entry));
    }
    nodes
}

fn palette_entry_node(offset: usize, index: usize, entry: &PaletteEntry) -> ParsedField {
    let [r, g, b] = entry.rgb();
    let raw = entry.raw();
    ParsedField::new(offset, 2, format!("[{index}]"))
        .with_value(format!(
            "0x{}: R={}, G={}, B={}, P={}",
            hex_string(raw.into(), 4),
            entry.red,
            entry.green,
            entry.blue,
            u8::from(entry.priority)
        ))
        .with_short(format!("#{r:02X}{g:02X}{b:02X}"))
        .with_long(format!("Bin: P000_000B_RRRG_GGBB = {}", utils::bits_string(raw)))
}

fn bank_flags(data: &[u8], offset: usize, size: usize) -> Vec<ParsedField> {
    let mut cur = Cursor::at(data, offset);
    let mut nodes = Vec::with_capacity(size);
    for bank in 0..size {
        let node = match cur.read(1).and_then(|()| cur.u8_value()) {
            Ok(flag) => ParsedField::new(cur.offset(), 1, format!("Bank {bank}"))
                .with_value(flag.to_string())
                .with_short(if flag != 0 { "included" } else { "not included" }),
            Err(e) => {
                nodes.push(error_node(cur.offset(), size - bank, e));
                break;
            }
        };
        nodes.push(node);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_handle_to_new_child() {
        let mut root = ParsedField::new(0, 10, "root");
        let child = root.push(ParsedField::new(0, 4, "a"));
        child.push(ParsedField::new(0, 1, "a.0"));
        root.push(ParsedField::new(4, 6, "b"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child("a").unwrap().children()[0].name, "a.0");

        root.child_mut("b").unwrap().value = "changed".into();
        assert_eq!(root.child("b").unwrap().value, "changed");
        assert!(root.child_mut("c").is_none());
    }

    #[test]
    fn deferred_expansion_is_repeatable() {
        let data: Vec<u8> = (0..64).collect();
        let node = ParsedField::new(16, 32, "dump")
            .with_deferred(DeferredKind::MemoryDump { collapse: true });
        let first = node.resolve(&data);
        let second = node.resolve(&data);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].value, second[0].value);
        assert_eq!(first[1].offset, 32);
    }

    #[test]
    fn palette_expansion_lists_entries() {
        let mut data = vec![0u8; 600];
        data[10] = 0xFF;
        data[11] = 0x01;
        let node = ParsedField::new(10, 512, "Palette").with_deferred(DeferredKind::PaletteEntries);
        let children = node.resolve(&data);
        assert_eq!(children.len(), 257);
        assert!(matches!(children[0].content, FieldContent::Image(_)));
        assert_eq!(children[1].value, "0x01FF: R=7, G=7, B=7, P=0");
        assert_eq!(children[1].short_description, "#E0E0E0");
    }

    #[test]
    fn truncated_screen_becomes_error_node() {
        let data = vec![0u8; 1000];
        let node = ParsedField::new(512, 6912, "ULA").with_deferred(DeferredKind::Screen {
            mode: ScreenMode::Ula,
            palette: Arc::new(Palette::default()),
            params: ScreenParams::default(),
        });
        let children = node.resolve(&data);
        assert_eq!(children.len(), 1);
        assert!(matches!(children[0].error, Some(Error::ImageDecode(_))));
    }

    #[test]
    fn expand_all_replaces_deferred_nodes() {
        let data = [0u8, 1, 0, 1];
        let mut root = ParsedField::new(0, 4, "root");
        root.push(ParsedField::new(0, 4, "BANKS").with_deferred(DeferredKind::BankFlags));
        root.expand_all(&data);
        let banks = root.child("BANKS").unwrap();
        assert_eq!(banks.children().len(), 4);
        assert_eq!(banks.children()[1].short_description, "included");
    }
}
