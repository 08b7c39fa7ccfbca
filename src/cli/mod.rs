//! nexkit CLI - inspect NEX files and export their loading screens.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::checksum::nex_checksum;
use crate::field::{FieldContent, ParsedField};
use crate::nex::{NexFile, ParseStatus, values::bank_summary};
use crate::options::DecodeOptions;
use crate::screen::PixelImage;

#[derive(Parser)]
#[command(name = "nexkit", version)]
#[command(about = "Inspect ZX Spectrum Next NEX files", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decoded field tree
    Tree {
        /// NEX file
        file: PathBuf,

        /// Expand memory dumps, palettes and screens
        #[arg(short, long)]
        expand: bool,

        /// Show every row of memory dumps
        #[arg(long)]
        no_collapse: bool,
    },
    /// Summarise the header and block layout
    Info {
        /// NEX file
        file: PathBuf,
    },
    /// Write every loading screen and the palette as PNG
    Screens {
        /// NEX file
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

/// Run the nexkit CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Tree {
            file,
            expand,
            no_collapse,
        } => tree(&file, expand, !no_collapse),
        Commands::Info { file } => info(&file),
        Commands::Screens { file, output } => screens(&file, &output),
    }
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn tree(path: &Path, expand: bool, collapse: bool) -> anyhow::Result<()> {
    let data = read(path)?;
    let options = DecodeOptions {
        collapse_repeated_rows: collapse,
        ..DecodeOptions::default()
    };
    let mut root = crate::decode_with(&data, &options);
    if expand {
        root.expand_all(&data);
    }
    print_node(&root, 0);
    Ok(())
}

fn print_node(node: &ParsedField, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut line = format!("{:08X} {indent}{}", node.offset, node.name);
    if !node.value.is_empty() {
        line.push_str(&format!(" = {}", node.value));
    }
    if !node.short_description.is_empty() {
        line.push_str(&format!("  ({})", node.short_description));
    }
    if let Some(error) = &node.error {
        line.push_str(&format!("  [{error}]"));
    }
    println!("{line}");

    match &node.content {
        FieldContent::Children(children) => {
            for child in children {
                print_node(child, depth + 1);
            }
        }
        FieldContent::Deferred(_) => println!("{:8} {indent}  ...", ""),
        FieldContent::Leaf | FieldContent::Image(_) => {}
    }
}

fn info(path: &Path) -> anyhow::Result<()> {
    let data = read(path)?;
    let file = NexFile::parse(&data);

    println!("{}: {} bytes", path.display(), data.len());
    if let Some(header) = &file.header {
        println!("Version:        {}", header.version);
        println!("RAM required:   {}", header.ram_required);
        let flags: Vec<u8> = header.bank_inclusion.iter().map(|&b| u8::from(b)).collect();
        println!("Banks:          {} ({})", header.num_banks, bank_summary(&flags, usize::MAX));
        println!(
            "Entry:          PC={:04X} SP={:04X} bank {}",
            header.program_counter, header.stack_pointer, header.entry_bank
        );
        println!("Core version:   {}", header.core_version);
        if let Some(stored) = header.crc32c() {
            let computed = nex_checksum(&data).unwrap_or_default();
            let state = if stored == computed { "ok" } else { "mismatch" };
            println!("CRC-32C:        {stored:08X} ({state})");
        }
    }
    println!("Palette:        {:?}", file.palette_source);
    for block in &file.blocks {
        println!("{:08X} {:>6}  {}", block.offset, block.size, block.kind.name());
    }
    if let ParseStatus::Partial { error, raw } = &file.status {
        println!("{:08X} {:>6}  unparsed: {error}", raw.offset, raw.size);
    }
    Ok(())
}

fn screens(path: &Path, output: &Path) -> anyhow::Result<()> {
    let data = read(path)?;
    let file = NexFile::parse(&data);
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let stem = path
        .file_stem()
        .map_or_else(|| "nex".into(), |s| s.to_string_lossy().into_owned());
    let mut written = 0;
    for block in file.screens() {
        let image = file
            .screen(&data, block)
            .with_context(|| format!("failed to decode {}", block.kind.name()))?;
        let name = block.kind.name().replace(' ', "_").to_lowercase();
        write_png(&image, &output.join(format!("{stem}_{name}.png")))?;
        written += 1;
    }
    write_png(&file.palette.swatch(), &output.join(format!("{stem}_palette.png")))?;

    println!("wrote {written} screen(s) to {}", output.display());
    Ok(())
}

fn write_png(picture: &PixelImage, path: &Path) -> anyhow::Result<()> {
    let (width, height) = (picture.width as u32, picture.height as u32);
    let buffer = image::RgbImage::from_raw(width, height, picture.pixels.clone())
        .context("pixel buffer does not match image size")?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote image");
    Ok(())
}
