use std::error::Error;
use std::fs;

use nexkit::nex::NexFile;

fn main() -> Result<(), Box<dyn Error>> {
    let data = fs::read("game.nex")?;
    let file = NexFile::parse(&data);

    if let Some(header) = &file.header {
        println!("version: {}, banks: {}", header.version, header.num_banks);
    }
    for block in file.screens() {
        let image = file.screen(&data, block)?;
        println!("{}: {}x{}", block.kind.name(), image.width, image.height);
    }

    Ok(())
}
