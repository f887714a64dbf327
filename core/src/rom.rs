use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::constants::{MAX_ROM_SIZE, MEMORY_SIZE, PROGRAM_START};
use crate::disasm::listing;
use crate::error::RomError;

/// Reads a ROM image into big-endian instruction words.
///
/// ROMs are flat images with no header; they must have an even length and fit
/// between the program origin and the end of memory.
pub fn read_words(reader: &mut dyn Read) -> Result<Vec<u16>, RomError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    if bytes.len() % 2 != 0 {
        warn!(
            "ROM size ({} bytes) is not even, instructions would be misaligned",
            bytes.len()
        );
        return Err(RomError::OddLength { len: bytes.len() });
    }
    if bytes.len() > MAX_ROM_SIZE {
        return Err(RomError::TooLarge {
            len: bytes.len(),
            max: MAX_ROM_SIZE,
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn load_rom_file(path: &Path) -> Result<Vec<u16>, RomError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_words(&mut reader)
}

/// Copies words into memory at the program origin, high byte first.
pub fn write_program(memory: &mut [u8; MEMORY_SIZE], words: &[u16]) -> Result<(), RomError> {
    let start = PROGRAM_START as usize;
    let len = words.len() * 2;
    if len > MEMORY_SIZE - start {
        return Err(RomError::TooLarge {
            len,
            max: MAX_ROM_SIZE,
        });
    }

    for (slot, word) in memory[start..start + len].chunks_exact_mut(2).zip(words) {
        slot.copy_from_slice(&word.to_be_bytes());
    }
    Ok(())
}

/// Writes a raw snapshot of every byte of memory.
pub fn dump_memory(writer: &mut dyn Write, memory: &[u8; MEMORY_SIZE]) -> Result<(), RomError> {
    writer.write_all(memory)?;
    writer.flush()?;
    Ok(())
}

pub fn dump_memory_to_file(path: &Path, memory: &[u8; MEMORY_SIZE]) -> Result<(), RomError> {
    let mut writer = BufWriter::new(File::create(path)?);
    dump_memory(&mut writer, memory)?;
    info!("wrote memory dump to {}", path.display());
    Ok(())
}

/// Where a listing goes when no explicit path is given: `game.ch8` becomes `game.ch8_code`.
pub fn default_listing_path(rom: &Path) -> PathBuf {
    let mut extension = rom.extension().unwrap_or_default().to_os_string();
    extension.push("_code");
    rom.with_extension(extension)
}

/// Disassembles a ROM into a text listing, one line per word, addressed as if
/// loaded at the program origin. Returns the path written.
pub fn disassemble_rom_to_file(rom: &Path, out: Option<&Path>) -> Result<PathBuf, RomError> {
    let words = load_rom_file(rom)?;
    let out = match out {
        Some(path) => path.to_path_buf(),
        None => default_listing_path(rom),
    };

    fs::write(&out, listing(&words))?;
    info!(
        "wrote {} instructions from {} to {}",
        words.len(),
        rom.display(),
        out.display()
    );
    Ok(out)
}
