use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use chip8_core::constants::DEFAULT_INSTRUCTIONS_PER_FRAME;
use chip8_core::rom;
use chip8_core::Config;

mod run;

use run::{AddIndex, QuirkPreset, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "chip8", about = "Headless Chip-8 interpreter and disassembler")]
struct Cli {
    /// Trace every executed instruction (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a ROM for a fixed number of 60Hz frames and print the final display.
    Run {
        #[arg(value_name = "ROM")]
        rom: PathBuf,

        /// Historical interpreter to imitate.
        #[arg(long, value_enum, default_value_t = QuirkPreset::Modern)]
        quirks: QuirkPreset,

        /// Shift VY into VX for 8XY6/8XYE regardless of preset.
        #[arg(long)]
        legacy_shift: bool,

        /// Leave I past the last register for FX55/FX65 regardless of preset.
        #[arg(long)]
        legacy_memory_dump: bool,

        /// How FX1E treats VF, overriding the preset.
        #[arg(long, value_enum)]
        add_index: Option<AddIndex>,

        /// Instructions executed per frame.
        #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_FRAME)]
        ips: usize,

        /// Frames to run before stopping.
        #[arg(long, default_value_t = 600)]
        frames: u64,

        /// Address of the font sprite sheet, e.g. 0x050. Must end below 0x200.
        #[arg(long, value_parser = parse_font_start)]
        font_start: Option<u16>,

        /// Run frames back to back instead of at 60Hz.
        #[arg(long)]
        fast: bool,

        /// Write a raw memory snapshot here when the run ends, faulted or not.
        #[arg(long, value_name = "PATH")]
        dump_memory: Option<PathBuf>,
    },
    /// Write a disassembly listing of a ROM.
    Disasm {
        #[arg(value_name = "ROM")]
        rom: PathBuf,

        /// Listing path; defaults to the ROM path with `_code` appended to its extension.
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

/// Accepts `0x`-prefixed hex or plain decimal.
fn parse_font_start(arg: &str) -> Result<u16, String> {
    let font_start = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => arg.parse(),
    }
    .map_err(|e| e.to_string())?;
    let config = Config {
        font_start,
        ..Config::default()
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(font_start)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Run {
            rom,
            quirks,
            legacy_shift,
            legacy_memory_dump,
            add_index,
            ips,
            frames,
            font_start,
            fast,
            dump_memory,
        } => run::run(RunOptions {
            rom,
            quirks,
            legacy_shift,
            legacy_memory_dump,
            add_index,
            instructions_per_frame: ips,
            frames,
            font_start,
            fast,
            dump_memory,
        }),
        Command::Disasm { rom, out } => {
            let written = rom::disassemble_rom_to_file(&rom, out.as_deref())?;
            println!("{}", written.display());
            Ok(())
        }
    }
}
