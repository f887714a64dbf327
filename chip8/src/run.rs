use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info};

use chip8_core::constants::TIMER_TICK;
use chip8_core::{AddIndexPolicy, Chip8, Config, FrameBuffer, Quirks};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuirkPreset {
    Modern,
    CosmacVip,
    Amiga,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddIndex {
    Untouched,
    Legacy,
    FlushVf,
}

#[derive(Debug)]
pub struct RunOptions {
    pub rom: PathBuf,
    pub quirks: QuirkPreset,
    pub legacy_shift: bool,
    pub legacy_memory_dump: bool,
    pub add_index: Option<AddIndex>,
    pub instructions_per_frame: usize,
    pub frames: u64,
    pub font_start: Option<u16>,
    pub fast: bool,
    pub dump_memory: Option<PathBuf>,
}

impl RunOptions {
    /// Starts from the preset, then applies the individual overrides on top.
    pub fn config(&self) -> Config {
        let mut quirks = match self.quirks {
            QuirkPreset::Modern => Quirks::modern(),
            QuirkPreset::CosmacVip => Quirks::cosmac_vip(),
            QuirkPreset::Amiga => Quirks::amiga(),
        };
        quirks.legacy_shift |= self.legacy_shift;
        quirks.legacy_memory_dump |= self.legacy_memory_dump;
        if let Some(add_index) = self.add_index {
            quirks.add_index = match add_index {
                AddIndex::Untouched => AddIndexPolicy::Untouched,
                AddIndex::Legacy => AddIndexPolicy::Legacy,
                AddIndex::FlushVf => AddIndexPolicy::FlushVf,
            };
        }

        let mut config = Config {
            quirks,
            ..Config::default()
        };
        if let Some(font_start) = self.font_start {
            config.font_start = font_start;
        }
        config
    }
}

/// Renders the frame buffer as text, one line per row.
pub fn render(frame: &FrameBuffer) -> String {
    let mut out = String::with_capacity(frame.len() * (frame[0].len() + 1));
    for row in frame.iter() {
        out.extend(row.iter().map(|&pixel| if pixel == 1 { '#' } else { '.' }));
        out.push('\n');
    }
    out
}

pub fn run(options: RunOptions) -> Result<()> {
    let mut chip8 = Chip8::with_config(options.config())?;

    // Load ROM
    let file = File::open(&options.rom)
        .with_context(|| format!("unable to open {}", options.rom.display()))?;
    let mut reader = BufReader::new(file);
    chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", options.rom.display()))?;
    info!("successfully loaded {}", options.rom.display());

    // Set initial timing
    let frame_time: Duration = TIMER_TICK;
    let mut last_frame: Instant = Instant::now();
    let mut redraws: u64 = 0;

    let mut outcome = Ok(());
    for _ in 0..options.frames {
        // No input source; every poll cycle starts with nothing pressed.
        chip8.clear_just_pressed();

        if let Err(fault) = chip8.step(options.instructions_per_frame) {
            error!("{}", fault);
            outcome = Err(fault);
            break;
        }
        if chip8.take_frame().is_some() {
            redraws += 1;
        }

        // Handle timing
        let current_time = Instant::now();
        let elapsed_frame_time = current_time - last_frame;
        if !options.fast && frame_time > elapsed_frame_time {
            std::thread::sleep(frame_time - elapsed_frame_time);
        }
        last_frame = Instant::now();
    }

    if let Some(path) = &options.dump_memory {
        chip8
            .dump_memory_to_file(path)
            .with_context(|| format!("unable to write memory dump to {}", path.display()))?;
    }

    info!(
        "executed {} instructions, redrew the display {} times",
        chip8.state().iteration_counter,
        redraws
    );
    print!("{}", render(chip8.display()));
    outcome.context("machine halted")
}
