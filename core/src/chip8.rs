use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::constants::{
    DEFAULT_INSTRUCTIONS_PER_FRAME, INSTRUCTION_SIZE, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET,
    TIMER_TICK,
};
use crate::disasm::format_instruction_line;
use crate::error::{ConfigError, Fault, FaultKind, RomError};
use crate::instruction::decode;
use crate::rom;
use crate::state::{Config, FrameBuffer, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Owns the machine `state`; nothing else mutates it. The embedding
/// application supplies input between calls to `step` and reads the
/// frame buffer and sound signal back out.
///
/// Supplies interfaces for:
/// - initialising and loading roms
/// - pressing and releasing keys
/// - stepping the CPU and its 60Hz timers
/// - inspecting its frame buffer for rendering by some display
/// - inspecting its sound timer for driving a beeper
pub struct Chip8 {
    state: State,
}

impl Chip8 {
    pub fn new() -> Self {
        let mut chip8 = Chip8 {
            state: State::new(),
        };
        chip8.initialise();
        chip8
    }

    /// Builds a machine with the given quirks and font origin.
    /// Fails when the font would not fit below the program origin.
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut chip8 = Chip8 {
            state: State::new(),
        };
        chip8.state.config = config;
        chip8.initialise();
        Ok(chip8)
    }

    /// Resets the machine: clears memory and registers, copies the font to
    /// `config.font_start`, points the PC at the program origin and restarts
    /// the timer clock. The configuration survives.
    pub fn initialise(&mut self) {
        let config = self.state.config;
        self.state = State::new();
        self.state.config = config;

        let start = (config.font_start as usize).min(MEMORY_SIZE);
        let end = (start + SPRITE_SHEET.len()).min(MEMORY_SIZE);
        if end - start < SPRITE_SHEET.len() {
            warn!(
                "font at {:#05X} truncated to {} of {} bytes",
                config.font_start,
                end - start,
                SPRITE_SHEET.len()
            );
        }
        self.state.memory[start..end].copy_from_slice(&SPRITE_SHEET[..end - start]);
        self.state.pc = PROGRAM_START;
        self.state.last_timer_update = Instant::now();
    }

    /// Replaces the quirk configuration. Only meant to be called between
    /// loads; call `initialise` afterwards to move the font.
    pub fn configure(&mut self, config: Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.state.config = config;
        Ok(())
    }

    pub fn config(&self) -> Config {
        self.state.config
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a reader positioned at the start of a ROM image
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<(), RomError> {
        let words = rom::read_words(reader)?;
        self.load_words(&words)
    }

    /// Writes big-endian instruction words into memory at the program origin.
    pub fn load_words(&mut self, words: &[u16]) -> Result<(), RomError> {
        rom::write_program(&mut self.state.memory, words)?;
        debug!(
            "loaded {} instructions at {:#05X}",
            words.len(),
            PROGRAM_START
        );
        Ok(())
    }

    /// Writes a raw snapshot of all of memory.
    pub fn dump_memory(&self, writer: &mut dyn Write) -> Result<(), RomError> {
        rom::dump_memory(writer, &self.state.memory)
    }

    pub fn dump_memory_to_file(&self, path: &Path) -> Result<(), RomError> {
        rom::dump_memory_to_file(path, &self.state.memory)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// The frame buffer, whether or not it changed.
    pub fn display(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if the display should be redrawn, at most once per change
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(&self.state.frame_buffer)
        } else {
            None
        }
    }

    /// A beeper should sound for as long as this holds.
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad index (0x0..=0xF) of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        let key = key as usize & 0xF;
        if !self.state.keypad[key] {
            self.state.just_pressed[key] = true;
        }
        self.state.keypad[key] = true;
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad index (0x0..=0xF) of the key that was released
    pub fn key_release(&mut self, key: u8) {
        self.state.keypad[key as usize & 0xF] = false;
    }

    /// Replaces the whole keypad, latching every key that went down since the last poll.
    pub fn set_keypad(&mut self, keys: [bool; 16]) {
        for (key, &down) in keys.iter().enumerate() {
            if down && !self.state.keypad[key] {
                self.state.just_pressed[key] = true;
            }
        }
        self.state.keypad = keys;
    }

    /// Forgets latched presses; call once at the start of every input poll.
    pub fn clear_just_pressed(&mut self) {
        self.state.just_pressed = [false; 16];
    }

    /// Decrements the timers by the number of whole 60Hz ticks elapsed since the last update.
    /// Fractions of a tick carry over to the next call.
    pub fn update_timers(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.state.last_timer_update);
        let ticks = elapsed.as_nanos() / TIMER_TICK.as_nanos();
        if ticks == 0 {
            return;
        }

        let was_beeping = self.sound_active();
        let decrement = u8::try_from(ticks).unwrap_or(u8::MAX);
        self.state.delay_timer = self.state.delay_timer.saturating_sub(decrement);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(decrement);

        let carried = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.state.last_timer_update += TIMER_TICK * carried;
        debug!("timers advanced by {} ticks", ticks);

        if was_beeping != self.sound_active() {
            debug!("beep {}", if self.sound_active() { "on" } else { "off" });
        }
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn get_op(&self) -> Result<u16, Fault> {
        let pc = self.state.pc as usize;
        if pc > MEMORY_SIZE - INSTRUCTION_SIZE as usize {
            return Err(Fault::new(FaultKind::PcOutOfBounds, 0, self.state.pc));
        }
        Ok(u16::from_be_bytes([
            self.state.memory[pc],
            self.state.memory[pc + 1],
        ]))
    }

    /// Runs one fetch-decode-execute cycle.
    /// The PC is advanced before executing so jump targets are absolute.
    pub fn fetch_and_execute(&mut self) -> Result<(), Fault> {
        let op = self.get_op()?;
        let pc = self.state.pc;
        if log::log_enabled!(log::Level::Trace) {
            trace!("{}", format_instruction_line(pc, op));
        }

        self.state.iteration_counter += 1;
        self.state.pc += INSTRUCTION_SIZE;

        (decode(op).execute)(&mut self.state, op)
    }

    /// Advances the timers by real elapsed time, then runs `instructions` cycles.
    pub fn step(&mut self, instructions: usize) -> Result<(), Fault> {
        self.step_at(Instant::now(), instructions)
    }

    /// `step` with an explicit notion of "now" for the timer clock.
    pub fn step_at(&mut self, now: Instant, instructions: usize) -> Result<(), Fault> {
        self.update_timers(now);
        for _ in 0..instructions {
            self.fetch_and_execute()?;
        }
        Ok(())
    }

    /// Runs one display frame's worth of instructions.
    pub fn step_frame(&mut self) -> Result<(), Fault> {
        self.step(DEFAULT_INSTRUCTIONS_PER_FRAME)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
