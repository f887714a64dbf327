use std::ops::Range;
use std::time::Instant;

use crate::constants::{
    DEFAULT_FONT_START, DISPLAY_HEIGHT, DISPLAY_WIDTH, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET,
    STACK_DEPTH,
};
use crate::error::{ConfigError, FaultKind};

/// The FrameBuffer is indexed as [y][x]; every cell is 0 or 1.
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// How `FX1E` (I += Vx) treats VF.
///
/// Historical interpreters disagree; the three behaviours are mutually exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddIndexPolicy {
    /// COSMAC VIP: VF is left alone.
    #[default]
    Untouched,
    /// Amiga: VF = 1 when I overflows past 0xFFF, otherwise 0.
    /// Spacefight 2091! relies on this.
    Legacy,
    /// VF is cleared unconditionally.
    FlushVf,
}

/// Behavioural toggles reproducing divergent historical interpreters.
///
/// Fixed for the life of a loaded program; swap them between loads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quirks {
    /// `8XY6`/`8XYE` copy Vy into Vx before shifting (COSMAC VIP).
    /// Otherwise Vx shifts in place and Vy is ignored (CHIP-48 onwards).
    pub legacy_shift: bool,
    pub add_index: AddIndexPolicy,
    /// `FX55`/`FX65` leave I pointing one past the last register touched.
    pub legacy_memory_dump: bool,
}

impl Quirks {
    /// CHIP-48 / SUPER-CHIP era behaviour.
    pub fn modern() -> Self {
        Self::default()
    }

    /// The original RCA COSMAC VIP interpreter.
    pub fn cosmac_vip() -> Self {
        Quirks {
            legacy_shift: true,
            add_index: AddIndexPolicy::Untouched,
            legacy_memory_dump: true,
        }
    }

    /// The Amiga interpreter, which flags index overflow in VF.
    pub fn amiga() -> Self {
        Quirks {
            add_index: AddIndexPolicy::Legacy,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub quirks: Quirks,
    /// Where `initialise` copies the sprite sheet and where `FX29` points I.
    pub font_start: u16,
}

impl Config {
    /// The whole sprite sheet must sit in the reserved area below the program origin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.font_start as usize + SPRITE_SHEET.len() > PROGRAM_START as usize {
            return Err(ConfigError::FontOutsideReservedArea {
                font_start: self.font_start,
                limit: PROGRAM_START,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            quirks: Quirks::default(),
            font_start: DEFAULT_FONT_START,
        }
    }
}

/// The Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry/borrow/collision flag
/// - (i) a 16-bit memory address register, kept to 12 bits
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Stack
/// - 16 return addresses
/// - (sp) index of the top entry, `None` while empty so that slot 0 is never
///   both "empty" and "one entry"
///
/// Timers
/// - 2 8-bit timers (delay & sound) counting down at 60Hz of wall time
/// - a beep plays for as long as the sound timer is non-zero
///
/// ## Memory
/// - 4096 bytes of addressable memory
///     - 0x000..0x200 is reserved; the font lives there
///     - programs are loaded at 0x200
/// - 32x64 frame buffer
///
/// ## Input
/// - `keypad` tracks which of keys 0..F are held
/// - `just_pressed` latches presses until the next input poll so FX0A never
///   misses a tap shorter than a frame
#[derive(Clone)]
pub struct State {
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub pc: u16,
    pub i: u16,
    pub v: [u8; 16],
    pub stack: [u16; STACK_DEPTH],
    pub sp: Option<usize>,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub last_timer_update: Instant,
    pub keypad: [bool; 16],
    pub just_pressed: [bool; 16],
    pub config: Config,
    pub iteration_counter: u64,
}

impl State {
    pub fn new() -> Self {
        State {
            memory: [0; MEMORY_SIZE],
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            pc: PROGRAM_START,
            i: 0,
            v: [0; 16],
            stack: [0; STACK_DEPTH],
            sp: None,
            delay_timer: 0,
            sound_timer: 0,
            last_timer_update: Instant::now(),
            keypad: [false; 16],
            just_pressed: [false; 16],
            config: Config::default(),
            iteration_counter: 0,
        }
    }

    /// Number of return addresses currently on the stack.
    pub fn stack_depth(&self) -> usize {
        self.sp.map_or(0, |top| top + 1)
    }

    pub fn push(&mut self, address: u16) -> Result<(), FaultKind> {
        let top = self.sp.map_or(0, |top| top + 1);
        if top >= STACK_DEPTH {
            return Err(FaultKind::StackOverflow);
        }
        self.stack[top] = address;
        self.sp = Some(top);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, FaultKind> {
        let top = self.sp.ok_or(FaultKind::StackUnderflow)?;
        self.sp = top.checked_sub(1);
        Ok(self.stack[top])
    }

    /// Bounds-checked range of `len` bytes starting at `start`.
    pub fn memory_range(&self, start: usize, len: usize) -> Result<Range<usize>, FaultKind> {
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(FaultKind::MemoryOutOfBounds {
                address: MEMORY_SIZE.max(start),
            });
        }
        Ok(start..end)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
