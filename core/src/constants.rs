use std::time::Duration;

/// Bytes of addressable memory (0x000..=0xFFF).
pub const MEMORY_SIZE: usize = 4096;

/// Where ROMs are loaded and where execution begins.
/// Everything below this address is reserved for the interpreter and font data.
pub const PROGRAM_START: u16 = 0x200;

/// Largest ROM that fits between `PROGRAM_START` and the end of memory.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

/// Default location of the font sprite sheet inside the reserved area.
pub const DEFAULT_FONT_START: u16 = 0x050;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Historical nesting limit for subroutine calls.
pub const STACK_DEPTH: usize = 16;

/// Every instruction is exactly one big-endian word.
pub const INSTRUCTION_SIZE: u16 = 2;

/// The delay and sound timers count down at 60Hz regardless of CPU speed.
pub const TIMER_TICK: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Instructions executed per `step_frame`; roughly 660 instructions per second at 60fps.
pub const DEFAULT_INSTRUCTIONS_PER_FRAME: usize = 11;

/// Bytes used by each glyph in the sprite sheet.
pub const FONT_GLYPH_SIZE: u16 = 5;

/// # Sprite sheet
/// Hexadecimal digits 0..F, each 4 pixels wide and 5 rows tall.
/// Only the high nibble of each row byte is used.
pub const SPRITE_SHEET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
