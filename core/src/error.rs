use std::io;

use thiserror::Error;

/// What went wrong when the machine could not continue.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    #[error("no instruction matches this opcode")]
    UnknownOpcode,

    #[error("stack overflow: more than 16 nested calls")]
    StackOverflow,

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("memory access out of bounds at {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("program counter out of bounds")]
    PcOutOfBounds,

    #[error("key {0:#04X} is not on the keypad")]
    InvalidKey(u8),

    #[error("machine code routine at {address:#05X} is not supported")]
    SystemCall { address: u16 },
}

/// A fatal machine fault.
///
/// Chip-8 defines no recovery for these: they mean the loaded program is malformed
/// (or the interpreter is wrong). The step loop stops and hands the fault to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("fault at PC {pc:#06X} executing {opcode:#06X}: {kind}")]
pub struct Fault {
    pub kind: FaultKind,
    pub opcode: u16,
    /// Address of the faulting instruction (not the already-advanced PC).
    pub pc: u16,
}

impl Fault {
    pub fn new(kind: FaultKind, opcode: u16, pc: u16) -> Self {
        Fault { kind, opcode, pc }
    }
}

/// Machine configurations that cannot be loaded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("font sheet at {font_start:#05X} must end at or below {limit:#05X}")]
    FontOutsideReservedArea { font_start: u16, limit: u16 },
}

/// Failures reading or writing ROMs, listings and dumps.
/// These happen before the machine is touched and are recoverable.
#[derive(Error, Debug)]
pub enum RomError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("ROM has an odd length ({len} bytes); instructions are two bytes wide")]
    OddLength { len: usize },

    #[error("ROM is too large ({len} bytes), max size is {max} bytes")]
    TooLarge { len: usize, max: usize },
}
