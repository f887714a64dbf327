pub use chip8::Chip8;
pub use error::{ConfigError, Fault, FaultKind, RomError};
pub use state::{AddIndexPolicy, Config, FrameBuffer, Quirks, State};
pub use writer::{ProgramWriter, ShiftReport};

mod chip8;
pub mod constants;
pub mod disasm;
mod error;
pub mod instruction;
pub mod opcode;
mod operations;
pub mod rom;
pub mod state;
pub mod writer;
