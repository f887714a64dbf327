use log::{info, warn};

use crate::constants::{INSTRUCTION_SIZE, MEMORY_SIZE, PROGRAM_START};
use crate::error::FaultKind;
use crate::instruction::{encode, Op};
use crate::opcode::Operands;
use crate::state::State;

/// What a `shift_forward` did to memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftReport {
    /// Bytes of the block that landed at their new address.
    pub moved: usize,
    /// Non-zero two-byte words among the moved bytes.
    pub moved_instructions: usize,
    /// Bytes that would have landed past the end of memory and were dropped.
    pub truncated: usize,
    /// Non-zero bytes among the dropped ones.
    pub lost_non_zero: usize,
    /// Non-zero bytes outside the block that the moved data landed on.
    pub overwritten_non_zero: usize,
}

/// Non-zero two-byte words in `bytes`; a trailing odd byte counts as a word.
fn count_instructions(bytes: &[u8]) -> usize {
    bytes
        .chunks(INSTRUCTION_SIZE as usize)
        .filter(|word| word.iter().any(|&b| b != 0))
        .count()
}

fn count_non_zero(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b != 0).count()
}

/// `0` means "the program origin" for the bulk operations.
fn block_start(start: usize) -> usize {
    if start == 0 {
        PROGRAM_START as usize
    } else {
        start
    }
}

/// # Program writer
/// Assembles instructions straight into machine memory.
///
/// Each method encodes one instruction through the opcode table, writes it big-endian
/// at `addr` and moves `addr` on by one instruction. Used to build test programs
/// and to patch loaded ROMs.
pub struct ProgramWriter<'a> {
    state: &'a mut State,
    pub addr: u16,
}

impl<'a> ProgramWriter<'a> {
    pub fn new(state: &'a mut State, start: u16) -> Self {
        ProgramWriter { state, addr: start }
    }

    /// A writer positioned at the program origin.
    pub fn at_program_start(state: &'a mut State) -> Self {
        Self::new(state, PROGRAM_START)
    }

    pub fn set_addr(&mut self, addr: u16) {
        self.addr = addr;
    }

    fn write(&mut self, id: Op, operands: Operands) -> Result<(), FaultKind> {
        let word = encode(id, operands);
        let range = self
            .state
            .memory_range(self.addr as usize, INSTRUCTION_SIZE as usize)?;
        self.state.memory[range].copy_from_slice(&word.to_be_bytes());
        self.addr += INSTRUCTION_SIZE;
        Ok(())
    }

    /// 0NNN
    pub fn sys(&mut self, nnn: u16) -> Result<(), FaultKind> {
        self.write(Op::Sys, Operands::nnn(nnn))
    }

    /// 00E0
    pub fn cls(&mut self) -> Result<(), FaultKind> {
        self.write(Op::Cls, Operands::default())
    }

    /// 00EE
    pub fn ret(&mut self) -> Result<(), FaultKind> {
        self.write(Op::Ret, Operands::default())
    }

    /// 1NNN
    pub fn jmp(&mut self, nnn: u16) -> Result<(), FaultKind> {
        self.write(Op::Jmp, Operands::nnn(nnn))
    }

    /// 2NNN
    pub fn call(&mut self, nnn: u16) -> Result<(), FaultKind> {
        self.write(Op::Call, Operands::nnn(nnn))
    }

    /// BNNN
    pub fn jmp_offset(&mut self, nnn: u16) -> Result<(), FaultKind> {
        self.write(Op::JmpOffset, Operands::nnn(nnn))
    }

    /// 3XNN
    pub fn skip_eq(&mut self, x: u8, nn: u8) -> Result<(), FaultKind> {
        self.write(Op::SkipEq, Operands::xnn(x, nn))
    }

    /// 4XNN
    pub fn skip_not_eq(&mut self, x: u8, nn: u8) -> Result<(), FaultKind> {
        self.write(Op::SkipNotEq, Operands::xnn(x, nn))
    }

    /// 5XY0
    pub fn skip_eq_reg(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::SkipEqRegister, Operands::xy(x, y))
    }

    /// 9XY0
    pub fn skip_not_eq_reg(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::SkipNotEqRegister, Operands::xy(x, y))
    }

    /// EX9E
    pub fn skip_pressed(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::SkipPressed, Operands::x(x))
    }

    /// EXA1
    pub fn skip_not_pressed(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::SkipNotPressed, Operands::x(x))
    }

    /// 6XNN
    pub fn ld_vx_byte(&mut self, x: u8, nn: u8) -> Result<(), FaultKind> {
        self.write(Op::SetRegister, Operands::xnn(x, nn))
    }

    /// 7XNN
    pub fn add_vx_byte(&mut self, x: u8, nn: u8) -> Result<(), FaultKind> {
        self.write(Op::AddToRegister, Operands::xnn(x, nn))
    }

    /// 8XY0
    pub fn ld_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::CopyRegister, Operands::xy(x, y))
    }

    /// 8XY1
    pub fn or_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::Or, Operands::xy(x, y))
    }

    /// 8XY2
    pub fn and_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::And, Operands::xy(x, y))
    }

    /// 8XY3
    pub fn xor_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::Xor, Operands::xy(x, y))
    }

    /// 8XY4
    pub fn add_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::Add, Operands::xy(x, y))
    }

    /// 8XY5
    pub fn sub_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::Sub, Operands::xy(x, y))
    }

    /// 8XY6; `y` only matters under the legacy shift quirk.
    pub fn shr_vx(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::Shr, Operands::xy(x, y))
    }

    /// 8XY7
    pub fn subn_vx_vy(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::SubN, Operands::xy(x, y))
    }

    /// 8XYE; `y` only matters under the legacy shift quirk.
    pub fn shl_vx(&mut self, x: u8, y: u8) -> Result<(), FaultKind> {
        self.write(Op::Shl, Operands::xy(x, y))
    }

    /// CXNN
    pub fn rnd_vx_byte(&mut self, x: u8, nn: u8) -> Result<(), FaultKind> {
        self.write(Op::Random, Operands::xnn(x, nn))
    }

    /// DXYN
    pub fn drw(&mut self, x: u8, y: u8, n: u8) -> Result<(), FaultKind> {
        self.write(Op::Draw, Operands::xyn(x, y, n))
    }

    /// ANNN
    pub fn ld_i_addr(&mut self, nnn: u16) -> Result<(), FaultKind> {
        self.write(Op::SetI, Operands::nnn(nnn))
    }

    /// FX1E
    pub fn add_i_vx(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::AddI, Operands::x(x))
    }

    /// FX29
    pub fn ld_f_vx(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::SetISprite, Operands::x(x))
    }

    /// FX33
    pub fn bcd_vx(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::StoreBcd, Operands::x(x))
    }

    /// FX55
    pub fn dump_vx(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::DumpRegisters, Operands::x(x))
    }

    /// FX65
    pub fn fill_vx(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::FillRegisters, Operands::x(x))
    }

    /// FX07
    pub fn ld_vx_dt(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::LoadDelay, Operands::x(x))
    }

    /// FX0A
    pub fn wait_key(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::WaitKey, Operands::x(x))
    }

    /// FX15
    pub fn set_delay(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::SetDelay, Operands::x(x))
    }

    /// FX18
    pub fn set_sound(&mut self, x: u8) -> Result<(), FaultKind> {
        self.write(Op::SetSound, Operands::x(x))
    }

    /// Moves `len` bytes starting at `start` towards higher addresses by `n` bytes
    /// and zeroes the bytes the block vacated.
    ///
    /// Only the part of the old block that the moved copy does not cover is zeroed.
    /// When `n` exceeds `len`, bytes between the end of the block and the
    /// destination are kept as they were.
    ///
    /// A `start` of 0 means the program origin and a `len` of 0 means "to the end
    /// of memory". Bytes that would be pushed past the end of memory are dropped.
    /// Both that and landing on non-zero bytes outside the block are logged as warnings.
    pub fn shift_forward(&mut self, start: usize, len: usize, n: usize) -> ShiftReport {
        let mut report = ShiftReport::default();
        let start = block_start(start);
        if n == 0 || start >= MEMORY_SIZE {
            return report;
        }

        let block_end = if len == 0 {
            MEMORY_SIZE
        } else {
            start + len.min(MEMORY_SIZE - start)
        };
        let memory = &mut self.state.memory;

        if n >= MEMORY_SIZE - start {
            report.truncated = block_end - start;
            report.lost_non_zero = count_non_zero(&memory[start..block_end]);
            memory[start..block_end].fill(0);
            warn!(
                "shift of {} bytes from {:#05X} runs past the end of memory, \
                 dropped {} non-zero bytes and moved nothing",
                n, start, report.lost_non_zero
            );
            return report;
        }

        let destination = start + n;
        let kept_end = block_end.min(MEMORY_SIZE - n);
        if kept_end < block_end {
            report.truncated = block_end - kept_end;
            report.lost_non_zero = count_non_zero(&memory[kept_end..block_end]);
            warn!(
                "{} bytes at the end of the block would run past the end of memory \
                 and were dropped ({} non-zero)",
                report.truncated, report.lost_non_zero
            );
        }

        let len = kept_end - start;
        report.moved = len;
        report.moved_instructions = count_instructions(&memory[start..kept_end]);
        report.overwritten_non_zero =
            count_non_zero(&memory[destination.max(block_end)..destination + len]);

        memory.copy_within(start..kept_end, destination);
        // Whatever of the old block the moved copy did not land on is vacated.
        memory[start..block_end.min(destination)].fill(0);

        if report.overwritten_non_zero > 0 {
            warn!(
                "{} non-zero bytes were overwritten during the shift",
                report.overwritten_non_zero
            );
        }
        info!(
            "block [{:#05X}, {:#05X}) shifted forward by {} bytes, {} non-zero instructions moved",
            start,
            start + len,
            n,
            report.moved_instructions
        );
        report
    }

    /// Zeroes `len` bytes from `start` and returns how many non-zero instructions were wiped.
    ///
    /// A `start` of 0 means the program origin. A range running past the end of
    /// memory is clamped with a warning.
    pub fn zero_instructions(&mut self, start: usize, len: usize) -> usize {
        let start = block_start(start);
        if start >= MEMORY_SIZE || len == 0 {
            return 0;
        }

        let mut end = start.saturating_add(len);
        if end > MEMORY_SIZE {
            warn!(
                "{}-byte clear at {:#05X} runs past the end of memory, truncated to {} bytes",
                len,
                start,
                MEMORY_SIZE - start
            );
            end = MEMORY_SIZE;
        }

        let region = &mut self.state.memory[start..end];
        let wiped = count_instructions(region);
        region.fill(0);

        info!(
            "cleared {} bytes in [{:#05X}, {:#05X}), wiped {} non-zero instructions",
            end - start,
            start,
            end,
            wiped
        );
        wiped
    }
}
