use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_GLYPH_SIZE, INSTRUCTION_SIZE};
use crate::error::{Fault, FaultKind};
use crate::opcode::Opcode;
use crate::state::{AddIndexPolicy, State};

/// Wraps `kind` with the opcode and the address it was fetched from.
fn fault(state: &State, op: u16, kind: FaultKind) -> Fault {
    Fault::new(kind, op, state.pc.wrapping_sub(INSTRUCTION_SIZE))
}

fn skip_if(state: &mut State, condition: bool) {
    if condition {
        state.pc = state.pc.wrapping_add(INSTRUCTION_SIZE);
    }
}

/// Reads Vx as a keypad index.
fn key(state: &State, op: u16) -> Result<usize, Fault> {
    let key = state.v[op.x() as usize];
    if key > 0xF {
        return Err(fault(state, op, FaultKind::InvalidKey(key)));
    }
    Ok(key as usize)
}

/// clear
pub fn cls(state: &mut State, _op: u16) -> Result<(), Fault> {
    state.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    state.draw_flag = true;
    Ok(())
}

/// PC = STACK.pop()
pub fn rts(state: &mut State, op: u16) -> Result<(), Fault> {
    state.pc = state.pop().map_err(|kind| fault(state, op, kind))?;
    Ok(())
}

/// PC = addr
pub fn jump(state: &mut State, op: u16) -> Result<(), Fault> {
    state.pc = op.nnn();
    Ok(())
}

/// STACK.push(PC); PC = addr
pub fn call(state: &mut State, op: u16) -> Result<(), Fault> {
    let ret = state.pc;
    state.push(ret).map_err(|kind| fault(state, op, kind))?;
    state.pc = op.nnn();
    Ok(())
}

/// if Vx == nn then skip
pub fn ske(state: &mut State, op: u16) -> Result<(), Fault> {
    let condition = state.v[op.x() as usize] == op.nn();
    skip_if(state, condition);
    Ok(())
}

/// if Vx != nn then skip
pub fn skne(state: &mut State, op: u16) -> Result<(), Fault> {
    let condition = state.v[op.x() as usize] != op.nn();
    skip_if(state, condition);
    Ok(())
}

/// if Vx == Vy then skip
pub fn skre(state: &mut State, op: u16) -> Result<(), Fault> {
    let condition = state.v[op.x() as usize] == state.v[op.y() as usize];
    skip_if(state, condition);
    Ok(())
}

/// Vx = nn
pub fn load(state: &mut State, op: u16) -> Result<(), Fault> {
    state.v[op.x() as usize] = op.nn();
    Ok(())
}

/// Vx += nn
/// Overflow wraps and VF is left alone
pub fn add(state: &mut State, op: u16) -> Result<(), Fault> {
    let x = op.x() as usize;
    state.v[x] = state.v[x].wrapping_add(op.nn());
    Ok(())
}

/// Vx = Vy
pub fn mv(state: &mut State, op: u16) -> Result<(), Fault> {
    state.v[op.x() as usize] = state.v[op.y() as usize];
    Ok(())
}

/// Vx |= Vy
pub fn or(state: &mut State, op: u16) -> Result<(), Fault> {
    state.v[op.x() as usize] |= state.v[op.y() as usize];
    Ok(())
}

/// Vx &= Vy
pub fn and(state: &mut State, op: u16) -> Result<(), Fault> {
    state.v[op.x() as usize] &= state.v[op.y() as usize];
    Ok(())
}

/// Vx ^= Vy
pub fn xor(state: &mut State, op: u16) -> Result<(), Fault> {
    state.v[op.x() as usize] ^= state.v[op.y() as usize];
    Ok(())
}

/// Vx += Vy; VF = overflow
pub fn addr(state: &mut State, op: u16) -> Result<(), Fault> {
    let (res, over) = state.v[op.x() as usize].overflowing_add(state.v[op.y() as usize]);
    state.v[0xF] = over as u8;
    state.v[op.x() as usize] = res;
    Ok(())
}

/// Vx -= Vy; VF = !underflow
pub fn sub(state: &mut State, op: u16) -> Result<(), Fault> {
    let (res, under) = state.v[op.x() as usize].overflowing_sub(state.v[op.y() as usize]);
    state.v[0xF] = !under as u8;
    state.v[op.x() as usize] = res;
    Ok(())
}

/// Value a shift operates on: Vy copied into Vx under the legacy quirk, otherwise Vx.
fn shift_operand(state: &mut State, op: u16) -> u8 {
    if state.config.quirks.legacy_shift {
        state.v[op.x() as usize] = state.v[op.y() as usize];
    }
    state.v[op.x() as usize]
}

/// Vx >>= 1; VF = shifted out bit
pub fn shr(state: &mut State, op: u16) -> Result<(), Fault> {
    let value = shift_operand(state, op);
    state.v[0xF] = value & 0x1;
    state.v[op.x() as usize] = value >> 1;
    Ok(())
}

/// Vx = Vy - Vx; VF = !underflow
pub fn subn(state: &mut State, op: u16) -> Result<(), Fault> {
    let (res, under) = state.v[op.y() as usize].overflowing_sub(state.v[op.x() as usize]);
    state.v[0xF] = !under as u8;
    state.v[op.x() as usize] = res;
    Ok(())
}

/// Vx <<= 1; VF = shifted out bit
pub fn shl(state: &mut State, op: u16) -> Result<(), Fault> {
    let value = shift_operand(state, op);
    state.v[0xF] = value >> 7;
    state.v[op.x() as usize] = value << 1;
    Ok(())
}

/// if Vx != Vy then skip
pub fn skrne(state: &mut State, op: u16) -> Result<(), Fault> {
    let condition = state.v[op.x() as usize] != state.v[op.y() as usize];
    skip_if(state, condition);
    Ok(())
}

/// I = addr
pub fn loadi(state: &mut State, op: u16) -> Result<(), Fault> {
    state.i = op.nnn();
    Ok(())
}

/// PC = V0 + addr
pub fn jumpi(state: &mut State, op: u16) -> Result<(), Fault> {
    state.pc = op.nnn() + u16::from(state.v[0x0]);
    Ok(())
}

/// Vx = rand_byte & nn
pub fn rand(state: &mut State, op: u16) -> Result<(), Fault> {
    let rand_byte: u8 = rand::random();
    state.v[op.x() as usize] = rand_byte & op.nn();
    Ok(())
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n at position x, y on the FrameBuffer with wrapping.
/// Sets VF if any pixel is erased anywhere in the sprite
pub fn draw(state: &mut State, op: u16) -> Result<(), Fault> {
    let rows = state
        .memory_range(state.i as usize, op.n() as usize)
        .map_err(|kind| fault(state, op, kind))?;
    let x0 = state.v[op.x() as usize] as usize % DISPLAY_WIDTH;
    let y0 = state.v[op.y() as usize] as usize % DISPLAY_HEIGHT;

    let mut collision = 0;
    for (row, address) in rows.enumerate() {
        let sprite = state.memory[address];
        let y = (y0 + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let x = (x0 + bit) % DISPLAY_WIDTH;
            let pixel = (sprite >> (7 - bit)) & 1;
            collision |= pixel & state.frame_buffer[y][x];
            state.frame_buffer[y][x] ^= pixel;
        }
    }

    state.v[0xF] = collision;
    state.draw_flag = true;
    Ok(())
}

/// if Vx.pressed then skip
pub fn skpr(state: &mut State, op: u16) -> Result<(), Fault> {
    let key = key(state, op)?;
    let condition = state.keypad[key];
    skip_if(state, condition);
    Ok(())
}

/// if !Vx.pressed then skip
pub fn skup(state: &mut State, op: u16) -> Result<(), Fault> {
    let key = key(state, op)?;
    let condition = !state.keypad[key];
    skip_if(state, condition);
    Ok(())
}

/// Vx = DT
pub fn moved(state: &mut State, op: u16) -> Result<(), Fault> {
    state.v[op.x() as usize] = state.delay_timer;
    Ok(())
}

/// await keypress for Vx
/// Without a fresh press the PC is rewound so this instruction runs again next cycle.
/// The latch is left set; the host clears it on its next input poll.
pub fn keyd(state: &mut State, op: u16) -> Result<(), Fault> {
    match state.just_pressed.iter().position(|&pressed| pressed) {
        Some(key) => state.v[op.x() as usize] = key as u8,
        None => state.pc = state.pc.wrapping_sub(INSTRUCTION_SIZE),
    }
    Ok(())
}

/// DT = Vx
pub fn loads(state: &mut State, op: u16) -> Result<(), Fault> {
    state.delay_timer = state.v[op.x() as usize];
    Ok(())
}

/// ST = Vx
pub fn ld(state: &mut State, op: u16) -> Result<(), Fault> {
    state.sound_timer = state.v[op.x() as usize];
    Ok(())
}

/// I += Vx
/// VF follows the configured add-to-index policy; I stays within 12 bits
pub fn addi(state: &mut State, op: u16) -> Result<(), Fault> {
    let sum = state.i.wrapping_add(u16::from(state.v[op.x() as usize]));
    match state.config.quirks.add_index {
        AddIndexPolicy::Untouched => {}
        AddIndexPolicy::Legacy => state.v[0xF] = (sum > 0x0FFF) as u8,
        AddIndexPolicy::FlushVf => state.v[0xF] = 0,
    }
    state.i = sum & 0x0FFF;
    Ok(())
}

/// I = font_start + (Vx & 0xF) * 5
/// Set I to the memory address of the glyph for the digit in Vx
pub fn ldspr(state: &mut State, op: u16) -> Result<(), Fault> {
    let digit = (state.v[op.x() as usize] & 0x0F) as usize;
    let glyph_size = FONT_GLYPH_SIZE as usize;
    let glyph = state
        .memory_range(state.config.font_start as usize + digit * glyph_size, glyph_size)
        .map_err(|kind| fault(state, op, kind))?;
    state.i = glyph.start as u16;
    Ok(())
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(state: &mut State, op: u16) -> Result<(), Fault> {
    let target = state
        .memory_range(state.i as usize, 3)
        .map_err(|kind| fault(state, op, kind))?;
    let value = state.v[op.x() as usize];
    state.memory[target].copy_from_slice(&[value / 100, value / 10 % 10, value % 10]);
    Ok(())
}

/// mem[I..=I+x] = V0..=Vx
/// Under the legacy quirk I is left at I+x+1
pub fn stor(state: &mut State, op: u16) -> Result<(), Fault> {
    let count = op.x() as usize + 1;
    let target = state
        .memory_range(state.i as usize, count)
        .map_err(|kind| fault(state, op, kind))?;
    state.memory[target].copy_from_slice(&state.v[..count]);
    if state.config.quirks.legacy_memory_dump {
        state.i += count as u16;
    }
    Ok(())
}

/// V0..=Vx = mem[I..=I+x]
/// Under the legacy quirk I is left at I+x+1
pub fn read(state: &mut State, op: u16) -> Result<(), Fault> {
    let count = op.x() as usize + 1;
    let source = state
        .memory_range(state.i as usize, count)
        .map_err(|kind| fault(state, op, kind))?;
    state.v[..count].copy_from_slice(&state.memory[source]);
    if state.config.quirks.legacy_memory_dump {
        state.i += count as u16;
    }
    Ok(())
}

/// 0NNN jumps into native machine code, which cannot be emulated.
/// Words claimed by nothing else land here too and are reported as unknown.
pub fn sys(state: &mut State, op: u16) -> Result<(), Fault> {
    let kind = if op & 0xF000 == 0 {
        FaultKind::SystemCall { address: op.nnn() }
    } else {
        FaultKind::UnknownOpcode
    };
    Err(fault(state, op, kind))
}

#[cfg(test)]
mod test_operations {
    use super::*;
    use crate::constants::{DEFAULT_FONT_START, SPRITE_SHEET};
    use crate::instruction::decode;
    use crate::state::Quirks;

    /// Executes `op` the way the step loop would: PC already advanced past it.
    fn exec(state: &mut State, op: u16) -> Result<(), Fault> {
        state.pc += 2;
        (decode(op).execute)(state, op)
    }

    fn state_with_font() -> State {
        let mut state = State::new();
        let start = DEFAULT_FONT_START as usize;
        state.memory[start..start + SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);
        state
    }

    #[test]
    fn test_00e0_cls() {
        let mut state = State::new();
        state.frame_buffer[0][0] = 1;
        state.frame_buffer[31][63] = 1;
        exec(&mut state, 0x00E0).unwrap();
        assert!(state.frame_buffer.iter().flatten().all(|&px| px == 0));
        assert!(state.draw_flag);
    }

    #[test]
    fn test_00ee_ret() {
        let mut state = State::new();
        state.push(0x0ABC).unwrap();
        exec(&mut state, 0x00EE).unwrap();
        assert_eq!(state.sp, None);
        assert_eq!(state.pc, 0x0ABC);
    }

    #[test]
    fn test_00ee_ret_underflows() {
        let mut state = State::new();
        let err = exec(&mut state, 0x00EE).unwrap_err();
        assert_eq!(err, Fault::new(FaultKind::StackUnderflow, 0x00EE, 0x0200));
    }

    #[test]
    fn test_0nnn_sys_faults() {
        let mut state = State::new();
        let err = exec(&mut state, 0x0123).unwrap_err();
        assert_eq!(err.kind, FaultKind::SystemCall { address: 0x123 });
        assert_eq!(err.pc, 0x0200);
    }

    #[test]
    fn test_unassigned_word_faults_as_unknown() {
        let mut state = State::new();
        let err = exec(&mut state, 0x5121).unwrap_err();
        assert_eq!(err.kind, FaultKind::UnknownOpcode);
        assert_eq!(err.opcode, 0x5121);
    }

    #[test]
    fn test_1nnn_jp() {
        let mut state = State::new();
        exec(&mut state, 0x1ABC).unwrap();
        assert_eq!(state.pc, 0x0ABC);
    }

    #[test]
    fn test_2nnn_call() {
        let mut state = State::new();
        state.pc = 0x0300;
        exec(&mut state, 0x2123).unwrap();
        assert_eq!(state.sp, Some(0));
        assert_eq!(state.stack[0], 0x0302);
        assert_eq!(state.pc, 0x0123);
    }

    #[test]
    fn test_2nnn_call_overflows() {
        let mut state = State::new();
        for _ in 0..16 {
            exec(&mut state, 0x2200).unwrap();
        }
        let err = exec(&mut state, 0x2200).unwrap_err();
        assert_eq!(err.kind, FaultKind::StackOverflow);
    }

    #[test]
    fn test_3xnn_se_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        exec(&mut state, 0x3111).unwrap();
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_3xnn_se_doesntskip() {
        let mut state = State::new();
        exec(&mut state, 0x3111).unwrap();
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_4xnn_sne_skips() {
        let mut state = State::new();
        exec(&mut state, 0x4111).unwrap();
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_4xnn_sne_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        exec(&mut state, 0x4111).unwrap();
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_5xy0_se_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        exec(&mut state, 0x5120).unwrap();
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_5xy0_se_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        exec(&mut state, 0x5120).unwrap();
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_6xnn_ld() {
        let mut state = State::new();
        exec(&mut state, 0x6122).unwrap();
        assert_eq!(state.v[0x1], 0x22);
    }

    #[test]
    fn test_7xnn_add_wraps_without_carry() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        state.v[0xF] = 0x7;
        exec(&mut state, 0x7102).unwrap();
        assert_eq!(state.v[0x1], 0x01);
        assert_eq!(state.v[0xF], 0x7);
    }

    #[test]
    fn test_8xy0_ld() {
        let mut state = State::new();
        state.v[0x2] = 0x1;
        exec(&mut state, 0x8120).unwrap();
        assert_eq!(state.v[0x1], 0x1);
    }

    #[test]
    fn test_8xy1_or() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        exec(&mut state, 0x8121).unwrap();
        assert_eq!(state.v[0x1], 0x7);
    }

    #[test]
    fn test_8xy2_and() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        exec(&mut state, 0x8122).unwrap();
        assert_eq!(state.v[0x1], 0x2);
    }

    #[test]
    fn test_8xy3_xor() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        exec(&mut state, 0x8123).unwrap();
        assert_eq!(state.v[0x1], 0x5);
    }

    #[test]
    fn test_8xy4_add_nocarry() {
        let mut state = State::new();
        state.v[0x1] = 0xEE;
        state.v[0x2] = 0x11;
        exec(&mut state, 0x8124).unwrap();
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy4_add_carry() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        state.v[0x2] = 0x11;
        exec(&mut state, 0x8124).unwrap();
        assert_eq!(state.v[0x1], 0x10);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x0A;
        state.v[0x2] = 0x05;
        exec(&mut state, 0x8125).unwrap();
        assert_eq!(state.v[0x1], 0x05);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x05;
        state.v[0x2] = 0x0A;
        exec(&mut state, 0x8125).unwrap();
        assert_eq!(state.v[0x1], 0xFB);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy5_sub_equal_operands_do_not_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x42;
        state.v[0x2] = 0x42;
        exec(&mut state, 0x8125).unwrap();
        assert_eq!(state.v[0x1], 0x00);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy6_shr_lsb() {
        let mut state = State::new();
        state.v[0x1] = 0x5;
        exec(&mut state, 0x8106).unwrap();
        assert_eq!(state.v[0x1], 0x2);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy6_shr_nolsb() {
        let mut state = State::new();
        state.v[0x1] = 0x4;
        exec(&mut state, 0x8106).unwrap();
        assert_eq!(state.v[0x1], 0x2);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr_modern_ignores_vy() {
        let mut state = State::new();
        state.v[0x1] = 0x8;
        state.v[0x2] = 0x3;
        exec(&mut state, 0x8126).unwrap();
        assert_eq!(state.v[0x1], 0x4);
        assert_eq!(state.v[0x2], 0x3);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr_legacy_shifts_vy() {
        let mut state = State::new();
        state.config.quirks = Quirks::cosmac_vip();
        state.v[0x1] = 0x8;
        state.v[0x2] = 0x3;
        exec(&mut state, 0x8126).unwrap();
        assert_eq!(state.v[0x1], 0x1);
        assert_eq!(state.v[0x2], 0x3);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_subn_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x33;
        exec(&mut state, 0x8127).unwrap();
        assert_eq!(state.v[0x1], 0x22);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_subn_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x12;
        state.v[0x2] = 0x11;
        exec(&mut state, 0x8127).unwrap();
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xye_shl_msb() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        exec(&mut state, 0x810E).unwrap();
        assert_eq!(state.v[0x1], 0xFE);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xye_shl_nomsb() {
        let mut state = State::new();
        state.v[0x1] = 0x4;
        exec(&mut state, 0x810E).unwrap();
        assert_eq!(state.v[0x1], 0x8);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xye_shl_legacy_shifts_vy() {
        let mut state = State::new();
        state.config.quirks.legacy_shift = true;
        state.v[0x1] = 0x01;
        state.v[0x2] = 0x81;
        exec(&mut state, 0x812E).unwrap();
        assert_eq!(state.v[0x1], 0x02);
        assert_eq!(state.v[0x2], 0x81);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy4_result_wins_over_flag_in_vf() {
        let mut state = State::new();
        state.v[0xF] = 0xFF;
        state.v[0x1] = 0x03;
        exec(&mut state, 0x8F14).unwrap();
        assert_eq!(state.v[0xF], 0x02);
    }

    #[test]
    fn test_9xy0_sne_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        exec(&mut state, 0x9120).unwrap();
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_9xy0_sne_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        exec(&mut state, 0x9120).unwrap();
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_annn_ld() {
        let mut state = State::new();
        exec(&mut state, 0xAABC).unwrap();
        assert_eq!(state.i, 0xABC);
    }

    #[test]
    fn test_bnnn_jp() {
        let mut state = State::new();
        state.v[0x0] = 0x2;
        exec(&mut state, 0xBABC).unwrap();
        assert_eq!(state.pc, 0xABE);
    }

    #[test]
    fn test_cxnn_rnd_respects_mask() {
        let mut state = State::new();
        for _ in 0..64 {
            exec(&mut state, 0xC10F).unwrap();
            assert_eq!(state.v[0x1] & 0xF0, 0);
        }
        exec(&mut state, 0xC100).unwrap();
        assert_eq!(state.v[0x1], 0);
    }

    #[test]
    fn test_dxyn_drw_draws() {
        let mut state = state_with_font();
        state.i = DEFAULT_FONT_START;
        state.v[0x0] = 0x1;
        // Draw the 0x0 glyph with a 1x 1y offset
        exec(&mut state, 0xD005).unwrap();
        let mut expected = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        expected[1][1..5].copy_from_slice(&[1, 1, 1, 1]);
        expected[2][1..5].copy_from_slice(&[1, 0, 0, 1]);
        expected[3][1..5].copy_from_slice(&[1, 0, 0, 1]);
        expected[4][1..5].copy_from_slice(&[1, 0, 0, 1]);
        expected[5][1..5].copy_from_slice(&[1, 1, 1, 1]);
        assert_eq!(state.frame_buffer, expected);
        assert_eq!(state.v[0xF], 0x0);
        assert!(state.draw_flag);
    }

    #[test]
    fn test_dxyn_drw_collides() {
        let mut state = state_with_font();
        state.i = DEFAULT_FONT_START;
        state.frame_buffer[0][0] = 1;
        exec(&mut state, 0xD001).unwrap();
        assert_eq!(state.v[0xF], 0x1);
        assert_eq!(state.frame_buffer[0][0], 0);
    }

    #[test]
    fn test_dxyn_drw_collision_is_per_sprite() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300..0x302].copy_from_slice(&[0x80, 0x80]);
        // only the first row collides; the second row must not reset VF
        state.frame_buffer[0][0] = 1;
        exec(&mut state, 0xD002).unwrap();
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_dxyn_drw_xors() {
        let mut state = state_with_font();
        state.i = DEFAULT_FONT_START;
        // 0 1 0 1 -> Set
        state.frame_buffer[0][0..4].copy_from_slice(&[0, 1, 0, 1]);
        // 1 1 1 1 -> Draw xor
        exec(&mut state, 0xD001).unwrap();
        assert_eq!(state.frame_buffer[0][0..4], [1, 0, 1, 0]);
    }

    #[test]
    fn test_dxyn_drw_wraps() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300] = 0xFF;
        state.v[0x1] = 63;
        state.v[0x2] = 31;
        exec(&mut state, 0xD121).unwrap();
        for x in [63, 0, 1, 2, 3, 4, 5, 6] {
            assert_eq!(state.frame_buffer[31][x], 1, "column {}", x);
        }
        assert_eq!(state.frame_buffer[31][7], 0);
        assert_eq!(state.v[0xF], 0);

        exec(&mut state, 0xD121).unwrap();
        assert!(state.frame_buffer.iter().flatten().all(|&px| px == 0));
        assert_eq!(state.v[0xF], 1);
    }

    #[test]
    fn test_dxyn_drw_start_coordinates_wrap() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300] = 0x80;
        state.v[0x1] = 64 + 3;
        state.v[0x2] = 32 + 2;
        exec(&mut state, 0xD121).unwrap();
        assert_eq!(state.frame_buffer[2][3], 1);
    }

    #[test]
    fn test_dxyn_drw_reading_past_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFE;
        let err = exec(&mut state, 0xD003).unwrap_err();
        assert!(matches!(err.kind, FaultKind::MemoryOutOfBounds { .. }));
    }

    #[test]
    fn test_ex9e_skp_skips() {
        let mut state = State::new();
        state.keypad[0xE] = true;
        state.v[0x1] = 0xE;
        exec(&mut state, 0xE19E).unwrap();
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_ex9e_skp_doesntskip() {
        let mut state = State::new();
        exec(&mut state, 0xE19E).unwrap();
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_ex9e_skp_invalid_key_faults() {
        let mut state = State::new();
        state.v[0x1] = 0x10;
        let err = exec(&mut state, 0xE19E).unwrap_err();
        assert_eq!(err.kind, FaultKind::InvalidKey(0x10));
    }

    #[test]
    fn test_exa1_sknp_skips() {
        let mut state = State::new();
        exec(&mut state, 0xE1A1).unwrap();
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_exa1_sknp_doesntskip() {
        let mut state = State::new();
        state.keypad[0xE] = true;
        state.v[0x1] = 0xE;
        exec(&mut state, 0xE1A1).unwrap();
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_exa1_sknp_invalid_key_faults() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        let err = exec(&mut state, 0xE1A1).unwrap_err();
        assert_eq!(err.kind, FaultKind::InvalidKey(0xFF));
    }

    #[test]
    fn test_fx07_ld() {
        let mut state = State::new();
        state.delay_timer = 0xF;
        exec(&mut state, 0xF107).unwrap();
        assert_eq!(state.v[0x1], 0xF);
    }

    #[test]
    fn test_fx0a_ld_rewinds_without_press() {
        let mut state = State::new();
        exec(&mut state, 0xF10A).unwrap();
        assert_eq!(state.pc, 0x0200);
    }

    #[test]
    fn test_fx0a_ld_takes_lowest_press() {
        let mut state = State::new();
        state.just_pressed[0x9] = true;
        state.just_pressed[0x4] = true;
        exec(&mut state, 0xF10A).unwrap();
        assert_eq!(state.v[0x1], 0x4);
        assert_eq!(state.pc, 0x0202);
        assert!(state.just_pressed[0x4]);
        assert!(state.just_pressed[0x9]);
    }

    #[test]
    fn test_fx0a_ld_ignores_held_keys() {
        let mut state = State::new();
        state.keypad[0x3] = true;
        exec(&mut state, 0xF10A).unwrap();
        assert_eq!(state.pc, 0x0200);
    }

    #[test]
    fn test_fx15_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xF;
        exec(&mut state, 0xF115).unwrap();
        assert_eq!(state.delay_timer, 0xF);
    }

    #[test]
    fn test_fx18_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xF;
        exec(&mut state, 0xF118).unwrap();
        assert_eq!(state.sound_timer, 0xF);
    }

    #[test]
    fn test_fx1e_add() {
        let mut state = State::new();
        state.i = 0x1;
        state.v[0x1] = 0x1;
        state.v[0xF] = 0x5;
        exec(&mut state, 0xF11E).unwrap();
        assert_eq!(state.i, 0x2);
        assert_eq!(state.v[0xF], 0x5);
    }

    #[test]
    fn test_fx1e_add_masks_to_12_bits() {
        let mut state = State::new();
        state.i = 0xFFF;
        state.v[0x1] = 0x2;
        state.v[0xF] = 0x5;
        exec(&mut state, 0xF11E).unwrap();
        assert_eq!(state.i, 0x001);
        assert_eq!(state.v[0xF], 0x5);
    }

    #[test]
    fn test_fx1e_add_legacy_flags_overflow() {
        let mut state = State::new();
        state.config.quirks = Quirks::amiga();
        state.i = 0xFFF;
        state.v[0x1] = 0x2;
        exec(&mut state, 0xF11E).unwrap();
        assert_eq!(state.i, 0x001);
        assert_eq!(state.v[0xF], 0x1);

        state.i = 0x100;
        exec(&mut state, 0xF11E).unwrap();
        assert_eq!(state.i, 0x102);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_fx1e_add_flush_clears_vf() {
        let mut state = State::new();
        state.config.quirks.add_index = AddIndexPolicy::FlushVf;
        state.i = 0xFFF;
        state.v[0x1] = 0x2;
        state.v[0xF] = 0x9;
        exec(&mut state, 0xF11E).unwrap();
        assert_eq!(state.i, 0x001);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_fx29_ld() {
        let mut state = State::new();
        state.v[0x1] = 0x2;
        exec(&mut state, 0xF129).unwrap();
        assert_eq!(state.i, DEFAULT_FONT_START + 0xA);
    }

    #[test]
    fn test_fx29_ld_uses_low_nibble_and_font_start() {
        let mut state = State::new();
        state.config.font_start = 0x000;
        state.v[0x1] = 0x1F;
        exec(&mut state, 0xF129).unwrap();
        assert_eq!(state.i, 0xF * 5);
    }

    #[test]
    fn test_fx29_ld_font_past_memory_faults() {
        let mut state = State::new();
        state.config.font_start = 0xFFF0;
        state.v[0xF] = 0x0F;
        let err = exec(&mut state, 0xFF29).unwrap_err();
        assert_eq!(
            err.kind,
            FaultKind::MemoryOutOfBounds {
                address: 0xFFF0 + 0xF * 5
            }
        );
        assert_eq!(err.pc, 0x200);
    }

    #[test]
    fn test_fx33_ld() {
        let mut state = State::new();
        // 0x7B -> 123
        state.v[0x1] = 0x7B;
        state.i = 0x300;
        exec(&mut state, 0xF133).unwrap();
        assert_eq!(state.memory[0x300..0x303], [0x1, 0x2, 0x3]);
    }

    #[test]
    fn test_fx33_ld_past_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFE;
        let err = exec(&mut state, 0xF133).unwrap_err();
        assert!(matches!(err.kind, FaultKind::MemoryOutOfBounds { .. }));
    }

    #[test]
    fn test_fx55_ld() {
        let mut state = State::new();
        state.i = 0x300;
        state.v[0x0..0x5].copy_from_slice(&[0x1, 0x2, 0x3, 0x4, 0x5]);
        exec(&mut state, 0xF455).unwrap();
        assert_eq!(state.memory[0x300..0x305], [0x1, 0x2, 0x3, 0x4, 0x5]);
        assert_eq!(state.i, 0x300);
    }

    #[test]
    fn test_fx55_ld_legacy_advances_i() {
        let mut state = State::new();
        state.config.quirks.legacy_memory_dump = true;
        state.i = 0x300;
        exec(&mut state, 0xF455).unwrap();
        assert_eq!(state.i, 0x305);
    }

    #[test]
    fn test_fx55_ld_fits_last_byte() {
        let mut state = State::new();
        state.i = 0xFFF;
        state.v[0x0] = 0xAA;
        exec(&mut state, 0xF055).unwrap();
        assert_eq!(state.memory[0xFFF], 0xAA);
    }

    #[test]
    fn test_fx55_ld_past_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFF;
        let err = exec(&mut state, 0xF155).unwrap_err();
        assert!(matches!(err.kind, FaultKind::MemoryOutOfBounds { .. }));
    }

    #[test]
    fn test_fx65_ld() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300..0x305].copy_from_slice(&[0x1, 0x2, 0x3, 0x4, 0x5]);
        exec(&mut state, 0xF465).unwrap();
        assert_eq!(state.v[0x0..0x5], [0x1, 0x2, 0x3, 0x4, 0x5]);
        assert_eq!(state.i, 0x300);
    }

    #[test]
    fn test_fx65_ld_legacy_advances_i() {
        let mut state = State::new();
        state.config.quirks = Quirks::cosmac_vip();
        state.i = 0x300;
        exec(&mut state, 0xF265).unwrap();
        assert_eq!(state.i, 0x303);
    }
}
