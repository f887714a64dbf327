use crate::constants::{INSTRUCTION_SIZE, PROGRAM_START};
use crate::instruction::{decode, Op, OpInfo};
use crate::opcode::Opcode;

/// Column the description is aligned to in a listing line.
const MNEMONIC_WIDTH: usize = 20;

/// A word that is not code, e.g. padding or sprite data.
fn data_word(op: u16) -> String {
    format!("DW  0x{:04X}", op)
}

/// Only `0NNN` words are machine code calls; anything else that fell through to
/// the catch-all is data.
fn is_data(info: &OpInfo, op: u16) -> bool {
    info.id == Op::Sys && (op == 0 || op & 0xF000 != 0)
}

/// Renders an opcode with its operands substituted into the mnemonic template.
/// Never fails: words that are not instructions render as a `DW` data marker.
pub fn disassemble(op: u16) -> String {
    let info = decode(op);
    if is_data(info, op) {
        return data_word(op);
    }

    info.template
        .replace("{NNN}", &format!("{:03X}", op.nnn()))
        .replace("{NN}", &format!("{:02X}", op.nn()))
        .replace("{X}", &format!("{:X}", op.x()))
        .replace("{Y}", &format!("{:X}", op.y()))
        .replace("{N}", &format!("{:X}", op.n()))
}

/// Plain-language effect of an instruction, for listings and traces.
pub fn describe(op: u16) -> Option<String> {
    let info = decode(op);
    if is_data(info, op) {
        return None;
    }

    let (x, y, n, nn, nnn) = (op.x(), op.y(), op.n(), op.nn(), op.nnn());
    let description = match info.id {
        Op::Cls => "Clear the display".to_string(),
        Op::Ret => "Return from sub-routine".to_string(),
        Op::Jmp => format!("Jump to address #{:03X}", nnn),
        Op::Call => format!("Call sub-routine at #{:03X}", nnn),
        Op::JmpOffset => format!("Jump to V0 + #{:03X}", nnn),
        Op::SkipEq => format!("Skip next if V{:X} == #{:02X}", x, nn),
        Op::SkipNotEq => format!("Skip next if V{:X} != #{:02X}", x, nn),
        Op::SkipEqRegister => format!("Skip next if V{:X} == V{:X}", x, y),
        Op::SkipNotEqRegister => format!("Skip next if V{:X} != V{:X}", x, y),
        Op::SkipPressed => format!("Skip next if key V{:X} pressed", x),
        Op::SkipNotPressed => format!("Skip next if key V{:X} NOT pressed", x),
        Op::SetRegister => format!("V{:X} <- #{:02X}", x, nn),
        Op::AddToRegister => format!("V{:X} += #{:02X}", x, nn),
        Op::CopyRegister => format!("V{:X} <- V{:X}", x, y),
        Op::Or => format!("V{:X} |= V{:X}", x, y),
        Op::And => format!("V{:X} &= V{:X}", x, y),
        Op::Xor => format!("V{:X} ^= V{:X}", x, y),
        Op::Add => format!("V{:X} += V{:X}   (VF = carry)", x, y),
        Op::Sub => format!("V{:X} -= V{:X}   (VF = !borrow)", x, y),
        Op::Shr => format!("V{:X} >>= 1      (VF = LSB before shift)", x),
        Op::SubN => format!("V{:X} = V{:X}-V{:X} (VF = !borrow)", x, y, x),
        Op::Shl => format!("V{:X} <<= 1      (VF = MSB before shift)", x),
        Op::SetI => format!("I <- #{:03X}", nnn),
        Op::AddI => format!("I += V{:X}", x),
        Op::SetISprite => format!("I <- sprite address for digit V{:X}", x),
        Op::StoreBcd => format!("Store BCD of V{:X} at I, I+1, I+2", x),
        Op::DumpRegisters => format!("Store V0..V{:X} to memory at I", x),
        Op::FillRegisters => format!("Load V0..V{:X} from memory at I", x),
        Op::LoadDelay => format!("V{:X} <- delay-timer", x),
        Op::WaitKey => format!("Wait for key-press, store in V{:X}", x),
        Op::SetDelay => format!("delay-timer <- V{:X}", x),
        Op::SetSound => format!("sound-timer <- V{:X}", x),
        Op::Random => format!("V{:X} <- (rand & #{:02X})", x, nn),
        Op::Draw => format!(
            "Draw 8x{:X} sprite at (V{:X},V{:X})   (VF = collision)",
            n, x, y
        ),
        Op::Sys => format!("Execute system call at #{:03X}", nnn),
    };
    Some(description)
}

/// `AAAA: <mnemonic>; <description>` with the description column aligned.
pub fn format_instruction_line(pc: u16, op: u16) -> String {
    let mnemonic = disassemble(op);
    match describe(op) {
        Some(description) => format!(
            "{:04X}: {:<width$}; {}",
            pc,
            mnemonic,
            description,
            width = MNEMONIC_WIDTH
        ),
        None => format!("{:04X}: {}", pc, mnemonic),
    }
}

/// One line per word, addressed from the program origin.
pub fn listing(words: &[u16]) -> String {
    let mut out = String::new();
    let mut pc = PROGRAM_START;
    for &op in words {
        out.push_str(&format_instruction_line(pc, op));
        out.push('\n');
        pc = pc.wrapping_add(INSTRUCTION_SIZE);
    }
    out
}
