use crate::error::Fault;
use crate::opcode::Operands;
use crate::operations::*;
use crate::state::State;

/// Applies an instruction to the machine. The PC has already been advanced past it.
pub type ExecFn = fn(state: &mut State, op: u16) -> Result<(), Fault>;

/// Inverse of decoding: builds the opcode word from its operand fields.
pub type EncodeFn = fn(operands: Operands) -> u16;

/// Every instruction the interpreter knows, in decode priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Cls,
    Ret,
    Jmp,
    Call,
    SkipEq,
    SkipNotEq,
    SkipEqRegister,
    SetRegister,
    AddToRegister,
    CopyRegister,
    Or,
    And,
    Xor,
    Add,
    Sub,
    Shr,
    SubN,
    Shl,
    SkipNotEqRegister,
    SetI,
    JmpOffset,
    Random,
    Draw,
    SkipPressed,
    SkipNotPressed,
    LoadDelay,
    WaitKey,
    SetDelay,
    SetSound,
    AddI,
    SetISprite,
    StoreBcd,
    DumpRegisters,
    FillRegisters,
    /// 0NNN machine code routine. Also the catch-all: matches any word no
    /// other entry claims, so decoding is total.
    Sys,
}

/// One row of the opcode table.
#[derive(Clone, Copy, Debug)]
pub struct OpInfo {
    pub id: Op,
    pub mask: u16,
    pub pattern: u16,
    /// Mnemonic with `{X}`, `{Y}`, `{N}`, `{NN}` and `{NNN}` placeholders.
    pub template: &'static str,
    pub execute: ExecFn,
    pub encode: EncodeFn,
}

impl OpInfo {
    pub fn matches(&self, op: u16) -> bool {
        op & self.mask == self.pattern
    }
}

const fn x(operands: Operands) -> u16 {
    ((operands.x & 0xF) as u16) << 8
}

const fn y(operands: Operands) -> u16 {
    ((operands.y & 0xF) as u16) << 4
}

const fn n(operands: Operands) -> u16 {
    (operands.n & 0xF) as u16
}

const fn nn(operands: Operands) -> u16 {
    operands.nn as u16
}

const fn nnn(operands: Operands) -> u16 {
    operands.nnn & 0x0FFF
}

fn encode_cls(_: Operands) -> u16 {
    0x00E0
}
fn encode_ret(_: Operands) -> u16 {
    0x00EE
}
fn encode_jmp(o: Operands) -> u16 {
    0x1000 | nnn(o)
}
fn encode_call(o: Operands) -> u16 {
    0x2000 | nnn(o)
}
fn encode_skip_eq(o: Operands) -> u16 {
    0x3000 | x(o) | nn(o)
}
fn encode_skip_not_eq(o: Operands) -> u16 {
    0x4000 | x(o) | nn(o)
}
fn encode_skip_eq_register(o: Operands) -> u16 {
    0x5000 | x(o) | y(o)
}
fn encode_set_register(o: Operands) -> u16 {
    0x6000 | x(o) | nn(o)
}
fn encode_add_to_register(o: Operands) -> u16 {
    0x7000 | x(o) | nn(o)
}
fn encode_copy_register(o: Operands) -> u16 {
    0x8000 | x(o) | y(o)
}
fn encode_or(o: Operands) -> u16 {
    0x8001 | x(o) | y(o)
}
fn encode_and(o: Operands) -> u16 {
    0x8002 | x(o) | y(o)
}
fn encode_xor(o: Operands) -> u16 {
    0x8003 | x(o) | y(o)
}
fn encode_add(o: Operands) -> u16 {
    0x8004 | x(o) | y(o)
}
fn encode_sub(o: Operands) -> u16 {
    0x8005 | x(o) | y(o)
}
fn encode_shr(o: Operands) -> u16 {
    0x8006 | x(o) | y(o)
}
fn encode_subn(o: Operands) -> u16 {
    0x8007 | x(o) | y(o)
}
fn encode_shl(o: Operands) -> u16 {
    0x800E | x(o) | y(o)
}
fn encode_skip_not_eq_register(o: Operands) -> u16 {
    0x9000 | x(o) | y(o)
}
fn encode_set_i(o: Operands) -> u16 {
    0xA000 | nnn(o)
}
fn encode_jmp_offset(o: Operands) -> u16 {
    0xB000 | nnn(o)
}
fn encode_random(o: Operands) -> u16 {
    0xC000 | x(o) | nn(o)
}
fn encode_draw(o: Operands) -> u16 {
    0xD000 | x(o) | y(o) | n(o)
}
fn encode_skip_pressed(o: Operands) -> u16 {
    0xE09E | x(o)
}
fn encode_skip_not_pressed(o: Operands) -> u16 {
    0xE0A1 | x(o)
}
fn encode_load_delay(o: Operands) -> u16 {
    0xF007 | x(o)
}
fn encode_wait_key(o: Operands) -> u16 {
    0xF00A | x(o)
}
fn encode_set_delay(o: Operands) -> u16 {
    0xF015 | x(o)
}
fn encode_set_sound(o: Operands) -> u16 {
    0xF018 | x(o)
}
fn encode_add_i(o: Operands) -> u16 {
    0xF01E | x(o)
}
fn encode_set_i_sprite(o: Operands) -> u16 {
    0xF029 | x(o)
}
fn encode_store_bcd(o: Operands) -> u16 {
    0xF033 | x(o)
}
fn encode_dump_registers(o: Operands) -> u16 {
    0xF055 | x(o)
}
fn encode_fill_registers(o: Operands) -> u16 {
    0xF065 | x(o)
}
fn encode_sys(o: Operands) -> u16 {
    nnn(o)
}

macro_rules! op {
    ($id:ident, $mask:expr, $pattern:expr, $template:expr, $execute:ident, $encode:ident) => {
        OpInfo {
            id: Op::$id,
            mask: $mask,
            pattern: $pattern,
            template: $template,
            execute: $execute,
            encode: $encode,
        }
    };
}

#[rustfmt::skip]
const TABLE: [OpInfo; 35] = [
    op!(Cls,               0xFFFF, 0x00E0, "CLS",                 cls,        encode_cls),
    op!(Ret,               0xFFFF, 0x00EE, "RET",                 rts,        encode_ret),
    op!(Jmp,               0xF000, 0x1000, "JMP #{NNN}",          jump,       encode_jmp),
    op!(Call,              0xF000, 0x2000, "CAL #{NNN}",          call,       encode_call),
    op!(SkipEq,            0xF000, 0x3000, "SEQ V{X},#{NN}",      ske,        encode_skip_eq),
    op!(SkipNotEq,         0xF000, 0x4000, "SNE V{X},#{NN}",      skne,       encode_skip_not_eq),
    op!(SkipEqRegister,    0xF00F, 0x5000, "SER V{X},V{Y}",       skre,       encode_skip_eq_register),
    op!(SetRegister,       0xF000, 0x6000, "LDS V{X},#{NN}",      load,       encode_set_register),
    op!(AddToRegister,     0xF000, 0x7000, "ADR V{X},#{NN}",      add,        encode_add_to_register),
    op!(CopyRegister,      0xF00F, 0x8000, "LDC V{X},V{Y}",       mv,         encode_copy_register),
    op!(Or,                0xF00F, 0x8001, "ORR V{X},V{Y}",       or,         encode_or),
    op!(And,               0xF00F, 0x8002, "AND V{X},V{Y}",       and,        encode_and),
    op!(Xor,               0xF00F, 0x8003, "XOR V{X},V{Y}",       xor,        encode_xor),
    op!(Add,               0xF00F, 0x8004, "ADD V{X},V{Y}",       addr,       encode_add),
    op!(Sub,               0xF00F, 0x8005, "SUB V{X},V{Y}",       sub,        encode_sub),
    op!(Shr,               0xF00F, 0x8006, "SHR V{X}",            shr,        encode_shr),
    op!(SubN,              0xF00F, 0x8007, "SBN V{X},V{Y}",       subn,       encode_subn),
    op!(Shl,               0xF00F, 0x800E, "SHL V{X}",            shl,        encode_shl),
    op!(SkipNotEqRegister, 0xF00F, 0x9000, "SNR V{X},V{Y}",       skrne,      encode_skip_not_eq_register),
    op!(SetI,              0xF000, 0xA000, "LDI I,#{NNN}",        loadi,      encode_set_i),
    op!(JmpOffset,         0xF000, 0xB000, "JMO V0,#{NNN}",       jumpi,      encode_jmp_offset),
    op!(Random,            0xF000, 0xC000, "RND V{X},#{NN}",      rand,       encode_random),
    op!(Draw,              0xF000, 0xD000, "DRW V{X},V{Y},#{N}",  draw,       encode_draw),
    op!(SkipPressed,       0xF0FF, 0xE09E, "SKP V{X}",            skpr,       encode_skip_pressed),
    op!(SkipNotPressed,    0xF0FF, 0xE0A1, "SKN V{X}",            skup,       encode_skip_not_pressed),
    op!(LoadDelay,         0xF0FF, 0xF007, "LDD V{X},DT",         moved,      encode_load_delay),
    op!(WaitKey,           0xF0FF, 0xF00A, "LDK V{X},K",          keyd,       encode_wait_key),
    op!(SetDelay,          0xF0FF, 0xF015, "SDD V{X}",            loads,      encode_set_delay),
    op!(SetSound,          0xF0FF, 0xF018, "SDT ST,V{X}",         ld,         encode_set_sound),
    op!(AddI,              0xF0FF, 0xF01E, "ADI I,V{X}",          addi,       encode_add_i),
    op!(SetISprite,        0xF0FF, 0xF029, "LDP F,V{X}",          ldspr,      encode_set_i_sprite),
    op!(StoreBcd,          0xF0FF, 0xF033, "BCD B,V{X}",          bcd,        encode_store_bcd),
    op!(DumpRegisters,     0xF0FF, 0xF055, "VXD [I],V{X}",        stor,       encode_dump_registers),
    op!(FillRegisters,     0xF0FF, 0xF065, "VXL V{X},[I]",        read,       encode_fill_registers),
    op!(Sys,               0x0000, 0x0000, "SYS #{NNN}",          sys,        encode_sys),
];

/// The opcode table, scanned in order by `decode`.
pub static OPS: [OpInfo; 35] = TABLE;

/// Entries sit at the index of their `Op` discriminant, so lookup by identity is direct.
const fn is_indexed_by_id(ops: &[OpInfo]) -> bool {
    let mut i = 0;
    while i < ops.len() {
        if ops[i].id as usize != i {
            return false;
        }
        i += 1;
    }
    true
}

/// The first three characters of every mnemonic are distinct.
const fn has_unique_mnemonics(ops: &[OpInfo]) -> bool {
    let mut i = 0;
    while i < ops.len() {
        let a = ops[i].template.as_bytes();
        if a.len() < 3 {
            return false;
        }
        let mut j = i + 1;
        while j < ops.len() {
            let b = ops[j].template.as_bytes();
            if b.len() < 3 || (a[0] == b[0] && a[1] == b[1] && a[2] == b[2]) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

/// No word is claimed by two entries, the `Sys` catch-all aside.
///
/// Two (mask, pattern) pairs overlap exactly when their patterns agree on every
/// bit both masks fix; `a.pattern | b.pattern` is then a word matching both.
const fn has_no_conflicts(ops: &[OpInfo]) -> bool {
    let mut i = 0;
    while i < ops.len() {
        let mut j = i + 1;
        while j < ops.len() {
            let (a, b) = (&ops[i], &ops[j]);
            if !matches!(a.id, Op::Sys) && !matches!(b.id, Op::Sys) {
                let probe = a.pattern | b.pattern;
                if probe & a.mask == a.pattern && probe & b.mask == b.pattern {
                    return false;
                }
            }
            j += 1;
        }
        i += 1;
    }
    true
}

/// Every entry's pattern only uses bits its mask fixes, otherwise it could never match.
const fn patterns_within_masks(ops: &[OpInfo]) -> bool {
    let mut i = 0;
    while i < ops.len() {
        if ops[i].pattern & !ops[i].mask != 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// The catch-all must be tried last.
const fn sys_is_last(ops: &[OpInfo]) -> bool {
    !ops.is_empty() && matches!(ops[ops.len() - 1].id, Op::Sys) && ops[ops.len() - 1].mask == 0
}

const _: () = assert!(is_indexed_by_id(&TABLE), "OPS must be ordered like Op");
const _: () = assert!(has_unique_mnemonics(&TABLE), "duplicate 3-letter mnemonics in OPS");
const _: () = assert!(has_no_conflicts(&TABLE), "decode table has overlapping entries");
const _: () = assert!(patterns_within_masks(&TABLE), "pattern has bits outside its mask");
const _: () = assert!(sys_is_last(&TABLE), "SYS catch-all must be the last entry");

/// Selects the table entry for a given opcode.
/// Total: any word no other entry claims falls through to the `Sys` catch-all.
pub fn decode(op: u16) -> &'static OpInfo {
    OPS.iter()
        .find(|info| info.matches(op))
        .unwrap_or(&OPS[Op::Sys as usize])
}

/// Looks up an entry by instruction identity rather than by decoding.
pub fn find_op(id: Op) -> &'static OpInfo {
    &OPS[id as usize]
}

/// Encodes `id` with the given operands.
pub fn encode(id: Op, operands: Operands) -> u16 {
    (find_op(id).encode)(operands)
}
