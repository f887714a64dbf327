/// # Operand fields
///
/// Every instruction is one big-endian word `[c x y n]`. The leading nibble `c`
/// picks a family and, together with the masks in the opcode table, the instruction;
/// the remaining nibbles carry its operands:
/// - `x` and `y` name registers (`x` is also the upper bound of the V0..Vx block moves)
/// - `n` is a 4-bit immediate, the height of a sprite
/// - `nn` is the low byte, an 8-bit immediate
/// - `nnn` is the low 12 bits, an address
///
/// Fields are extracted regardless of whether the instruction uses them.
pub trait Opcode {
    /// `[_x__]`
    fn x(&self) -> u8;

    /// `[__y_]`
    fn y(&self) -> u8;

    /// `[___n]`
    fn n(&self) -> u8;

    /// `[__nn]`
    fn nn(&self) -> u8;

    /// `[_nnn]`
    fn nnn(&self) -> u16;

    /// All operand fields at once, as consumed by the encoders.
    fn operands(&self) -> Operands {
        Operands {
            x: self.x(),
            y: self.y(),
            n: self.n(),
            nn: self.nn(),
            nnn: self.nnn(),
        }
    }
}

impl Opcode for u16 {
    fn x(&self) -> u8 {
        (self >> 8 & 0xF) as u8
    }

    fn y(&self) -> u8 {
        (self >> 4 & 0xF) as u8
    }

    fn n(&self) -> u8 {
        (self & 0xF) as u8
    }

    fn nn(&self) -> u8 {
        (self & 0xFF) as u8
    }

    fn nnn(&self) -> u16 {
        self & 0xFFF
    }
}

/// Operand fields handed to an instruction encoder.
///
/// Encoders only read the fields their instruction uses and mask them to width,
/// so unused fields can be left at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Operands {
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Operands {
    pub fn x(x: u8) -> Self {
        Operands {
            x,
            ..Self::default()
        }
    }

    pub fn xy(x: u8, y: u8) -> Self {
        Operands {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn xyn(x: u8, y: u8, n: u8) -> Self {
        Operands {
            x,
            y,
            n,
            ..Self::default()
        }
    }

    pub fn xnn(x: u8, nn: u8) -> Self {
        Operands {
            x,
            nn,
            ..Self::default()
        }
    }

    pub fn nnn(nnn: u16) -> Self {
        Operands {
            nnn,
            ..Self::default()
        }
    }
}
