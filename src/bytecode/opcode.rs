//! Opcode Field Definitions
//!
//! The opcode byte is split on its 3 low bits (the instruction class), and
//! the remaining 5 bits are interpreted per class:
//!
//! ```text
//! ALU, JMP:
//!   +----------------+--------+--------------------+
//!   |     4 bits     | 1 bit  |       3 bits       |
//!   | operation code | source | instruction class  |
//!   +----------------+--------+--------------------+
//!   (MSB)                                     (LSB)
//!
//! LD, LDX, ST, STX:
//!   +--------+--------+--------------------+
//!   | 3 bits | 2 bits |       3 bits       |
//!   |  mode  |  size  | instruction class  |
//!   +--------+--------+--------------------+
//!   (MSB)                             (LSB)
//! ```
//!
//! Every field is a closed enum with a fallible conversion from its raw bit
//! pattern, so an out-of-range pattern is a typed decode error rather than a
//! panic. The raw codes here are the unshifted field values; shifting into
//! opcode-byte position happens only in the codec.

use core::fmt;

/// Instruction class (bits 0-2 of the opcode byte).
///
/// Raw values 6 and 7 do not name a class and fail decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Class {
    /// Packet load into R0
    Ld = 0,
    /// Register load (recognized, not executable)
    Ldx = 1,
    /// Store immediate (recognized, not executable)
    St = 2,
    /// Store register (recognized, not executable)
    Stx = 3,
    /// Arithmetic/logic operations
    Alu = 4,
    /// Jumps and exit
    Jmp = 5,
}

impl Class {
    /// Try to extract a class from its raw 3-bit value.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ld),
            1 => Some(Self::Ldx),
            2 => Some(Self::St),
            3 => Some(Self::Stx),
            4 => Some(Self::Alu),
            5 => Some(Self::Jmp),
            _ => None,
        }
    }

    /// Get the raw 3-bit class value.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Narrow to a memory class, if this is one.
    #[inline]
    pub const fn mem_class(self) -> Option<MemClass> {
        match self {
            Self::Ld => Some(MemClass::Ld),
            Self::Ldx => Some(MemClass::Ldx),
            Self::St => Some(MemClass::St),
            Self::Stx => Some(MemClass::Stx),
            Self::Alu | Self::Jmp => None,
        }
    }
}

/// The four memory instruction classes.
///
/// Kept separate from [`Class`] so an instruction's size/mode fields can only
/// coexist with a memory class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemClass {
    Ld = 0,
    Ldx = 1,
    St = 2,
    Stx = 3,
}

impl MemClass {
    /// Try to extract a memory class from its raw 3-bit class value.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ld),
            1 => Some(Self::Ldx),
            2 => Some(Self::St),
            3 => Some(Self::Stx),
            _ => None,
        }
    }

    /// Widen back to the full class enumeration.
    #[inline]
    pub const fn class(self) -> Class {
        match self {
            Self::Ld => Class::Ld,
            Self::Ldx => Class::Ldx,
            Self::St => Class::St,
            Self::Stx => Class::Stx,
        }
    }
}

/// Second-operand source for ALU and JMP instructions (bit 3 of the opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Source {
    /// Operand is the instruction's immediate
    Imm = 0,
    /// Operand is read from the source register
    Reg = 1,
}

impl Source {
    /// Extract the source type from its raw bit.
    #[inline]
    pub const fn from_raw(value: u8) -> Self {
        if value & 1 != 0 { Self::Reg } else { Self::Imm }
    }

    /// Get the raw bit value.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

/// ALU operation codes (raw field values 0-13).
///
/// `End` occupies a valid bit pattern but is not implemented: the codec
/// rejects it and the interpreter faults if a programmatically built
/// instruction carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AluOp {
    /// dst += right
    Add = 0,
    /// dst -= right
    Sub = 1,
    /// dst *= right
    Mul = 2,
    /// dst /= right (0 when right == 0)
    Div = 3,
    /// dst |= right
    Or = 4,
    /// dst &= right
    And = 5,
    /// dst <<= right
    Lsh = 6,
    /// dst >>= right (logical)
    Rsh = 7,
    /// dst = -dst
    Neg = 8,
    /// dst %= right (0 when right == 0)
    Mod = 9,
    /// dst ^= right
    Xor = 10,
    /// dst = right
    Mov = 11,
    /// dst >>= right (arithmetic)
    Arsh = 12,
    /// Byte swap placeholder, unimplemented
    End = 13,
}

impl AluOp {
    /// Try to extract an ALU operation from its raw 4-bit code.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Add),
            1 => Some(Self::Sub),
            2 => Some(Self::Mul),
            3 => Some(Self::Div),
            4 => Some(Self::Or),
            5 => Some(Self::And),
            6 => Some(Self::Lsh),
            7 => Some(Self::Rsh),
            8 => Some(Self::Neg),
            9 => Some(Self::Mod),
            10 => Some(Self::Xor),
            11 => Some(Self::Mov),
            12 => Some(Self::Arsh),
            13 => Some(Self::End),
            _ => None,
        }
    }

    /// Get the raw 4-bit operation code.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Check whether this operation is an unimplemented placeholder.
    #[inline]
    pub const fn is_unimplemented(self) -> bool {
        matches!(self, Self::End)
    }

    /// MOV ignores the left operand, so `dst` may be uninitialized.
    #[inline]
    pub const fn ignores_left(self) -> bool {
        matches!(self, Self::Mov)
    }

    /// NEG ignores the right operand.
    #[inline]
    pub const fn ignores_right(self) -> bool {
        matches!(self, Self::Neg)
    }
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Or => "or",
            Self::And => "and",
            Self::Lsh => "lsh",
            Self::Rsh => "rsh",
            Self::Neg => "neg",
            Self::Mod => "mod",
            Self::Xor => "xor",
            Self::Mov => "mov",
            Self::Arsh => "arsh",
            Self::End => "end",
        };
        write!(f, "{}", s)
    }
}

/// Jump operation codes (raw field values 0-9).
///
/// `Call` is the unimplemented placeholder of this family; `Exit` terminates
/// the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JmpOp {
    /// Unconditional jump
    Ja = 0,
    /// left == right
    Jeq = 1,
    /// left > right, unsigned
    Jgt = 2,
    /// left >= right, unsigned
    Jge = 3,
    /// left & right != 0
    Jset = 4,
    /// left != right
    Jne = 5,
    /// left > right, signed
    Jsgt = 6,
    /// left >= right, signed
    Jsge = 7,
    /// Function call placeholder, unimplemented
    Call = 8,
    /// Terminate, verdict in R0
    Exit = 9,
}

impl JmpOp {
    /// Try to extract a jump operation from its raw 4-bit code.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ja),
            1 => Some(Self::Jeq),
            2 => Some(Self::Jgt),
            3 => Some(Self::Jge),
            4 => Some(Self::Jset),
            5 => Some(Self::Jne),
            6 => Some(Self::Jsgt),
            7 => Some(Self::Jsge),
            8 => Some(Self::Call),
            9 => Some(Self::Exit),
            _ => None,
        }
    }

    /// Get the raw 4-bit operation code.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Check whether this operation is an unimplemented placeholder.
    #[inline]
    pub const fn is_unimplemented(self) -> bool {
        matches!(self, Self::Call)
    }

    /// JA and EXIT read neither operand.
    #[inline]
    pub const fn reads_operands(self) -> bool {
        !matches!(self, Self::Ja | Self::Exit)
    }

    /// Check whether this jump compares as unsigned 32-bit.
    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::Jgt | Self::Jge)
    }
}

impl fmt::Display for JmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ja => "ja",
            Self::Jeq => "jeq",
            Self::Jgt => "jgt",
            Self::Jge => "jge",
            Self::Jset => "jset",
            Self::Jne => "jne",
            Self::Jsgt => "jsgt",
            Self::Jsge => "jsge",
            Self::Call => "call",
            Self::Exit => "exit",
        };
        write!(f, "{}", s)
    }
}

/// Memory access width (bits 3-4 of the opcode byte for memory classes).
///
/// Raw value 3 does not name a width and fails decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemSize {
    /// 8-bit, zero-extended
    Byte = 0,
    /// 16-bit big-endian, zero-extended
    Half = 1,
    /// 32-bit big-endian
    Word = 2,
}

impl MemSize {
    /// Try to extract an access width from its raw 2-bit value.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Byte),
            1 => Some(Self::Half),
            2 => Some(Self::Word),
            _ => None,
        }
    }

    /// Get the raw 2-bit size value.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Get the access width in bytes.
    #[inline]
    pub const fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }
}

impl fmt::Display for MemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Byte => "b",
            Self::Half => "h",
            Self::Word => "w",
        };
        write!(f, "{}", s)
    }
}

/// Memory addressing mode (bits 5-7 of the opcode byte for memory classes).
///
/// Raw values 4-7 fail decode. Only ABS and IND are executable, and only for
/// the LD class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemMode {
    /// Immediate
    Imm = 0,
    /// Absolute packet offset (`imm`)
    Abs = 1,
    /// Indirect packet offset (`imm + src`)
    Ind = 2,
    /// Register + offset
    Mem = 3,
}

impl MemMode {
    /// Try to extract an addressing mode from its raw 3-bit value.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Imm),
            1 => Some(Self::Abs),
            2 => Some(Self::Ind),
            3 => Some(Self::Mem),
            _ => None,
        }
    }

    /// Get the raw 3-bit mode value.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Imm => "imm",
            Self::Abs => "abs",
            Self::Ind => "ind",
            Self::Mem => "mem",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_extraction() {
        assert_eq!(Class::from_raw(0), Some(Class::Ld));
        assert_eq!(Class::from_raw(4), Some(Class::Alu));
        assert_eq!(Class::from_raw(5), Some(Class::Jmp));
        assert_eq!(Class::from_raw(6), None);
        assert_eq!(Class::from_raw(7), None);
    }

    #[test]
    fn mem_class_narrowing() {
        assert_eq!(Class::Ldx.mem_class(), Some(MemClass::Ldx));
        assert_eq!(Class::Alu.mem_class(), None);
        assert_eq!(MemClass::Stx.class(), Class::Stx);
    }

    #[test]
    fn alu_codes_cover_0_through_13() {
        assert_eq!(AluOp::from_raw(0), Some(AluOp::Add));
        assert_eq!(AluOp::from_raw(12), Some(AluOp::Arsh));
        assert_eq!(AluOp::from_raw(13), Some(AluOp::End));
        assert_eq!(AluOp::from_raw(14), None);
        assert_eq!(AluOp::from_raw(15), None);
        assert!(AluOp::End.is_unimplemented());
        assert!(!AluOp::Arsh.is_unimplemented());
    }

    #[test]
    fn jmp_codes_cover_0_through_9() {
        assert_eq!(JmpOp::from_raw(0), Some(JmpOp::Ja));
        assert_eq!(JmpOp::from_raw(8), Some(JmpOp::Call));
        assert_eq!(JmpOp::from_raw(9), Some(JmpOp::Exit));
        assert_eq!(JmpOp::from_raw(10), None);
        assert!(JmpOp::Call.is_unimplemented());
    }

    #[test]
    fn operand_usage_flags() {
        assert!(AluOp::Mov.ignores_left());
        assert!(!AluOp::Add.ignores_left());
        assert!(AluOp::Neg.ignores_right());
        assert!(!JmpOp::Ja.reads_operands());
        assert!(!JmpOp::Exit.reads_operands());
        assert!(JmpOp::Jeq.reads_operands());
    }

    #[test]
    fn size_and_mode_ranges() {
        assert_eq!(MemSize::from_raw(2), Some(MemSize::Word));
        assert_eq!(MemSize::from_raw(3), None);
        assert_eq!(MemSize::Half.width(), 2);
        assert_eq!(MemMode::from_raw(3), Some(MemMode::Mem));
        assert_eq!(MemMode::from_raw(4), None);
        assert_eq!(MemMode::from_raw(7), None);
    }
}
