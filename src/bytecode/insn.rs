//! Instruction Representation
//!
//! Instructions are 64 bits (8 bytes) on the wire:
//!
//! ```text
//! +--------+----+----+--------+------------+
//! | opcode | dst| src| offset |  immediate |
//! | 8 bits | 4b | 4b | 16 bits|   32 bits  |
//! +--------+----+----+--------+------------+
//! ```
//!
//! In memory an instruction is a tagged value: [`InsnKind`] is keyed by the
//! instruction class, and each variant can only carry the fields that class
//! legally has. An ALU instruction cannot hold a size/mode pair and a memory
//! instruction cannot hold an operation code; the constructors below can only
//! ever build well-formed combinations.
//!
//! Register fields are `Option<Register>`: builder forms that reference no
//! register leave the field absent, and the interpreter faults on any attempt
//! to use an absent register.

use core::fmt;

use super::opcode::{AluOp, Class, JmpOp, MemClass, MemMode, MemSize, Source};
use super::registers::Register;

/// Class-specific instruction fields.
///
/// Exactly one of the (source, operation) / (size, mode) pairs exists,
/// selected by the variant. This is the decode-time structural split on
/// class, made permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsnKind {
    /// Arithmetic/logic operation
    Alu {
        /// Immediate or register second operand
        source: Source,
        /// Operation code
        op: AluOp,
    },
    /// Jump, comparison, or exit
    Jmp {
        /// Immediate or register second operand
        source: Source,
        /// Operation code
        op: JmpOp,
    },
    /// Memory access
    Mem {
        /// Which of the four memory classes
        class: MemClass,
        /// Access width
        size: MemSize,
        /// Addressing mode
        mode: MemMode,
    },
}

impl InsnKind {
    /// Get the instruction class this kind belongs to.
    #[inline]
    pub const fn class(&self) -> Class {
        match self {
            Self::Alu { .. } => Class::Alu,
            Self::Jmp { .. } => Class::Jmp,
            Self::Mem { class, .. } => class.class(),
        }
    }
}

/// Single decoded instruction.
///
/// Immutable once built; created either by the codec or by the constructor
/// helpers below and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insn {
    /// Class-specific fields
    pub kind: InsnKind,
    /// Destination register, if this form references one
    pub dst: Option<Register>,
    /// Source register, if this form references one
    pub src: Option<Register>,
    /// Signed jump displacement; meaningful only for JMP
    pub off: i16,
    /// Signed 32-bit literal operand
    pub imm: i32,
}

impl Insn {
    /// Encoded size of one instruction in bytes.
    pub const SIZE: usize = 8;

    /// ALU operation with a register right operand.
    #[inline]
    pub const fn alu_reg(op: AluOp, dst: Register, src: Register) -> Self {
        Self {
            kind: InsnKind::Alu {
                source: Source::Reg,
                op,
            },
            dst: Some(dst),
            src: Some(src),
            off: 0,
            imm: 0,
        }
    }

    /// ALU operation with an immediate right operand.
    #[inline]
    pub const fn alu_imm(op: AluOp, dst: Register, imm: i32) -> Self {
        Self {
            kind: InsnKind::Alu {
                source: Source::Imm,
                op,
            },
            dst: Some(dst),
            src: None,
            off: 0,
            imm,
        }
    }

    /// dst = src
    #[inline]
    pub const fn mov_reg(dst: Register, src: Register) -> Self {
        Self::alu_reg(AluOp::Mov, dst, src)
    }

    /// dst = imm
    #[inline]
    pub const fn mov_imm(dst: Register, imm: i32) -> Self {
        Self::alu_imm(AluOp::Mov, dst, imm)
    }

    /// dst += src
    #[inline]
    pub const fn add_reg(dst: Register, src: Register) -> Self {
        Self::alu_reg(AluOp::Add, dst, src)
    }

    /// dst += imm
    #[inline]
    pub const fn add_imm(dst: Register, imm: i32) -> Self {
        Self::alu_imm(AluOp::Add, dst, imm)
    }

    /// Conditional jump comparing `left` against a register.
    #[inline]
    pub const fn jmp_reg(op: JmpOp, left: Register, right: Register, off: i16) -> Self {
        Self {
            kind: InsnKind::Jmp {
                source: Source::Reg,
                op,
            },
            dst: Some(left),
            src: Some(right),
            off,
            imm: 0,
        }
    }

    /// Conditional jump comparing `left` against an immediate.
    #[inline]
    pub const fn jmp_imm(op: JmpOp, left: Register, imm: i32, off: i16) -> Self {
        Self {
            kind: InsnKind::Jmp {
                source: Source::Imm,
                op,
            },
            dst: Some(left),
            src: None,
            off,
            imm,
        }
    }

    /// Unconditional forward jump. References no register.
    #[inline]
    pub const fn ja(off: i16) -> Self {
        Self {
            kind: InsnKind::Jmp {
                source: Source::Imm,
                op: JmpOp::Ja,
            },
            dst: None,
            src: None,
            off,
            imm: 0,
        }
    }

    /// Terminate the program, returning R0.
    #[inline]
    pub const fn exit() -> Self {
        Self {
            kind: InsnKind::Jmp {
                source: Source::Imm,
                op: JmpOp::Exit,
            },
            dst: None,
            src: None,
            off: 0,
            imm: 0,
        }
    }

    /// Load from the packet at absolute offset `imm` into R0.
    #[inline]
    pub const fn ld_abs(size: MemSize, imm: i32) -> Self {
        Self {
            kind: InsnKind::Mem {
                class: MemClass::Ld,
                size,
                mode: MemMode::Abs,
            },
            dst: None,
            src: None,
            off: 0,
            imm,
        }
    }

    /// Load from the packet at offset `imm + src` into R0.
    #[inline]
    pub const fn ld_ind(size: MemSize, src: Register, imm: i32) -> Self {
        Self {
            kind: InsnKind::Mem {
                class: MemClass::Ld,
                size,
                mode: MemMode::Ind,
            },
            dst: None,
            src: Some(src),
            off: 0,
            imm,
        }
    }

    /// Get the instruction class.
    #[inline]
    pub const fn class(&self) -> Class {
        self.kind.class()
    }
}

struct MaybeReg(Option<Register>);

impl fmt::Display for MaybeReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(r) => write!(f, "{}", r),
            None => write!(f, "r?"),
        }
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InsnKind::Alu { source, op } => match source {
                Source::Imm => write!(f, "{} {}, {}", op, MaybeReg(self.dst), self.imm),
                Source::Reg => {
                    write!(f, "{} {}, {}", op, MaybeReg(self.dst), MaybeReg(self.src))
                }
            },
            InsnKind::Jmp { source, op } => match op {
                JmpOp::Exit => write!(f, "exit"),
                JmpOp::Ja => write!(f, "ja {:+}", self.off),
                _ => match source {
                    Source::Imm => write!(
                        f,
                        "{} {}, {}, {:+}",
                        op,
                        MaybeReg(self.dst),
                        self.imm,
                        self.off
                    ),
                    Source::Reg => write!(
                        f,
                        "{} {}, {}, {:+}",
                        op,
                        MaybeReg(self.dst),
                        MaybeReg(self.src),
                        self.off
                    ),
                },
            },
            InsnKind::Mem { class, size, mode } => {
                let name = match class {
                    MemClass::Ld => "ld",
                    MemClass::Ldx => "ldx",
                    MemClass::St => "st",
                    MemClass::Stx => "stx",
                };
                match mode {
                    MemMode::Ind => write!(
                        f,
                        "{}.{}.{} {}, {}",
                        name,
                        mode,
                        size,
                        MaybeReg(self.src),
                        self.imm
                    ),
                    _ => write!(f, "{}.{}.{} {}", name, mode, size, self.imm),
                }
            }
        }
    }
}
