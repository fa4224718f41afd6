//! Program Execution
//!
//! This module provides the register-machine interpreter and its runtime
//! error model. Decode errors are static and live in [`crate::bytecode`];
//! everything here is dynamic: faults raised while a program runs.
//!
//! A [`Fault`] is terminal for the run that raised it. It owns an immutable
//! snapshot of the diagnostics captured at the moment of failure — the
//! ordered list of instruction-pointer values visited and the register file
//! contents — not a reference into engine state, so it stays valid after the
//! engine is reset or dropped.

mod interpreter;

pub use interpreter::{Interpreter, State};

use alloc::vec::Vec;
use core::fmt;

use crate::bytecode::opcode::{AluOp, Class, JmpOp, MemMode};
use crate::bytecode::registers::{Register, RegisterFile};

/// Result of running a program: the 32-bit verdict in R0, or a fault.
pub type RunResult = Result<i32, Fault>;

/// Why a run terminated abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A register was read before anything wrote it.
    ReadUninitialized(Register),
    /// The instruction form references no register where one was needed.
    ReadAbsentRegister,
    /// The instruction form names no destination register.
    WriteAbsentRegister,
    /// R10 is read-only.
    WriteReadOnly(Register),
    /// Backward edges are forbidden; this is the loop-prevention rule.
    NegativeJumpOffset(i16),
    /// A taken jump computed a pointer past the top of the address space.
    InstructionPointerOverflow,
    /// A load touched bytes outside the packet.
    OutOfBoundsLoad {
        /// Computed byte offset (may be negative)
        offset: i32,
        /// Access width in bytes
        width: usize,
        /// Packet length
        len: usize,
    },
    /// LD executes only in ABS or IND mode.
    InvalidLoadMode(MemMode),
    /// LDX, ST, and STX decode but are not executable.
    UnhandledClass(Class),
    /// Execution ran off the end of the program without an EXIT.
    EndOfInstructions,
    /// EXIT was reached with R0 never written.
    UninitializedR0AtExit,
    /// An unimplemented ALU code survived to execution (programmatically
    /// built programs can carry it; decode would have rejected it).
    BadAluCode(AluOp),
    /// An unimplemented JMP code survived to execution.
    BadJmpCode(JmpOp),
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadUninitialized(r) => {
                write!(f, "attempt to read uninitialized register {}", r)
            }
            Self::ReadAbsentRegister => write!(f, "attempt to read absent register"),
            Self::WriteAbsentRegister => write!(f, "attempt to write absent register"),
            Self::WriteReadOnly(r) => {
                write!(f, "attempt to write read-only register {}", r)
            }
            Self::NegativeJumpOffset(off) => write!(f, "negative jump offset {}", off),
            Self::InstructionPointerOverflow => write!(f, "instruction pointer overflow"),
            Self::OutOfBoundsLoad { offset, width, len } => write!(
                f,
                "out of bounds memory access: {} bytes at offset {} in {}-byte packet",
                width, offset, len
            ),
            Self::InvalidLoadMode(mode) => write!(f, "invalid mode for LD class: {}", mode),
            Self::UnhandledClass(class) => {
                write!(f, "unhandled instruction class: {:?}", class)
            }
            Self::EndOfInstructions => {
                write!(f, "unexpected end of instruction stream - must end with EXIT")
            }
            Self::UninitializedR0AtExit => {
                write!(f, "R0 must be initialized before exit")
            }
            Self::BadAluCode(op) => write!(f, "bad code to ALU: {}", op),
            Self::BadJmpCode(op) => write!(f, "bad code to JMP: {}", op),
        }
    }
}

/// Terminal failure of one run, with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// What went wrong
    pub kind: FaultKind,
    /// Every instruction pointer visited, in order, ending at the fault
    pub trace: Vec<usize>,
    /// Register file contents at the moment of failure
    pub registers: RegisterFile,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program fault: {}", self.kind)
    }
}
