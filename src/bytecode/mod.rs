//! Bytecode Core
//!
//! This module implements the restricted eBPF-style instruction set: typed
//! opcode fields, the partial register file, the structured instruction
//! value, the 8-byte wire codec, and the immutable program representation.
//!
//! # Instruction Format
//!
//! - 8-byte fixed-width instructions
//! - big-endian `offset` and `immediate` fields
//! - 11 registers (R0-R10), encoded as nibbles
//! - class-keyed opcode bitfields (see [`opcode`])

pub mod codec;
pub mod insn;
pub mod opcode;
pub mod program;
pub mod registers;

pub use codec::{DecodeError, ProgramDecodeError};
pub use insn::{Insn, InsnKind};
pub use opcode::{AluOp, Class, JmpOp, MemClass, MemMode, MemSize, Source};
pub use program::Program;
pub use registers::{Register, RegisterFile};
