//! Program Representation
//!
//! A [`Program`] is an ordered, immutable sequence of instructions; index 0
//! is the entry point. Nothing is validated or appended at load time: a
//! program that never reaches an EXIT faults at *run* time, not here, and an
//! empty program is legal to construct (it faults on its first step).

use alloc::vec::Vec;

use super::codec::{self, ProgramDecodeError};
use super::insn::Insn;

/// Ordered, immutable instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    insns: Vec<Insn>,
}

impl Program {
    /// Create a program from an instruction sequence.
    #[inline]
    pub fn new(insns: Vec<Insn>) -> Self {
        Self { insns }
    }

    /// Decode a program from its wire form.
    ///
    /// The on-wire form is the plain concatenation of 8-byte instruction
    /// encodings; the length must be an exact multiple of 8.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProgramDecodeError> {
        codec::decode_program(bytes)
    }

    /// Encode this program as a flat `8 × len` byte buffer.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_program(self)
    }

    /// Get the instruction sequence.
    #[inline]
    pub fn instructions(&self) -> &[Insn] {
        &self.insns
    }

    /// Get the number of instructions.
    #[inline]
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    /// Check whether the program has no instructions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }
}

impl FromIterator<Insn> for Program {
    fn from_iter<T: IntoIterator<Item = Insn>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
