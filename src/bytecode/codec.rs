//! Binary Instruction Codec
//!
//! Converts between the 8-byte wire form and [`Insn`]. Purely functional:
//! no state, no I/O. Multi-byte fields (`offset`, `immediate`) are
//! big-endian; byte 1 packs `dst` in the high nibble and `src` in the low
//! nibble.
//!
//! Decoding validates every sub-field against its legal range and reports the
//! offending field with its raw value. It never rejects an instruction for
//! *semantic* reasons (uninitialized registers, bad jump targets); those are
//! runtime faults raised by the interpreter.

use alloc::vec::Vec;
use core::fmt;

use super::insn::{Insn, InsnKind};
use super::opcode::{AluOp, Class, JmpOp, MemClass, MemMode, MemSize, Source};
use super::program::Program;
use super::registers::Register;

/// A single-instruction decode failure, naming the field and raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Input was not exactly 8 bytes.
    Length(usize),
    /// Class bits 6 or 7.
    Class(u8),
    /// ALU operation code outside 0-13.
    AluCode(u8),
    /// JMP operation code outside 0-9.
    JmpCode(u8),
    /// The END placeholder decodes at the bitfield level but is not
    /// implemented.
    UnimplementedAlu(AluOp),
    /// The CALL placeholder decodes at the bitfield level but is not
    /// implemented.
    UnimplementedJmp(JmpOp),
    /// Size bits value 3.
    Size(u8),
    /// Mode bits outside 0-3.
    Mode(u8),
    /// Register nibble outside 0-10.
    Register(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "wrong instruction size: {} bytes", n),
            Self::Class(v) => write!(f, "no class: {}", v),
            Self::AluCode(v) => write!(f, "no ALU code: {}", v),
            Self::JmpCode(v) => write!(f, "no JMP code: {}", v),
            Self::UnimplementedAlu(op) => write!(f, "code {} is not implemented", op),
            Self::UnimplementedJmp(op) => write!(f, "code {} is not implemented", op),
            Self::Size(v) => write!(f, "no size: {}", v),
            Self::Mode(v) => write!(f, "no mode: {}", v),
            Self::Register(v) => write!(f, "no register: {}", v),
        }
    }
}

/// A program-stream decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramDecodeError {
    /// Stream length is not a multiple of 8.
    UnalignedLength(usize),
    /// One 8-byte chunk failed to decode; `offset` is the byte offset of the
    /// chunk within the stream.
    Insn {
        offset: usize,
        cause: DecodeError,
    },
}

impl fmt::Display for ProgramDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnalignedLength(n) => {
                write!(f, "byte length {} is not a multiple of 8", n)
            }
            Self::Insn { offset, cause } => {
                write!(f, "bad instruction at byte offset {}: {}", offset, cause)
            }
        }
    }
}

/// Decode one 8-byte instruction.
pub fn decode(bytes: &[u8]) -> Result<Insn, DecodeError> {
    if bytes.len() != Insn::SIZE {
        return Err(DecodeError::Length(bytes.len()));
    }

    let opcode = bytes[0];
    let off = i16::from_be_bytes([bytes[2], bytes[3]]);
    let imm = i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    let class_raw = opcode & 0x07;

    let kind = match class_raw {
        4 => {
            let source = Source::from_raw((opcode >> 3) & 0x01);
            let code = opcode >> 4;
            let op = AluOp::from_raw(code).ok_or(DecodeError::AluCode(code))?;
            if op.is_unimplemented() {
                return Err(DecodeError::UnimplementedAlu(op));
            }
            InsnKind::Alu { source, op }
        }
        5 => {
            let source = Source::from_raw((opcode >> 3) & 0x01);
            let code = opcode >> 4;
            let op = JmpOp::from_raw(code).ok_or(DecodeError::JmpCode(code))?;
            if op.is_unimplemented() {
                return Err(DecodeError::UnimplementedJmp(op));
            }
            InsnKind::Jmp { source, op }
        }
        _ => {
            let mem_class =
                MemClass::from_raw(class_raw).ok_or(DecodeError::Class(class_raw))?;
            let size_raw = (opcode >> 3) & 0x03;
            let mode_raw = opcode >> 5;
            let size = MemSize::from_raw(size_raw).ok_or(DecodeError::Size(size_raw))?;
            let mode = MemMode::from_raw(mode_raw).ok_or(DecodeError::Mode(mode_raw))?;
            InsnKind::Mem {
                class: mem_class,
                size,
                mode,
            }
        }
    };

    // Register nibbles decode for every class; whether the instruction form
    // actually *uses* them is checked by the interpreter, not here.
    let dst_raw = bytes[1] >> 4;
    let src_raw = bytes[1] & 0x0f;
    let dst = Register::from_raw(dst_raw).ok_or(DecodeError::Register(dst_raw))?;
    let src = Register::from_raw(src_raw).ok_or(DecodeError::Register(src_raw))?;

    Ok(Insn {
        kind,
        dst: Some(dst),
        src: Some(src),
        off,
        imm,
    })
}

/// Encode one instruction into its 8-byte wire form.
///
/// Absent register fields pack as nibble 0. The opcode byte is derived
/// entirely from the typed [`InsnKind`], so fields a class does not have are
/// always zero on the wire.
pub fn encode(insn: &Insn) -> [u8; Insn::SIZE] {
    let opcode = match insn.kind {
        InsnKind::Alu { source, op } => {
            (op.as_raw() << 4) | (source.as_raw() << 3) | Class::Alu.as_raw()
        }
        InsnKind::Jmp { source, op } => {
            (op.as_raw() << 4) | (source.as_raw() << 3) | Class::Jmp.as_raw()
        }
        InsnKind::Mem { class, size, mode } => {
            (mode.as_raw() << 5) | (size.as_raw() << 3) | class.class().as_raw()
        }
    };

    let dst = insn.dst.map_or(0, Register::as_raw);
    let src = insn.src.map_or(0, Register::as_raw);
    let off = insn.off.to_be_bytes();
    let imm = insn.imm.to_be_bytes();

    [
        opcode,
        (dst << 4) | src,
        off[0],
        off[1],
        imm[0],
        imm[1],
        imm[2],
        imm[3],
    ]
}

/// Decode a whole byte stream into a [`Program`].
///
/// The stream has no header or length prefix; its length must be an exact
/// multiple of 8. Chunk failures report the byte offset of the bad chunk.
pub fn decode_program(bytes: &[u8]) -> Result<Program, ProgramDecodeError> {
    if bytes.len() % Insn::SIZE != 0 {
        return Err(ProgramDecodeError::UnalignedLength(bytes.len()));
    }

    let mut insns = Vec::with_capacity(bytes.len() / Insn::SIZE);
    for (index, chunk) in bytes.chunks_exact(Insn::SIZE).enumerate() {
        let insn = decode(chunk).map_err(|cause| ProgramDecodeError::Insn {
            offset: index * Insn::SIZE,
            cause,
        })?;
        insns.push(insn);
    }
    Ok(Program::new(insns))
}

/// Encode a [`Program`] as a flat stream of `8 × len` bytes.
pub fn encode_program(program: &Program) -> Vec<u8> {
    let mut out = Vec::with_capacity(program.len() * Insn::SIZE);
    for insn in program.instructions() {
        out.extend_from_slice(&encode(insn));
    }
    out
}
