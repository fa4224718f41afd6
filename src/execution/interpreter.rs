//! Bytecode Interpreter
//!
//! A straight-line interpreter over the decoded instruction sequence. All
//! arithmetic is 32-bit signed with wraparound; the no-backward-jump rule
//! makes every run finite, so there is no instruction budget or deadline.
//!
//! The engine is single-threaded and non-reentrant: one instance executes at
//! most one run at a time, and a terminal engine must be `reset()` before it
//! runs again. Callers that want concurrent evaluation run independent
//! engines over clones of the (immutable) program.

use alloc::vec::Vec;

use super::{Fault, FaultKind, RunResult};
use crate::bytecode::insn::{Insn, InsnKind};
use crate::bytecode::opcode::{AluOp, JmpOp, MemClass, MemMode, MemSize, Source};
use crate::bytecode::program::Program;
use crate::bytecode::registers::{Register, RegisterFile};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed or reset; `run` may be called.
    Ready,
    /// Inside a `run` call.
    Running,
    /// Last run finished normally with this verdict.
    Completed(i32),
    /// Last run terminated in a fault (returned to the caller).
    Faulted,
}

/// The execution engine.
///
/// Owns its program, so nothing the caller does after construction can
/// change the instruction stream out from under a run.
pub struct Interpreter {
    program: Program,
    state: State,
}

impl Interpreter {
    /// Create an engine over a program.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            state: State::Ready,
        }
    }

    /// Get the current lifecycle state.
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Get the loaded program.
    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Return a terminal (or ready) engine to `Ready`.
    pub fn reset(&mut self) {
        self.state = State::Ready;
    }

    /// Run the program against a packet, producing the R0 verdict.
    ///
    /// Binds `packet` as the run's read-only memory, starts from a fully
    /// uninitialized register file at instruction 0, and steps until EXIT or
    /// a fault. The returned [`Fault`] owns the instruction-pointer trace
    /// and a register snapshot; on success the trace is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the engine is not `Ready`. Invoking `run` on a terminal
    /// engine without a `reset()` is a bug in the caller, not a program
    /// fault.
    pub fn run(&mut self, packet: &[u8]) -> RunResult {
        assert!(
            self.state == State::Ready,
            "run() requires a Ready engine; reset() after a completed or faulted run"
        );
        self.state = State::Running;

        let mut frame = Frame::new(packet);
        match frame.exec(self.program.instructions()) {
            Ok(verdict) => {
                self.state = State::Completed(verdict);
                Ok(verdict)
            }
            Err(kind) => {
                self.state = State::Faulted;
                Err(Fault {
                    kind,
                    trace: frame.trace,
                    registers: frame.regs,
                })
            }
        }
    }
}

/// Per-run mutable state, created fresh for each `run` and discarded at its
/// end (or moved into the `Fault`).
struct Frame<'p> {
    regs: RegisterFile,
    ip: usize,
    trace: Vec<usize>,
    packet: &'p [u8],
    running: bool,
}

impl<'p> Frame<'p> {
    fn new(packet: &'p [u8]) -> Self {
        Self {
            regs: RegisterFile::new(),
            ip: 0,
            trace: Vec::new(),
            packet,
            running: false,
        }
    }

    fn exec(&mut self, insns: &[Insn]) -> Result<i32, FaultKind> {
        self.running = true;
        while self.running {
            self.step(insns)?;
        }
        self.regs
            .get(Register::R0)
            .ok_or(FaultKind::UninitializedR0AtExit)
    }

    fn step(&mut self, insns: &[Insn]) -> Result<(), FaultKind> {
        self.trace.push(self.ip);
        let insn = insns.get(self.ip).ok_or(FaultKind::EndOfInstructions)?;

        match insn.kind {
            InsnKind::Alu { source, op } => {
                let left = if op.ignores_left() {
                    0
                } else {
                    self.read(insn.dst)?
                };
                let right = if op.ignores_right() {
                    0
                } else {
                    self.right_operand(source, insn.src, insn.imm)?
                };
                let result = alu_result(op, left, right)?;
                self.write(insn.dst, result)?;
                self.ip += 1;
            }

            InsnKind::Jmp { source, op } => {
                // Rejected regardless of whether the branch would be taken,
                // and before EXIT handling: no backward edge ever executes.
                if insn.off < 0 {
                    return Err(FaultKind::NegativeJumpOffset(insn.off));
                }
                if op == JmpOp::Exit {
                    self.running = false;
                    return Ok(());
                }

                let taken = if op == JmpOp::Ja {
                    true
                } else {
                    let left = self.read(insn.dst)?;
                    let right = self.right_operand(source, insn.src, insn.imm)?;
                    branch_taken(op, left, right)?
                };

                if taken {
                    self.ip = self
                        .ip
                        .checked_add(insn.off as usize + 1)
                        .ok_or(FaultKind::InstructionPointerOverflow)?;
                } else {
                    self.ip += 1;
                }
            }

            InsnKind::Mem {
                class: MemClass::Ld,
                size,
                mode,
            } => {
                let offset = match mode {
                    MemMode::Abs => insn.imm,
                    MemMode::Ind => {
                        // 32-bit wrapping add: a negative src can pull a
                        // large imm back into range and vice versa.
                        insn.imm.wrapping_add(self.read(insn.src)?)
                    }
                    other => return Err(FaultKind::InvalidLoadMode(other)),
                };
                let value = self.load(offset, size)?;

                self.regs.set(Register::R0, value);
                // Packet loads clobber the caller-saved scratch registers:
                // they become uninitialized again, not zero.
                for reg in Register::SCRATCH {
                    self.regs.invalidate(reg);
                }
                self.ip += 1;
            }

            InsnKind::Mem { class, .. } => {
                return Err(FaultKind::UnhandledClass(class.class()));
            }
        }

        Ok(())
    }

    /// Read a register operand, faulting on absent or uninitialized.
    fn read(&self, reg: Option<Register>) -> Result<i32, FaultKind> {
        let reg = reg.ok_or(FaultKind::ReadAbsentRegister)?;
        self.regs
            .get(reg)
            .ok_or(FaultKind::ReadUninitialized(reg))
    }

    /// Write a register operand, faulting on absent or read-only.
    fn write(&mut self, reg: Option<Register>, value: i32) -> Result<(), FaultKind> {
        let reg = reg.ok_or(FaultKind::WriteAbsentRegister)?;
        if !reg.is_writable() {
            return Err(FaultKind::WriteReadOnly(reg));
        }
        self.regs.set(reg, value);
        Ok(())
    }

    /// Resolve the right operand: the immediate, or a checked register read.
    fn right_operand(
        &self,
        source: Source,
        src: Option<Register>,
        imm: i32,
    ) -> Result<i32, FaultKind> {
        match source {
            Source::Imm => Ok(imm),
            Source::Reg => self.read(src),
        }
    }

    /// Read `size.width()` bytes from the packet at `offset`, big-endian,
    /// zero-extending sub-word widths.
    fn load(&self, offset: i32, size: MemSize) -> Result<i32, FaultKind> {
        let width = size.width();
        let oob = FaultKind::OutOfBoundsLoad {
            offset,
            width,
            len: self.packet.len(),
        };

        if offset < 0 {
            return Err(oob);
        }
        let start = offset as usize;
        let end = start.checked_add(width).ok_or(oob)?;
        if end > self.packet.len() {
            return Err(oob);
        }

        let bytes = &self.packet[start..end];
        Ok(match size {
            MemSize::Byte => bytes[0] as i32,
            MemSize::Half => u16::from_be_bytes([bytes[0], bytes[1]]) as i32,
            MemSize::Word => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }
}

/// Evaluate one ALU operation on 32-bit signed operands.
///
/// Division and modulo by zero yield 0 by convention rather than faulting;
/// shifts mask their count mod 32.
fn alu_result(op: AluOp, left: i32, right: i32) -> Result<i32, FaultKind> {
    Ok(match op {
        AluOp::Add => left.wrapping_add(right),
        AluOp::Sub => left.wrapping_sub(right),
        AluOp::Mul => left.wrapping_mul(right),
        AluOp::Div => {
            if right == 0 {
                0
            } else {
                left.wrapping_div(right)
            }
        }
        AluOp::Or => left | right,
        AluOp::And => left & right,
        AluOp::Lsh => left.wrapping_shl(right as u32),
        AluOp::Rsh => ((left as u32).wrapping_shr(right as u32)) as i32,
        AluOp::Neg => left.wrapping_neg(),
        AluOp::Mod => {
            if right == 0 {
                0
            } else {
                left.wrapping_rem(right)
            }
        }
        AluOp::Xor => left ^ right,
        AluOp::Mov => right,
        AluOp::Arsh => left.wrapping_shr(right as u32),
        // Should have been excluded by decode; reachable only from
        // programmatically built instructions.
        AluOp::End => return Err(FaultKind::BadAluCode(op)),
    })
}

/// Evaluate one jump condition. JGT/JGE compare as unsigned 32-bit.
fn branch_taken(op: JmpOp, left: i32, right: i32) -> Result<bool, FaultKind> {
    Ok(match op {
        JmpOp::Jeq => left == right,
        JmpOp::Jgt => (left as u32) > (right as u32),
        JmpOp::Jge => (left as u32) >= (right as u32),
        JmpOp::Jset => (left & right) != 0,
        JmpOp::Jne => left != right,
        JmpOp::Jsgt => left > right,
        JmpOp::Jsge => left >= right,
        // JA and EXIT never reach condition evaluation.
        JmpOp::Ja | JmpOp::Exit | JmpOp::Call => return Err(FaultKind::BadJmpCode(op)),
    })
}
