//! Restricted eBPF-Style Packet Filter VM
//!
//! This crate implements a small register machine for running short,
//! loop-bounded classification programs (packet filters) against an opaque
//! byte buffer, producing a single 32-bit verdict.
//!
//! Two components, in dependency order:
//!
//! - [`bytecode`] - the instruction set, the 8-byte wire codec, and the
//!   program representation
//! - [`execution`] - the interpreter: register file, control flow, memory
//!   faulting, and the runtime error model
//!
//! # Instruction Set
//!
//! The instruction set is a deliberately restricted eBPF dialect:
//!
//! - 11 registers (R0-R10), 32-bit signed values, R10 read-only
//! - 8-byte fixed-width instructions, big-endian multi-byte fields
//! - ALU and JMP classes are executable; LD supports the ABS/IND packet
//!   addressing modes; LDX/ST/STX decode but fault if executed
//! - No backward jumps, so every program executes a bounded number of steps
//!
//! Registers start each run *uninitialized*, not zeroed. Reading a register
//! the program never wrote is a runtime fault; this is the mechanism that
//! catches value leaks across a filter's control paths.
//!
//! # Quick Start
//!
//! ```
//! use bpf32::bytecode::{Insn, Program, Register};
//! use bpf32::execution::Interpreter;
//!
//! // r0 = 5; r1 = 67; r0 += r1; exit
//! let program = Program::new(vec![
//!     Insn::mov_imm(Register::R0, 5),
//!     Insn::mov_imm(Register::R1, 67),
//!     Insn::add_reg(Register::R0, Register::R1),
//!     Insn::exit(),
//! ]);
//!
//! let mut vm = Interpreter::new(program);
//! assert_eq!(vm.run(&[]).unwrap(), 72);
//! ```
//!
//! # Error Model
//!
//! Two disjoint families:
//!
//! - [`bytecode::DecodeError`] / [`bytecode::ProgramDecodeError`] - static,
//!   data-validation errors raised by the codec; the input must be rejected.
//! - [`execution::Fault`] - dynamic program faults raised during a run. Every
//!   fault carries the instruction-pointer trace and a register snapshot
//!   captured at the moment of failure.
//!
//! Calling [`execution::Interpreter::run`] while a run is in progress or
//! before resetting a terminal engine is a caller bug and panics; it is
//! deliberately not a recoverable [`execution::Fault`].

#![no_std]

extern crate alloc;

pub mod bytecode;
pub mod execution;
