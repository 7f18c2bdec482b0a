// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Virtual CPU, assembler and disassembler for a 32-bit fantasy console.
//!
//! The library has two independent cores:
//!
//! - The **CPU**: a [Cpu] executes a bespoke 16-bit-opcode instruction set
//!   against a 32-bit address bus supplied by the host through the [Bus]
//!   trait. The host provides three callbacks (byte read, byte write and a
//!   cycle tick) and pokes interrupt requests with
//!   [Cpu::request_interrupt]; everything else, including the fixed memory
//!   map of the machine (see [memory]), is a convention between program
//!   and host that the core does not enforce.
//! - The **assembler**: the [asm] module compiles the machine's assembly
//!   language into a flat ROM image. See [asm::Builder] for the language
//!   surface (data directives, macros, conditional assembly, `ORG ROM|RAM`
//!   cursors, forward label references).
//!
//! The [instruction] and [disassembler] modules decode images back into
//! mnemonics; assembling a disassembled instruction reproduces its bytes.
//!
//! # Basic usage
//!
//! ```
//! use tmvm::memory::CODE_BEGIN;
//! use tmvm::Cpu;
//!
//! // A trivial host: 64 KiB of flat RAM mapped from address 0.
//! let mut memory = vec![0u8; 0x1_0000];
//!
//! let program = tmvm::asm::assemble_source("ld al, $05\ninc al\nsec $00\n", "demo").unwrap();
//! memory[CODE_BEGIN as usize..CODE_BEGIN as usize + program.len()].copy_from_slice(&program);
//!
//! let mut cpu = Cpu::new();
//! while cpu.step(memory.as_mut_slice()) {}
//!
//! assert_eq!(cpu.regs.get(tmvm::Register::AL), 6);
//! assert_eq!(cpu.error_code(), 0);
//! ```

pub mod asm;
pub mod cpu;
pub mod disassembler;
pub mod exception;
pub mod flags;
pub mod instruction;
mod interpreter;
pub mod isa;
pub mod memory;
pub mod program;
pub mod registers;

pub use cpu::Cpu;
pub use exception::ErrorCode;
pub use flags::Flags;
pub use memory::Bus;
pub use registers::{Register, Registers, Size};
