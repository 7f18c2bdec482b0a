// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instruction decoding, for the disassembler and for tests.

use crate::isa::{Condition, Isa};
use crate::registers::{Register, Size};

/// Byte-wise reader over a program image.
pub struct ImageReader<'a> {
    /// The image being decoded.
    pub image: &'a [u8],
    /// Offset of the next byte to be read.
    pub pos: usize,
}

impl<'a> ImageReader<'a> {
    pub fn new(image: &'a [u8]) -> Self {
        Self { image, pos: 0 }
    }

    pub fn at(image: &'a [u8], pos: usize) -> Self {
        Self { image, pos }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.image.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Reads a little-endian value of the given width.
    fn next_sized(&mut self, size: Size) -> Option<u32> {
        let mut value = 0;
        for shift in 0..size as u32 {
            value |= (self.next_byte()? as u32) << (shift * 8);
        }
        Some(value)
    }
}

/// Decoded operands of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operands {
    /// NOP, STOP, HALT, CEC, DI, EI, DAA, SCF, CCF, RETI, JPS
    None,
    /// SEC
    Code(u8),
    /// INC, DEC, NOT, shifts, SWAP, PUSH, POP
    Register(Register),
    /// LD/LDQ/LDH immediate forms and immediate arithmetic
    RegisterImmediate(Register, u32),
    /// LD/LDQ/LDH and ST/STQ/STH absolute forms
    RegisterAddress(Register, u32),
    /// LD/ST register-pointer forms, MV and register arithmetic
    RegisterRegister(Register, Register),
    /// JMP
    ConditionAddress(Condition, u32),
    /// RET
    Condition(Condition),
    /// JPB
    Displacement(i16),
    /// CALL
    Address(u32),
    /// RST
    Vector(u8),
    /// BIT, RES, SET
    RegisterBit(Register, u8),
}

/// A decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// The opcode word, `II` in the high byte.
    pub opcode: u16,
    /// Address of the instruction.
    pub addr: u32,
    /// The decoded operands.
    pub operands: Operands,
}

impl Instruction {
    /// Decodes the instruction at the reader's position.
    ///
    /// Returns `None` when the image ends in the middle of an instruction.
    /// An unknown `II` byte still decodes (with [Operands::None]) so a
    /// disassembly listing can show it and keep going.
    pub fn decode(reader: &mut ImageReader, base: u32) -> Option<Self> {
        let addr = base.wrapping_add(reader.pos as u32);
        let ii = reader.next_byte()?;
        let xy = reader.next_byte()?;
        let isa = Isa::from_ii(ii);

        let x = Register::from_nibble(xy >> 4);
        let y = Register::from_nibble(xy & 0xF);

        let operands = match isa {
            Isa::Nop | Isa::Stop | Isa::Halt | Isa::Cec | Isa::Di | Isa::Ei | Isa::Daa
            | Isa::Scf | Isa::Ccf | Isa::Reti | Isa::Jps | Isa::Unknown => Operands::None,
            Isa::Sec => Operands::Code(xy),
            Isa::LdImm | Isa::LdqImm | Isa::LdhImm => {
                Operands::RegisterImmediate(x, reader.next_sized(isa.immediate()?)?)
            }
            Isa::AddImm | Isa::AdcImm | Isa::SubImm | Isa::SbcImm | Isa::CmpImm
            | Isa::AndImm | Isa::OrImm | Isa::XorImm => {
                Operands::RegisterImmediate(x, reader.next_sized(Size::Long)?)
            }
            Isa::LdAbs | Isa::LdqAbs | Isa::LdhAbs | Isa::StAbs | Isa::StqAbs | Isa::SthAbs => {
                Operands::RegisterAddress(x, reader.next_sized(isa.immediate()?)?)
            }
            Isa::LdInd | Isa::LdqInd | Isa::LdhInd | Isa::StInd | Isa::StqInd | Isa::SthInd
            | Isa::Mv | Isa::AddReg | Isa::AdcReg | Isa::SubReg | Isa::SbcReg | Isa::CmpReg
            | Isa::AndReg | Isa::OrReg | Isa::XorReg => Operands::RegisterRegister(x, y),
            Isa::Jmp => Operands::ConditionAddress(
                Condition::from_nibble(xy >> 4)?,
                reader.next_sized(Size::Long)?,
            ),
            Isa::Jpb => Operands::Displacement(reader.next_sized(Size::Word)? as u16 as i16),
            Isa::Call => Operands::Address(reader.next_sized(Size::Long)?),
            Isa::Rst => Operands::Vector(xy >> 4),
            Isa::Ret => Operands::Condition(Condition::from_nibble(xy >> 4)?),
            Isa::Push | Isa::Pop | Isa::Inc | Isa::Dec | Isa::Not | Isa::Sla | Isa::Sra
            | Isa::Srl | Isa::Rl | Isa::Rlc | Isa::Rr | Isa::Rrc | Isa::Swap => {
                Operands::Register(x)
            }
            Isa::Bit | Isa::Res | Isa::Set => Operands::RegisterBit(x, reader.next_byte()?),
        };

        Some(Self {
            opcode: (ii as u16) << 8 | xy as u16,
            addr,
            operands,
        })
    }

    /// The instruction form of this opcode.
    pub fn isa(&self) -> Isa {
        Isa::from(self.opcode)
    }

    /// Disassembles the instruction.
    pub fn disassemble(&self) -> String {
        crate::disassembler::disassemble(self)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.disassemble())
    }
}
