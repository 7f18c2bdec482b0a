// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disassembler module.
//!
//! The produced text re-assembles to the same bytes; the absolute forms
//! print their pointer as a bracketed hex address, the immediate forms as a
//! bare hex literal.

use crate::instruction::{Instruction, Operands};
use crate::isa::Isa;

/// Disassembles a decoded instruction.
pub fn disassemble(inst: &Instruction) -> String {
    let isa = inst.isa();
    match isa {
        Isa::Nop | Isa::Stop | Isa::Halt | Isa::Cec | Isa::Di | Isa::Ei | Isa::Daa | Isa::Scf
        | Isa::Ccf | Isa::Reti | Isa::Jps => isa.mnemonic().to_string(),
        Isa::Sec => disassemble_sec(inst),
        Isa::LdImm | Isa::LdqImm | Isa::LdhImm => disassemble_load_immediate(inst),
        Isa::LdAbs | Isa::LdqAbs | Isa::LdhAbs => disassemble_load_absolute(inst),
        Isa::LdInd | Isa::LdqInd | Isa::LdhInd => disassemble_load_indirect(inst),
        Isa::StAbs | Isa::StqAbs | Isa::SthAbs => disassemble_store_absolute(inst),
        Isa::StInd | Isa::StqInd | Isa::SthInd => disassemble_store_indirect(inst),
        Isa::Mv => disassemble_register_pair(inst),
        Isa::Jmp => disassemble_jmp(inst),
        Isa::Jpb => disassemble_jpb(inst),
        Isa::Call => disassemble_call(inst),
        Isa::Rst => disassemble_rst(inst),
        Isa::Ret => disassemble_ret(inst),
        Isa::Push | Isa::Pop | Isa::Inc | Isa::Dec | Isa::Not | Isa::Sla | Isa::Sra | Isa::Srl
        | Isa::Rl | Isa::Rlc | Isa::Rr | Isa::Rrc | Isa::Swap => disassemble_register(inst),
        Isa::AddImm | Isa::AdcImm | Isa::SubImm | Isa::SbcImm | Isa::CmpImm | Isa::AndImm
        | Isa::OrImm | Isa::XorImm => disassemble_arithmetic_immediate(inst),
        Isa::AddReg | Isa::AdcReg | Isa::SubReg | Isa::SbcReg | Isa::CmpReg | Isa::AndReg
        | Isa::OrReg | Isa::XorReg => disassemble_register_pair(inst),
        Isa::Bit | Isa::Res | Isa::Set => disassemble_bit(inst),
        Isa::Unknown => disassemble_unknown_instruction(inst),
    }
}

pub fn disassemble_unknown_instruction(inst: &Instruction) -> String {
    format!("Unknown instruction {:04X} at {:#X}", inst.opcode, inst.addr)
}

fn disassemble_sec(inst: &Instruction) -> String {
    let Operands::Code(code) = inst.operands else { unreachable!() };
    format!("SEC ${code:02X}")
}

fn disassemble_load_immediate(inst: &Instruction) -> String {
    let Operands::RegisterImmediate(reg, imm) = inst.operands else { unreachable!() };
    format!("{} {}, ${:X}", inst.isa().mnemonic(), reg, imm)
}

fn disassemble_load_absolute(inst: &Instruction) -> String {
    let Operands::RegisterAddress(reg, addr) = inst.operands else { unreachable!() };
    format!("{} {}, [${:X}]", inst.isa().mnemonic(), reg, addr)
}

fn disassemble_load_indirect(inst: &Instruction) -> String {
    let Operands::RegisterRegister(dst, src) = inst.operands else { unreachable!() };
    format!("{} {}, [{}]", inst.isa().mnemonic(), dst, src)
}

fn disassemble_store_absolute(inst: &Instruction) -> String {
    let Operands::RegisterAddress(reg, addr) = inst.operands else { unreachable!() };
    format!("{} [${:X}], {}", inst.isa().mnemonic(), addr, reg)
}

fn disassemble_store_indirect(inst: &Instruction) -> String {
    let Operands::RegisterRegister(src, dst) = inst.operands else { unreachable!() };
    format!("{} [{}], {}", inst.isa().mnemonic(), dst, src)
}

/// MV and the register arithmetic forms: `XX d, s`.
fn disassemble_register_pair(inst: &Instruction) -> String {
    let Operands::RegisterRegister(dst, src) = inst.operands else { unreachable!() };
    format!("{} {}, {}", inst.isa().mnemonic(), dst, src)
}

fn disassemble_register(inst: &Instruction) -> String {
    let Operands::Register(reg) = inst.operands else { unreachable!() };
    format!("{} {}", inst.isa().mnemonic(), reg)
}

fn disassemble_arithmetic_immediate(inst: &Instruction) -> String {
    let Operands::RegisterImmediate(reg, imm) = inst.operands else { unreachable!() };
    format!("{} {}, ${:X}", inst.isa().mnemonic(), reg, imm)
}

fn disassemble_jmp(inst: &Instruction) -> String {
    let Operands::ConditionAddress(cond, addr) = inst.operands else { unreachable!() };
    if cond == crate::isa::Condition::None {
        format!("JMP ${addr:X}")
    } else {
        format!("JMP ${addr:X}, {cond}")
    }
}

fn disassemble_jpb(inst: &Instruction) -> String {
    let Operands::Displacement(disp) = inst.operands else { unreachable!() };
    format!("JPB {disp}")
}

fn disassemble_call(inst: &Instruction) -> String {
    let Operands::Address(addr) = inst.operands else { unreachable!() };
    format!("CALL ${addr:X}")
}

fn disassemble_rst(inst: &Instruction) -> String {
    let Operands::Vector(vec) = inst.operands else { unreachable!() };
    format!("RST {vec}")
}

fn disassemble_ret(inst: &Instruction) -> String {
    let Operands::Condition(cond) = inst.operands else { unreachable!() };
    if cond == crate::isa::Condition::None {
        "RET".to_string()
    } else {
        format!("RET {cond}")
    }
}

fn disassemble_bit(inst: &Instruction) -> String {
    let Operands::RegisterBit(reg, bit) = inst.operands else { unreachable!() };
    format!("{} {}, {}", inst.isa().mnemonic(), bit, reg)
}
