// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instruction execution.
//!
//! One handler per instruction family. Flag behavior follows the Sharp
//! LR35902 conventions of the machine, widened to the 16- and 32-bit
//! register views: the half-carry boundary sits at bit 3, 11 or 27
//! depending on the operand width.

use crate::cpu::{Cpu, ExecuteResult};
use crate::exception::ErrorCode;
use crate::isa::{Condition, Isa};
use crate::memory::{Bus, IO_BEGIN, QRAM_BEGIN, RST_BEGIN};
use crate::registers::{Register, Size, Slice};

impl Cpu {
    /// Dispatches a fetched opcode to its handler.
    pub(crate) fn execute<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        isa: Isa,
        xy: u8,
    ) -> ExecuteResult {
        let x = Register::from_nibble(xy >> 4);
        let y = Register::from_nibble(xy & 0xF);

        match isa {
            Isa::Nop => Ok(()),
            Isa::Stop => {
                self.stop();
                Ok(())
            }
            Isa::Halt => {
                self.halt();
                Ok(())
            }
            Isa::Sec => {
                self.set_raw_error(xy);
                Ok(())
            }
            Isa::Cec => {
                self.clear_error();
                Ok(())
            }
            Isa::Di => {
                self.disable_interrupts();
                Ok(())
            }
            Isa::Ei => {
                self.schedule_interrupt_enable();
                Ok(())
            }
            Isa::Daa => {
                self.execute_daa();
                Ok(())
            }
            Isa::Scf => {
                self.regs.flags.set_carry(true);
                self.regs.flags.set_negative(false);
                self.regs.flags.set_half_carry(false);
                Ok(())
            }
            Isa::Ccf => {
                let carry = self.regs.flags.carry();
                self.regs.flags.set_carry(!carry);
                self.regs.flags.set_negative(false);
                self.regs.flags.set_half_carry(false);
                Ok(())
            }

            Isa::LdImm => self.execute_ld_imm(bus, x, Size::Long),
            Isa::LdqImm => self.execute_ld_imm(bus, x, Size::Word),
            Isa::LdhImm => self.execute_ld_imm(bus, x, Size::Byte),
            Isa::LdAbs => self.execute_ld_abs(bus, x, Size::Long),
            Isa::LdqAbs => self.execute_ld_abs(bus, x, Size::Word),
            Isa::LdhAbs => self.execute_ld_abs(bus, x, Size::Byte),
            Isa::LdInd => self.execute_ld_ind(bus, x, y, Size::Long),
            Isa::LdqInd => self.execute_ld_ind(bus, x, y, Size::Word),
            Isa::LdhInd => self.execute_ld_ind(bus, x, y, Size::Byte),
            Isa::StAbs => self.execute_st_abs(bus, x, Size::Long),
            Isa::StqAbs => self.execute_st_abs(bus, x, Size::Word),
            Isa::SthAbs => self.execute_st_abs(bus, x, Size::Byte),
            Isa::StInd => self.execute_st_ind(bus, x, y, Size::Long),
            Isa::StqInd => self.execute_st_ind(bus, x, y, Size::Word),
            Isa::SthInd => self.execute_st_ind(bus, x, y, Size::Byte),
            Isa::Mv => {
                if x.size() != y.size() {
                    return Err(ErrorCode::InvalidArgument);
                }
                let value = self.regs.get(y);
                self.regs.set(x, value);
                Ok(())
            }

            Isa::Push => {
                if x.slice() != Slice::Long {
                    return Err(ErrorCode::InvalidArgument);
                }
                let value = self.regs.get(x);
                self.push_data(bus, value)
            }
            Isa::Pop => {
                if x.slice() != Slice::Long {
                    return Err(ErrorCode::InvalidArgument);
                }
                let value = self.pop_data(bus)?;
                self.regs.set(x, value);
                Ok(())
            }

            Isa::Jmp => {
                let cond = Condition::from_nibble(xy >> 4).ok_or(ErrorCode::InvalidArgument)?;
                let addr = self.fetch_immediate(bus, Size::Long)?;
                if self.regs.flags.condition(cond) {
                    self.set_pc(bus, addr)?;
                }
                Ok(())
            }
            Isa::Jpb => {
                let disp = self.fetch_immediate(bus, Size::Word)? as u16 as i16;
                let target = self.regs.pc.wrapping_add(disp as i32 as u32);
                self.set_pc(bus, target)
            }
            Isa::Call => {
                let addr = self.fetch_immediate(bus, Size::Long)?;
                let pc = self.regs.pc;
                self.push_call(bus, pc)?;
                self.set_pc(bus, addr)
            }
            Isa::Rst => {
                let vec = (xy >> 4) as u32;
                let pc = self.regs.pc;
                self.push_call(bus, pc)?;
                self.set_pc(bus, RST_BEGIN + vec * 16)
            }
            Isa::Ret => {
                let cond = Condition::from_nibble(xy >> 4).ok_or(ErrorCode::InvalidArgument)?;
                if self.regs.flags.condition(cond) {
                    let pc = self.pop_call(bus)?;
                    self.set_pc(bus, pc)?;
                }
                Ok(())
            }
            Isa::Reti => {
                let pc = self.pop_call(bus)?;
                self.enable_interrupts();
                self.set_pc(bus, pc)
            }
            Isa::Jps => self.set_pc(bus, Self::program_start()),

            Isa::Inc => {
                let carry = self.regs.flags.carry();
                let value = self.add_value(self.regs.get(x), 1, x.size(), false);
                self.regs.flags.set_carry(carry);
                self.regs.set(x, value);
                Ok(())
            }
            Isa::Dec => {
                let carry = self.regs.flags.carry();
                let value = self.sub_value(self.regs.get(x), 1, x.size(), false);
                self.regs.flags.set_carry(carry);
                self.regs.set(x, value);
                Ok(())
            }
            Isa::AddImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::AdcImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::SubImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::SbcImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::CmpImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::AndImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::OrImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::XorImm => self.execute_arithmetic_imm(bus, isa, x),
            Isa::AddReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::AdcReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::SubReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::SbcReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::CmpReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::AndReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::OrReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::XorReg => self.execute_arithmetic_reg(isa, x, y),
            Isa::Not => {
                let size = x.size();
                let value = !self.regs.get(x) & size.mask();
                self.regs.flags.set_zero(value == 0);
                self.regs.flags.set_negative(false);
                self.regs.flags.set_half_carry(false);
                self.regs.flags.set_carry(false);
                self.regs.set(x, value);
                Ok(())
            }

            Isa::Sla | Isa::Sra | Isa::Srl | Isa::Rl | Isa::Rlc | Isa::Rr | Isa::Rrc => {
                self.execute_shift(isa, x);
                Ok(())
            }

            Isa::Bit => {
                let n = self.fetch_byte(bus)? as u32 % x.size().bits();
                let bit = self.regs.get(x) >> n & 1;
                self.regs.flags.set_zero(bit == 0);
                self.regs.flags.set_negative(false);
                self.regs.flags.set_half_carry(true);
                Ok(())
            }
            Isa::Res => {
                let n = self.fetch_byte(bus)? as u32 % x.size().bits();
                let value = self.regs.get(x) & !(1 << n);
                self.regs.set(x, value);
                Ok(())
            }
            Isa::Set => {
                let n = self.fetch_byte(bus)? as u32 % x.size().bits();
                let value = self.regs.get(x) | 1 << n;
                self.regs.set(x, value);
                Ok(())
            }
            Isa::Swap => {
                let value = self.regs.get(x);
                let swapped = match x.size() {
                    Size::Byte => (value << 4 | value >> 4) & 0xFF,
                    Size::Word => (value << 8 | value >> 8) & 0xFFFF,
                    Size::Long => value.rotate_left(16),
                };
                self.regs.flags.set_zero(swapped == 0);
                self.regs.flags.set_negative(false);
                self.regs.flags.set_half_carry(false);
                self.regs.flags.set_carry(false);
                self.regs.set(x, swapped);
                Ok(())
            }

            Isa::Unknown => Err(ErrorCode::InvalidOpcode),
        }
    }

    /// `LD r, imm` in its dword, word and byte immediate widths. The value
    /// is truncated to the destination view on write.
    fn execute_ld_imm<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        dst: Register,
        imm: Size,
    ) -> ExecuteResult {
        let value = self.fetch_immediate(bus, imm)?;
        self.regs.set(dst, value);
        Ok(())
    }

    /// `LD r, [addr]`: the pointer width selects the page, the destination
    /// register selects the access width.
    fn execute_ld_abs<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        dst: Register,
        ptr: Size,
    ) -> ExecuteResult {
        let raw = self.fetch_immediate(bus, ptr)?;
        let addr = self.pointer_address(raw, ptr);
        let value = self.read_sized(bus, addr, dst.size())?;
        self.regs.set(dst, value);
        Ok(())
    }

    /// `LD r, [s]`: the pointer register must match the form's width.
    fn execute_ld_ind<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        dst: Register,
        src: Register,
        ptr: Size,
    ) -> ExecuteResult {
        if src.size() != ptr {
            return Err(ErrorCode::InvalidArgument);
        }
        let addr = self.pointer_address(self.regs.get(src), ptr);
        let value = self.read_sized(bus, addr, dst.size())?;
        self.regs.set(dst, value);
        Ok(())
    }

    /// `ST [addr], r`.
    fn execute_st_abs<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        src: Register,
        ptr: Size,
    ) -> ExecuteResult {
        let raw = self.fetch_immediate(bus, ptr)?;
        let addr = self.pointer_address(raw, ptr);
        let value = self.regs.get(src);
        self.write_sized(bus, addr, value, src.size())
    }

    /// `ST [d], r`.
    fn execute_st_ind<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        src: Register,
        dst: Register,
        ptr: Size,
    ) -> ExecuteResult {
        if dst.size() != ptr {
            return Err(ErrorCode::InvalidArgument);
        }
        let addr = self.pointer_address(self.regs.get(dst), ptr);
        let value = self.regs.get(src);
        self.write_sized(bus, addr, value, src.size())
    }

    /// Rebases short pointers: word pointers live in the quick RAM page,
    /// byte pointers in the I/O page.
    fn pointer_address(&self, raw: u32, ptr: Size) -> u32 {
        match ptr {
            Size::Long => raw,
            Size::Word => QRAM_BEGIN | (raw & 0xFFFF),
            Size::Byte => IO_BEGIN | (raw & 0xFF),
        }
    }

    fn execute_arithmetic_imm<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        isa: Isa,
        dst: Register,
    ) -> ExecuteResult {
        let rhs = self.fetch_immediate(bus, Size::Long)?;
        self.apply_arithmetic(isa, dst, rhs);
        Ok(())
    }

    fn execute_arithmetic_reg(&mut self, isa: Isa, dst: Register, src: Register) -> ExecuteResult {
        if dst.size() != src.size() {
            return Err(ErrorCode::InvalidArgument);
        }
        let rhs = self.regs.get(src);
        self.apply_arithmetic(isa, dst, rhs);
        Ok(())
    }

    fn apply_arithmetic(&mut self, isa: Isa, dst: Register, rhs: u32) {
        let size = dst.size();
        let lhs = self.regs.get(dst);
        let carry = self.regs.flags.carry();

        match isa {
            Isa::AddImm | Isa::AddReg => {
                let value = self.add_value(lhs, rhs, size, false);
                self.regs.set(dst, value);
            }
            Isa::AdcImm | Isa::AdcReg => {
                let value = self.add_value(lhs, rhs, size, carry);
                self.regs.set(dst, value);
            }
            Isa::SubImm | Isa::SubReg => {
                let value = self.sub_value(lhs, rhs, size, false);
                self.regs.set(dst, value);
            }
            Isa::SbcImm | Isa::SbcReg => {
                let value = self.sub_value(lhs, rhs, size, carry);
                self.regs.set(dst, value);
            }
            Isa::CmpImm | Isa::CmpReg => {
                self.sub_value(lhs, rhs, size, false);
            }
            Isa::AndImm | Isa::AndReg => {
                let value = lhs & rhs & size.mask();
                self.logic_flags(value, true);
                self.regs.set(dst, value);
            }
            Isa::OrImm | Isa::OrReg => {
                let value = (lhs | rhs) & size.mask();
                self.logic_flags(value, false);
                self.regs.set(dst, value);
            }
            Isa::XorImm | Isa::XorReg => {
                let value = (lhs ^ rhs) & size.mask();
                self.logic_flags(value, false);
                self.regs.set(dst, value);
            }
            _ => unreachable!("not an arithmetic form"),
        }
    }

    /// Width-masked addition, updating Z/N/H/C.
    fn add_value(&mut self, lhs: u32, rhs: u32, size: Size, carry_in: bool) -> u32 {
        let mask = size.mask() as u64;
        let half = size.half_mask() as u64;
        let a = lhs as u64 & mask;
        let b = rhs as u64 & mask;
        let c = carry_in as u64;

        let wide = a + b + c;
        let value = (wide & mask) as u32;

        self.regs.flags.set_zero(value == 0);
        self.regs.flags.set_negative(false);
        self.regs.flags.set_half_carry((a & half) + (b & half) + c > half);
        self.regs.flags.set_carry(wide > mask);
        value
    }

    /// Width-masked subtraction, updating Z/N/H/C.
    fn sub_value(&mut self, lhs: u32, rhs: u32, size: Size, borrow_in: bool) -> u32 {
        let mask = size.mask() as u64;
        let half = size.half_mask() as u64;
        let a = lhs as u64 & mask;
        let b = rhs as u64 & mask;
        let w = borrow_in as u64;

        let value = (a.wrapping_sub(b).wrapping_sub(w) & mask) as u32;

        self.regs.flags.set_zero(value == 0);
        self.regs.flags.set_negative(true);
        self.regs.flags.set_half_carry((a & half) < (b & half) + w);
        self.regs.flags.set_carry(a < b + w);
        value
    }

    fn logic_flags(&mut self, value: u32, half_carry: bool) {
        self.regs.flags.set_zero(value == 0);
        self.regs.flags.set_negative(false);
        self.regs.flags.set_half_carry(half_carry);
        self.regs.flags.set_carry(false);
    }

    fn execute_shift(&mut self, isa: Isa, reg: Register) {
        let size = reg.size();
        let mask = size.mask();
        let top = size.bits() - 1;
        let value = self.regs.get(reg);
        let carry_in = self.regs.flags.carry() as u32;

        let (result, carry_out) = match isa {
            Isa::Sla => (value << 1, value >> top & 1),
            Isa::Sra => (value >> 1 | (value & (1 << top)), value & 1),
            Isa::Srl => (value >> 1, value & 1),
            Isa::Rl => (value << 1 | carry_in, value >> top & 1),
            Isa::Rlc => (value << 1 | value >> top, value >> top & 1),
            Isa::Rr => (value >> 1 | carry_in << top, value & 1),
            Isa::Rrc => (value >> 1 | (value & 1) << top, value & 1),
            _ => unreachable!("not a shift form"),
        };
        let result = result & mask;

        self.regs.flags.set_zero(result == 0);
        self.regs.flags.set_negative(false);
        self.regs.flags.set_half_carry(false);
        self.regs.flags.set_carry(carry_out != 0);
        self.regs.set(reg, result);
    }

    /// Decimal-adjusts AL after a BCD addition or subtraction.
    fn execute_daa(&mut self) {
        let mut value = self.regs.get(Register::AL);
        let negative = self.regs.flags.negative();
        let half = self.regs.flags.half_carry();
        let mut carry = self.regs.flags.carry();

        if negative {
            if half {
                value = value.wrapping_sub(0x06) & 0xFF;
            }
            if carry {
                value = value.wrapping_sub(0x60) & 0xFF;
            }
        } else {
            if half || value & 0x0F > 0x09 {
                value += 0x06;
            }
            if carry || value > 0x9F {
                value += 0x60;
                carry = true;
            }
            value &= 0xFF;
        }

        self.regs.flags.set_zero(value == 0);
        self.regs.flags.set_half_carry(false);
        self.regs.flags.set_carry(carry);
        self.regs.set(Register::AL, value);
    }
}
