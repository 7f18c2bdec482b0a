// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CPU status flags.

use bitflags::bitflags;

use crate::isa::Condition;

bitflags! {
    /// The four condition flags of the CPU, stored in bits 7..4 of an 8-bit word.
    ///
    /// Bits 3..0 are not backed by anything and always read as zero.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Set when the result of the last operation was zero.
        const ZERO = 0b1000_0000;
        /// Set by the subtraction family of instructions.
        const NEGATIVE = 0b0100_0000;
        /// Carry out of the low nibble boundary (bit 3, 11 or 27 per operand width).
        const HALF_CARRY = 0b0010_0000;
        /// Carry out of the full operand width.
        const CARRY = 0b0001_0000;
    }
}

impl Flags {
    #[inline]
    pub fn set_zero(&mut self, zero: bool) {
        self.set(Flags::ZERO, zero);
    }

    #[inline]
    pub fn set_negative(&mut self, negative: bool) {
        self.set(Flags::NEGATIVE, negative);
    }

    #[inline]
    pub fn set_half_carry(&mut self, half_carry: bool) {
        self.set(Flags::HALF_CARRY, half_carry);
    }

    #[inline]
    pub fn set_carry(&mut self, carry: bool) {
        self.set(Flags::CARRY, carry);
    }

    #[inline]
    pub fn zero(self) -> bool {
        self.contains(Flags::ZERO)
    }

    #[inline]
    pub fn negative(self) -> bool {
        self.contains(Flags::NEGATIVE)
    }

    #[inline]
    pub fn half_carry(self) -> bool {
        self.contains(Flags::HALF_CARRY)
    }

    #[inline]
    pub fn carry(self) -> bool {
        self.contains(Flags::CARRY)
    }

    /// Evaluates a branch condition against the current flags.
    pub fn condition(self, cond: Condition) -> bool {
        match cond {
            Condition::None => true,
            Condition::Zero => self.zero(),
            Condition::NotZero => !self.zero(),
            Condition::Carry => self.carry(),
            Condition::NotCarry => !self.carry(),
        }
    }
}
