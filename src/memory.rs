// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bus trait and the fixed memory map.
//!
//! The CPU core itself never enforces region access rights; that is the
//! host's job inside its [Bus] implementation. The core only reports bus
//! faults (a `None` return) through the error code register.

/// Read-only metadata block.
pub const METADATA_BEGIN: u32 = 0x0000_0000;
pub const METADATA_END: u32 = 0x0000_0FFF;

/// Restart vectors, 16 bytes per `RST` target.
pub const RST_BEGIN: u32 = 0x0000_1000;
pub const RST_END: u32 = 0x0000_1FFF;

/// Interrupt vectors, 16 bytes per interrupt.
pub const INT_BEGIN: u32 = 0x0000_2000;
pub const INT_END: u32 = 0x0000_2FFF;

/// Executable program code. Programs are loaded at `CODE_BEGIN`.
pub const CODE_BEGIN: u32 = 0x0000_3000;
pub const CODE_END: u32 = 0x3FFF_FFFF;

/// Read-only program data.
pub const DATA_BEGIN: u32 = 0x4000_0000;
pub const DATA_END: u32 = 0x7FFF_FFFF;

/// General-purpose RAM.
pub const DRAM_BEGIN: u32 = 0x8000_0000;
pub const DRAM_END: u32 = 0xDFFF_FFFF;

/// Executable RAM.
pub const XRAM_BEGIN: u32 = 0xE000_0000;
pub const XRAM_END: u32 = 0xFFFC_FFFF;

/// Data stack. Grows downward from `DSTACK_END`.
pub const DSTACK_BEGIN: u32 = 0xFFFD_0000;
pub const DSTACK_END: u32 = 0xFFFD_FFFF;

/// Call stack. Grows downward from `CSTACK_END`.
pub const CSTACK_BEGIN: u32 = 0xFFFE_0000;
pub const CSTACK_END: u32 = 0xFFFE_FFFF;

/// Quick RAM, reachable through the 16-bit `LDQ`/`STQ` forms.
pub const QRAM_BEGIN: u32 = 0xFFFF_0000;
pub const QRAM_END: u32 = 0xFFFF_FEFF;

/// Memory-mapped I/O ports, reachable through the 8-bit `LDH`/`STH` forms.
pub const IO_BEGIN: u32 = 0xFFFF_FF00;
pub const IO_END: u32 = 0xFFFF_FFFF;

/// The trait to be implemented by the host memory system driven by the core.
///
/// A `None` return from [read](Bus::read) or [write](Bus::write) is a bus
/// fault: it aborts the current instruction and raises `BAD_READ`,
/// `BAD_WRITE` or `BAD_EXECUTE` in the error code register, depending on
/// what the core was doing with the address.
///
/// [tick](Bus::tick) is invoked once per consumed cycle; this is where
/// peripherals observe bus traffic. Returning `false` aborts execution with
/// `HARDWARE_FAULT`.
///
/// The trait is implemented for `[u8]`, interpreted as memory starting at
/// address zero, which is convenient for tests and small hosts.
pub trait Bus {
    /// Returns the byte at the given address.
    #[must_use]
    fn read(&mut self, addr: u32) -> Option<u8>;

    /// Stores a byte at the given address.
    #[must_use]
    fn write(&mut self, addr: u32, value: u8) -> Option<()>;

    /// Advances the host clock by the given number of cycles.
    #[must_use]
    fn tick(&mut self, cycles: u32) -> bool;
}

impl Bus for [u8] {
    fn read(&mut self, addr: u32) -> Option<u8> {
        self.get(addr as usize).copied()
    }

    fn write(&mut self, addr: u32, value: u8) -> Option<()> {
        let byte = self.get_mut(addr as usize)?;
        *byte = value;
        Some(())
    }

    fn tick(&mut self, _cycles: u32) -> bool {
        true
    }
}
