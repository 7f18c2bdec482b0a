// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error codes raised through the EC register.

/// The error kinds the core (or the host) can store in the 8-bit EC
/// register. Storing any non-[Ok](ErrorCode::Ok) code stops the CPU.
///
/// You can directly cast the enum to u8 to get the raw code.
/// ```
/// use tmvm::exception::ErrorCode;
/// assert_eq!(ErrorCode::BadRead as u8, 5);
/// ```
///
/// `BusRead` and `BusWrite` are never raised by the core itself; they are
/// reserved for hosts that signal their own bus-level faults through
/// [Cpu::set_error_code](crate::Cpu::set_error_code).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    #[default]
    Ok = 0,
    /// The fetched opcode byte names no instruction.
    InvalidOpcode,
    /// An operand nibble violates the instruction's form (wrong register width).
    InvalidArgument,
    BusRead,
    BusWrite,
    /// The host refused a data read.
    BadRead,
    /// The host refused a data write.
    BadWrite,
    /// The host refused an instruction fetch.
    BadExecute,
    DataStackOverflow,
    DataStackUnderflow,
    CallStackOverflow,
    /// The host tick callback returned false.
    HardwareFault,
}

impl ErrorCode {
    /// Returns the named code for a raw EC value, if it has a name.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Ok),
            1 => Some(Self::InvalidOpcode),
            2 => Some(Self::InvalidArgument),
            3 => Some(Self::BusRead),
            4 => Some(Self::BusWrite),
            5 => Some(Self::BadRead),
            6 => Some(Self::BadWrite),
            7 => Some(Self::BadExecute),
            8 => Some(Self::DataStackOverflow),
            9 => Some(Self::DataStackUnderflow),
            10 => Some(Self::CallStackOverflow),
            11 => Some(Self::HardwareFault),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::InvalidOpcode => "INVALID_OPCODE",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::BusRead => "BUS_READ",
            Self::BusWrite => "BUS_WRITE",
            Self::BadRead => "BAD_READ",
            Self::BadWrite => "BAD_WRITE",
            Self::BadExecute => "BAD_EXECUTE",
            Self::DataStackOverflow => "DATA_STACK_OVERFLOW",
            Self::DataStackUnderflow => "DATA_STACK_UNDERFLOW",
            Self::CallStackOverflow => "CALL_STACK_OVERFLOW",
            Self::HardwareFault => "HARDWARE_FAULT",
        };
        write!(f, "{name}")
    }
}
