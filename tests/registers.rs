// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register file properties: the 16- and 8-bit views alias the low bits of
//! their cell, and writes through a view never disturb unrelated bits.

use tmvm::flags::Flags;
use tmvm::registers::{Register, Registers, Size, Slice};

const VIEWS: [[Register; 4]; 4] = [
    [Register::A, Register::AW, Register::AH, Register::AL],
    [Register::B, Register::BW, Register::BH, Register::BL],
    [Register::C, Register::CW, Register::CH, Register::CL],
    [Register::D, Register::DW, Register::DH, Register::DL],
];

#[test]
fn register_views_alias_low_bits() {
    for views in VIEWS {
        let [full, word, high, low] = views;
        let mut regs = Registers::default();

        regs.set(full, 0x1234_5678);
        assert_eq!(regs.get(full), 0x1234_5678, "{full}");
        assert_eq!(regs.get(word), 0x5678, "{word}");
        assert_eq!(regs.get(high), 0x56, "{high}");
        assert_eq!(regs.get(low), 0x78, "{low}");
    }
}

#[test]
fn narrow_writes_preserve_unrelated_bits() {
    for views in VIEWS {
        let [full, word, high, low] = views;
        let mut regs = Registers::default();

        regs.set(full, 0xAABB_CCDD);
        regs.set(low, 0x11);
        assert_eq!(regs.get(full), 0xAABB_CC11, "low write in {full}");

        regs.set(high, 0x22);
        assert_eq!(regs.get(full), 0xAABB_2211, "high write in {full}");

        regs.set(word, 0x3344);
        assert_eq!(regs.get(full), 0xAABB_3344, "word write in {full}");

        // Values wider than the view are truncated on write.
        regs.set(low, 0xFFFF_FF55);
        assert_eq!(regs.get(full), 0xAABB_3355, "truncated write in {full}");
    }
}

#[test]
fn write_read_sequences_leave_other_cells_alone() {
    let mut regs = Registers::default();
    regs.set(Register::A, 0x0101_0101);
    regs.set(Register::B, 0x0202_0202);
    regs.set(Register::CL, 0x33);
    regs.set(Register::DH, 0x44);

    assert_eq!(regs.get(Register::A), 0x0101_0101);
    assert_eq!(regs.get(Register::B), 0x0202_0202);
    assert_eq!(regs.get(Register::C), 0x0000_0033);
    assert_eq!(regs.get(Register::D), 0x0000_4400);
}

#[test]
fn register_encoding_packs_cell_and_slice() {
    // Upper two bits of the nibble select the cell, lower two the slice.
    for (i, views) in VIEWS.iter().enumerate() {
        for (j, reg) in views.iter().enumerate() {
            assert_eq!(*reg as u8, (i as u8) << 2 | j as u8, "{reg}");
            assert_eq!(Register::from_nibble((i as u8) << 2 | j as u8), *reg);
            assert_eq!(reg.cell(), i);
        }
    }

    assert_eq!(Register::A.slice(), Slice::Long);
    assert_eq!(Register::AW.slice(), Slice::Word);
    assert_eq!(Register::AH.slice(), Slice::ByteHigh);
    assert_eq!(Register::AL.slice(), Slice::ByteLow);
    assert_eq!(Register::BW.size(), Size::Word);
    assert_eq!(Register::CH.size(), Size::Byte);
    assert_eq!(Register::D.size(), Size::Long);
}

#[test]
fn register_names_round_trip() {
    for views in VIEWS {
        for reg in views {
            assert_eq!(Register::from_name(reg.name()), Some(reg));
            assert_eq!(Register::from_name(&reg.name().to_lowercase()), Some(reg));
        }
    }
    assert_eq!(Register::from_name("E"), None);
}

#[test]
fn flags_live_in_the_high_nibble() {
    // Z, N, H and C occupy bits 7..4; bits 3..0 of the flags word do not exist.
    assert_eq!(Flags::ZERO.bits(), 0x80);
    assert_eq!(Flags::NEGATIVE.bits(), 0x40);
    assert_eq!(Flags::HALF_CARRY.bits(), 0x20);
    assert_eq!(Flags::CARRY.bits(), 0x10);
    assert_eq!(Flags::all().bits(), 0xF0);
    assert_eq!(Flags::from_bits_truncate(0xFF).bits(), 0xF0);
}
