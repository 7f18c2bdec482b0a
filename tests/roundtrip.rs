// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assemble → decode → disassemble → re-assemble across the whole
//! instruction table. The disassembly of any instruction must assemble
//! back to the same bytes.

use tmvm::instruction::{ImageReader, Instruction};
use tmvm::isa::Isa;
use tmvm::memory::CODE_BEGIN;

/// One source line per instruction form.
const FORMS: &[(&str, Isa)] = &[
    ("nop", Isa::Nop),
    ("stop", Isa::Stop),
    ("halt", Isa::Halt),
    ("sec $2A", Isa::Sec),
    ("cec", Isa::Cec),
    ("di", Isa::Di),
    ("ei", Isa::Ei),
    ("daa", Isa::Daa),
    ("scf", Isa::Scf),
    ("ccf", Isa::Ccf),
    ("ld a, $DEADBEEF", Isa::LdImm),
    ("ld bw, $1234", Isa::LdImm),
    ("ld cl, [$80000040]", Isa::LdAbs),
    ("ld d, [b]", Isa::LdInd),
    ("ldq aw, $77", Isa::LdqImm),
    ("ldq al, [$40]", Isa::LdqAbs),
    ("ldq bl, [cw]", Isa::LdqInd),
    ("ldh al, $12", Isa::LdhImm),
    ("ldh bh, [$7F]", Isa::LdhAbs),
    ("ldh cl, [dl]", Isa::LdhInd),
    ("st [$80000040], a", Isa::StAbs),
    ("st [b], cl", Isa::StInd),
    ("stq [$40], dw", Isa::StqAbs),
    ("stq [aw], bl", Isa::StqInd),
    ("sth [$7F], ch", Isa::SthAbs),
    ("sth [dl], al", Isa::SthInd),
    ("mv a, b", Isa::Mv),
    ("mv cl, dh", Isa::Mv),
    ("jmp $3000", Isa::Jmp),
    ("jmp $3000, nz", Isa::Jmp),
    ("jmp $3000, c", Isa::Jmp),
    ("jpb -4", Isa::Jpb),
    ("jpb 96", Isa::Jpb),
    ("call $12345678", Isa::Call),
    ("rst 5", Isa::Rst),
    ("ret", Isa::Ret),
    ("ret nc", Isa::Ret),
    ("reti", Isa::Reti),
    ("jps", Isa::Jps),
    ("push a", Isa::Push),
    ("pop d", Isa::Pop),
    ("inc al", Isa::Inc),
    ("dec bw", Isa::Dec),
    ("add a, $10", Isa::AddImm),
    ("add al, bl", Isa::AddReg),
    ("adc cw, $FFFF", Isa::AdcImm),
    ("adc cw, dw", Isa::AdcReg),
    ("sub a, $1", Isa::SubImm),
    ("sub b, c", Isa::SubReg),
    ("sbc al, $5", Isa::SbcImm),
    ("sbc dh, ah", Isa::SbcReg),
    ("cmp a, $99", Isa::CmpImm),
    ("cmp bw, cw", Isa::CmpReg),
    ("and al, $F0", Isa::AndImm),
    ("and a, b", Isa::AndReg),
    ("or bl, $0F", Isa::OrImm),
    ("or c, d", Isa::OrReg),
    ("xor a, $FFFFFFFF", Isa::XorImm),
    ("xor al, al", Isa::XorReg),
    ("not cw", Isa::Not),
    ("sla al", Isa::Sla),
    ("sra bw", Isa::Sra),
    ("srl c", Isa::Srl),
    ("rl dl", Isa::Rl),
    ("rlc ah", Isa::Rlc),
    ("rr b", Isa::Rr),
    ("rrc cl", Isa::Rrc),
    ("bit 7, al", Isa::Bit),
    ("bit 31, a", Isa::Bit),
    ("res 0, bw", Isa::Res),
    ("set 15, cw", Isa::Set),
    ("swap dl", Isa::Swap),
];

fn assemble_line(line: &str) -> Vec<u8> {
    tmvm::asm::assemble_source(&format!("{line}\n"), "roundtrip")
        .unwrap_or_else(|e| panic!("\"{line}\" does not assemble: {e}"))
}

#[test]
fn every_form_assembles_decodes_and_reassembles() {
    for (line, isa) in FORMS {
        let bytes = assemble_line(line);

        let mut reader = ImageReader::new(&bytes);
        let inst = Instruction::decode(&mut reader, CODE_BEGIN)
            .unwrap_or_else(|| panic!("\"{line}\" does not decode"));
        assert_eq!(inst.isa(), *isa, "\"{line}\" decodes to the wrong form");
        assert_eq!(reader.pos, bytes.len(), "\"{line}\" leaves trailing bytes");

        let listing = inst.disassemble();
        let again = assemble_line(&listing);
        assert_eq!(
            again, bytes,
            "\"{line}\" disassembles to \"{listing}\", which assembles differently"
        );
    }
}

#[test]
fn the_decoder_reads_the_ii_byte_first() {
    // The opcode word is stored II first; `jmp loop` at the image start is
    // the bytes 20 00 followed by the load address of the label.
    let bytes = assemble_line("loop: jmp loop");
    assert_eq!(bytes[0], 0x20);
    assert_eq!(bytes[1], 0x00);

    let mut reader = ImageReader::new(&bytes);
    let inst = Instruction::decode(&mut reader, CODE_BEGIN).unwrap();
    assert_eq!(inst.opcode, 0x2000);
    assert_eq!(inst.disassemble(), "JMP $3000");
}

#[test]
fn unknown_opcodes_still_decode_for_listing() {
    let bytes = [0xEE, 0x00];
    let mut reader = ImageReader::new(&bytes);
    let inst = Instruction::decode(&mut reader, CODE_BEGIN).unwrap();
    assert_eq!(inst.isa(), Isa::Unknown);
    assert!(inst.disassemble().contains("Unknown instruction"));
}

#[test]
fn truncated_images_do_not_decode() {
    // CALL with only half its address present.
    let bytes = [0x22, 0x00, 0x10, 0x20];
    let mut reader = ImageReader::new(&bytes);
    assert!(Instruction::decode(&mut reader, CODE_BEGIN).is_none());
}
