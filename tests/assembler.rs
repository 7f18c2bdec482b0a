// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembler behavior: data directives, expressions, macros, labels and
//! the two-region cursor.

use tmvm::asm::{assemble_source, Builder, ErrorKind};

fn asm(source: &str) -> Vec<u8> {
    assemble_source(source, "test").expect("source assembles")
}

fn asm_err(source: &str) -> tmvm::asm::Error {
    assemble_source(source, "test").expect_err("source must not assemble")
}

#[test]
fn db_emits_a_nul_terminated_string() {
    assert_eq!(asm("db \"Hi\", 0\n"), [0x48, 0x69, 0x00, 0x00]);
}

#[test]
fn dw_of_a_define_expression() {
    assert_eq!(asm("def x = 3\ndw x*2\n"), [0x06, 0x00]);
}

#[test]
fn a_self_referencing_jump() {
    assert_eq!(
        asm("loop: jmp loop\n"),
        [0x20, 0x00, 0x00, 0x30, 0x00, 0x00],
        "opcode word then the label's load address, little-endian"
    );
}

#[test]
fn macro_arguments_and_narg() {
    let source = "macro M\ndb \\1, _NARG\nendm\nM $42, $43, $44\n";
    assert_eq!(asm(source), [0x42, 0x03]);
}

#[test]
fn repeat_emits_its_body_n_times() {
    assert_eq!(asm("repeat 3\ndb $AA\nendr\n"), [0xAA, 0xAA, 0xAA]);
}

#[test]
fn if_else_takes_the_right_branch() {
    assert_eq!(asm("if 0\ndb 1\nelse\ndb 2\nendc\n"), [0x02]);
}

#[test]
fn elif_chains_nest_in_the_right_child() {
    let source = "if 0\ndb 1\nelif 1\ndb 2\nelse\ndb 3\nendc\n";
    assert_eq!(asm(source), [0x02]);
    let source = "if 0\ndb 1\nelif 0\ndb 2\nelse\ndb 3\nendc\n";
    assert_eq!(asm(source), [0x03]);
}

#[test]
fn db_length_equals_the_item_count() {
    for n in 1..=8 {
        let items: Vec<String> = (1..=n).map(|i| i.to_string()).collect();
        let source = format!("db {}\n", items.join(", "));
        assert_eq!(asm(&source).len(), n, "db with {n} items");
    }
}

#[test]
fn db_truncates_wide_values() {
    assert_eq!(asm("db $100\n"), [0x00]);
    assert_eq!(asm("db $1FF\n"), [0xFF]);
}

#[test]
fn dw_and_dl_are_little_endian() {
    assert_eq!(asm("dw $1234\n"), [0x34, 0x12]);
    assert_eq!(asm("dl $11223344\n"), [0x44, 0x33, 0x22, 0x11]);
}

#[test]
fn ds_repeats_its_byte_sequence() {
    assert_eq!(asm("ds 3, 1, 2\n"), [1, 2, 1, 2, 1, 2]);
    assert_eq!(asm("ds 4, 0\n"), [0, 0, 0, 0]);
}

#[test]
fn df_emits_integer_then_fraction_long_words() {
    assert_eq!(
        asm("df 1.5\n"),
        [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80],
        "1.5 is integer part 1 and fraction 0x8000_0000"
    );
}

#[test]
fn number_literal_forms() {
    assert_eq!(asm("db 255, $FF, %11111111, &377, 0xFF, 0b11111111, 0o377\n").len(), 7);
    assert_eq!(asm("db $2A\n"), [0x2A]);
    assert_eq!(asm("db %1010\n"), [0x0A]);
    assert_eq!(asm("db &17\n"), [0x0F]);
    assert_eq!(asm("db 'A'\n"), [0x41]);
    assert_eq!(asm("db '\\n'\n"), [0x0A]);
}

#[test]
fn graphics_literals_interleave_two_bitplanes() {
    // Pixels 0 1 2 3 0 1 2 3: high plane 0b00110011, low plane 0b01010101.
    assert_eq!(asm("dw `01230123\n"), [0x55, 0x33]);
}

#[test]
fn string_escapes() {
    assert_eq!(asm("db \"a\\n\\\"\"\n"), [0x61, 0x0A, 0x22, 0x00]);
}

#[test]
fn expression_precedence_and_operators() {
    assert_eq!(asm("db 2 + 3 * 4\n"), [14]);
    assert_eq!(asm("db (2 + 3) * 4\n"), [20]);
    assert_eq!(asm("db 2 ** 3\n"), [8]);
    assert_eq!(asm("db 1 << 4 | 3\n"), [0x13]);
    assert_eq!(asm("db $FF & $0F ^ $03\n"), [0x0C]);
    assert_eq!(asm("db 7 % 3\n"), [1]);
    assert_eq!(asm("db -1\n"), [0xFF]);
    assert_eq!(asm("db ~0\n"), [0xFF]);
    assert_eq!(asm("db !0, !5\n"), [1, 0]);
    assert_eq!(asm("db 2 && 1, 0 || 5, 0 && 1\n"), [1, 1, 0]);
    assert_eq!(asm("db (3 > 2) + (2 == 2) + (1 != 1)\n"), [2]);
    assert_eq!(asm("db 10 / 4\n"), [2], "division happens on doubles, emission truncates");
}

#[test]
fn string_concatenation_coerces_numbers() {
    // "v" + 2 concatenates the integer rendering.
    assert_eq!(asm("db \"v\" + 2\n"), [0x76, 0x32, 0x00]);
}

#[test]
fn division_by_zero_is_an_error() {
    let err = asm_err("db 1 / 0\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
    let err = asm_err("db 1 % 0\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn forward_references_back_patch_every_site() {
    // Two references before the definition; both patched with 0x300C.
    let image = asm("jmp later\njmp later\nlater: db $99\n");
    assert_eq!(
        image,
        [
            0x20, 0x00, 0x0C, 0x30, 0x00, 0x00,
            0x20, 0x00, 0x0C, 0x30, 0x00, 0x00,
            0x99,
        ]
    );
}

#[test]
fn ram_references_patch_two_bytes() {
    // A reference captured in RAM mode records a 2-byte patch at the ROM
    // offset current at evaluation time.
    let image = asm("org ram $1000\ndw later\norg rom\ndb 1, 2, 3, 4\nlater:\n");
    assert_eq!(image, [0x04, 0x30, 0x03, 0x04], "the first two bytes were patched");
}

#[test]
fn unresolved_labels_fail_the_save() {
    let err = asm_err("jmp nowhere\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("nowhere"), "{}", err.message);
}

#[test]
fn duplicate_labels_are_rejected() {
    let err = asm_err("here:\nhere:\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn ram_mode_reserves_size_times_value() {
    // In RAM mode a scalar advances the cursor by size * value, so the
    // labels below land 8 and 2 bytes apart.
    let image = asm(
        "org ram $0\nv1: dw 4\nv2: db 2\nv3:\norg rom\ndl v1\ndl v2\ndl v3\n",
    );
    assert_eq!(
        image,
        [
            0x00, 0x00, 0x00, 0x80,
            0x08, 0x00, 0x00, 0x80,
            0x0A, 0x00, 0x00, 0x80,
        ],
        "RAM offsets rebase into the 0x8000_0000 window"
    );
}

#[test]
fn ram_mode_rejects_strings_and_ds() {
    assert_eq!(asm_err("org ram $0\ndb \"hi\"\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("org ram $0\nds 4, 0\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("org ram $0\ndf 1.0\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("org ram $0\nnop\n").kind, ErrorKind::Semantic);
}

#[test]
fn ram_cursor_cannot_pass_the_end_of_memory() {
    let err = asm_err("org ram $FFFFFFF0\ndl 8\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn shift_renumbers_macro_arguments() {
    let source = "macro M\nshift\ndb \\1\nendm\nM 1, 2\n";
    assert_eq!(asm(source), [2]);

    let source = "macro M\nshift 2\ndb \\1, _NARG\nendm\nM 9, 8, 7\n";
    assert_eq!(asm(source), [7, 3], "_NARG ignores the shift");
}

#[test]
fn shift_and_narg_outside_a_macro_fail() {
    assert_eq!(asm_err("shift\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("db _NARG\n").kind, ErrorKind::Semantic);
}

#[test]
fn macro_depth_33_overflows() {
    let err = asm_err("macro M\nM\nendm\nM\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("depth"), "{}", err.message);
}

#[test]
fn macro_redefinition_is_rejected() {
    let err = asm_err("macro M\nendm\nmacro M\nendm\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn unknown_macro_calls_are_rejected() {
    let err = asm_err("frobnicate 1, 2\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn def_compound_assignment() {
    assert_eq!(asm("def x = 3\ndef x += 2\ndw x\n"), [0x05, 0x00]);
    assert_eq!(asm("def x = 6\ndef x <<= 2\ndb x\n"), [24]);
    assert_eq!(asm("def x = 6\ndef x = 1\ndb x\n"), [1]);
}

#[test]
fn assert_failure_reports_its_message() {
    let err = asm_err("assert 1 == 2, \"sizes disagree\"\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("sizes disagree"), "{}", err.message);

    assert_eq!(asm("assert 2 == 2\ndb 1\n"), [1]);
}

#[test]
fn errors_carry_file_line_and_column() {
    let err = asm_err("db 1\ndb \"x\" * 2\n");
    let rendered = err.to_string();
    assert!(rendered.starts_with("test:2:"), "{rendered}");
}

#[test]
fn unterminated_blocks_are_parse_errors() {
    assert_eq!(asm_err("macro M\ndb 1\n").kind, ErrorKind::Parse);
    assert_eq!(asm_err("repeat 2\ndb 1\n").kind, ErrorKind::Parse);
    assert_eq!(asm_err("if 1\ndb 1\n").kind, ErrorKind::Parse);
}

#[test]
fn lexical_failures() {
    assert_eq!(asm_err("db \"open\n").kind, ErrorKind::Lexical);
    assert_eq!(asm_err("db 'ab'\n").kind, ErrorKind::Lexical);
    assert_eq!(asm_err("dw `0123\n").kind, ErrorKind::Lexical);
    assert_eq!(asm_err("db \"bad\\q\"\n").kind, ErrorKind::Lexical);
    assert_eq!(asm_err("db 0x\n").kind, ErrorKind::Lexical);
}

#[test]
fn push_of_a_word_register_is_rejected() {
    let err = asm_err("push aw\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("32-bit"), "{}", err.message);
}

#[test]
fn pointer_register_widths_are_checked() {
    assert_eq!(asm_err("ld al, [aw]\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("ldq al, [a]\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("ldh al, [bw]\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("mv a, bl\n").kind, ErrorKind::Semantic);
    assert_eq!(asm_err("add a, bw\n").kind, ErrorKind::Semantic);
}

#[test]
fn sec_packs_its_code_into_the_operand_byte() {
    assert_eq!(asm("sec $2A\n"), [0x03, 0x2A]);
}

#[test]
fn conditions_encode_in_the_x_nibble() {
    assert_eq!(asm("jmp $3000\n")[..2], [0x20, 0x00]);
    assert_eq!(asm("jmp $3000, z\n")[..2], [0x20, 0x10]);
    assert_eq!(asm("jmp $3000, nz\n")[..2], [0x20, 0x20]);
    assert_eq!(asm("jmp $3000, c\n")[..2], [0x20, 0x30]);
    assert_eq!(asm("jmp $3000, nc\n")[..2], [0x20, 0x40]);
    assert_eq!(asm("ret\n"), [0x24, 0x00]);
    assert_eq!(asm("ret z\n"), [0x24, 0x10]);
}

#[test]
fn alternate_spellings_share_a_tag() {
    assert_eq!(asm("jp $3000\n"), asm("jmp $3000\n"));
    assert_eq!(asm("cpl al\n"), asm("not al\n"));
    assert_eq!(asm("byte 1\n"), asm("db 1\n"));
    assert_eq!(asm("rept 2\ndb 1\nendr\n"), asm("repeat 2\ndb 1\nendr\n"));
    assert_eq!(
        asm("if 1\ndb 1\nendif\n"),
        asm("if 1\ndb 1\nendc\n")
    );
}

#[test]
fn labels_share_a_line_with_their_statement() {
    let inline = asm("start: nop\n");
    let split = asm("start:\nnop\n");
    assert_eq!(inline, split);
}

#[test]
fn include_files_are_deduplicated() {
    let dir = std::env::temp_dir().join(format!("tmasm-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let common = dir.join("common.inc");
    let main = dir.join("main.asm");
    std::fs::write(&common, "db $11\n").unwrap();
    std::fs::write(
        &main,
        format!(
            "include \"{0}\"\ninclude \"{0}\"\ndb $22\n",
            common.display()
        ),
    )
    .unwrap();

    let mut builder = Builder::new();
    builder.build_file(&main).unwrap();
    let image = builder.finish().unwrap();
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(image, [0x11, 0x22], "the second include expands to nothing");
}

#[test]
fn incbin_slices_with_offset_and_length() {
    let dir = std::env::temp_dir().join(format!("tmasm-incbin-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let blob = dir.join("blob.bin");
    std::fs::write(&blob, [1u8, 2, 3, 4, 5, 6]).unwrap();

    let image = asm(&format!("incbin \"{}\", 2, 3\n", blob.display()));
    assert_eq!(image, [3, 4, 5]);

    let image = asm(&format!("incbin \"{}\"\n", blob.display()));
    assert_eq!(image, [1, 2, 3, 4, 5, 6]);

    let err = asm_err(&format!("incbin \"{}\", 4, 4\n", blob.display()));
    assert_eq!(err.kind, ErrorKind::Semantic);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_include_is_an_io_error() {
    let err = asm_err("include \"no-such-file-anywhere.inc\"\n");
    assert_eq!(err.kind, ErrorKind::Io);
}

#[test]
fn comments_run_to_end_of_line() {
    assert_eq!(asm("db 1 ; db 2\ndb 3\n"), [1, 3]);
}
