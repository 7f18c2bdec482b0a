// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Program header parsing and serialization.

use tmvm::program::{Header, HeaderError, HEADER_SIZE, MAGIC};

fn sample() -> Header {
    Header {
        version: (1, 2, 3),
        program_size: 4,
        wram_size: 0x1_0000,
        sram_size: 0x800,
        name: "Test Program".to_string(),
        author: "Nobody".to_string(),
        description: "A header round-trip fixture".to_string(),
    }
}

#[test]
fn header_round_trips() {
    let header = sample();
    let mut file = Vec::new();
    header.write_to(&mut file);
    assert_eq!(file.len(), HEADER_SIZE);
    file.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);

    assert!(Header::present(&file));
    let (parsed, image) = Header::parse(&file).unwrap();
    assert_eq!(parsed, header);
    assert_eq!(image, [0xAA, 0xBB, 0xCC, 0xDD]);
}

#[test]
fn bare_images_have_no_header() {
    assert!(!Header::present(&[0x20, 0x00, 0x00, 0x30]));
    assert!(!Header::present(&MAGIC[..2]));
}

#[test]
fn bad_magic_is_rejected() {
    let mut file = vec![0u8; HEADER_SIZE];
    file[..4].copy_from_slice(b"TMBX");
    assert_eq!(
        Header::parse(&file),
        Err(HeaderError::BadMagic(*b"TMBX"))
    );
}

#[test]
fn truncated_headers_are_rejected() {
    let mut file = Vec::new();
    sample().write_to(&mut file);
    file.truncate(HEADER_SIZE - 1);
    assert_eq!(Header::parse(&file), Err(HeaderError::Truncated));
}

#[test]
fn declared_size_must_fit_the_file() {
    let mut header = sample();
    header.program_size = 100;
    let mut file = Vec::new();
    header.write_to(&mut file);
    file.extend_from_slice(&[0; 10]);
    assert_eq!(Header::parse(&file), Err(HeaderError::BadProgramSize(100)));
}
