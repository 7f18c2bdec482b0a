// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Little program to disassemble the given binary image for the specified
//! range.
//!
//! Usage: `tmdis <input file> [-o <output file>] [-b <beginning pos>] [-e <ending position>]`

use std::fs::File;
use std::io::{Read, Write};
use std::process::ExitCode;

use tmvm::instruction::{ImageReader, Instruction};
use tmvm::memory::CODE_BEGIN;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args();
    let exec = args.next().unwrap_or_else(|| "tmdis".to_string());
    let Some(inname) = args.next() else {
        println!("Disassembles the instructions in the given program image, starting and ending at the given byte offsets.");
        println!("Addresses are shown relative to the program load address.");
        println!("Usage: {exec} <input file> [-o <output file>] [-b <beginning pos>] [-e <ending position>]");
        return ExitCode::FAILURE;
    };

    let mut infile = match File::open(&inname) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open input file \"{inname}\": {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut outname = String::new();
    let mut beg = 0usize;
    let mut end = usize::MAX;

    while let Some(arg) = args.next() {
        match &arg[..] {
            "-o" => outname = args.next().expect("Expected output filename with parameter -o"),
            "-b" => {
                beg = args
                    .next()
                    .expect("Expected beginning position with parameter -b")
                    .parse()
                    .expect("Expected number for beginning position")
            }
            "-e" => {
                end = args
                    .next()
                    .expect("Expected ending position with parameter -e")
                    .parse()
                    .expect("Expected number for ending position")
            }
            _ => {
                eprintln!("Unknown parameter \"{arg}\"");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut data = Vec::new();
    if let Err(e) = infile.read_to_end(&mut data) {
        eprintln!("Failed to read \"{inname}\": {e}");
        return ExitCode::FAILURE;
    }
    if end > data.len() {
        end = data.len();
    }

    let mut outfile = File::create(&outname).ok();

    let mut reader = ImageReader::at(&data, beg);
    while reader.pos < end {
        let Some(inst) = Instruction::decode(&mut reader, CODE_BEGIN) else {
            eprintln!("Image ends in the middle of an instruction at offset {:#X}", reader.pos);
            return ExitCode::FAILURE;
        };

        if let Some(outfile) = outfile.as_mut() {
            if let Err(e) = writeln!(outfile, "{:#010X} {}", inst.addr, inst) {
                eprintln!("Failed to write output: {e}");
                return ExitCode::FAILURE;
            }
        } else {
            println!("{:#010X} {}", inst.addr, inst);
        }
    }

    ExitCode::SUCCESS
}
