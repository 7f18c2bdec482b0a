// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The assembler command line tool.
//!
//! Usage: `tmasm -i <input file> -o <output file> [-l]`

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use tmvm::asm::{self, lexer::Lexer};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage(exec: &str) {
    println!("Assembles a source file into a flat program image.");
    println!("Usage: {exec} -i <input file> -o <output file> [-l]");
    println!();
    println!("  -i, --input-file <path>   the source file to assemble");
    println!("  -o, --output-file <path>  where to write the image (not needed with -l)");
    println!("  -l, --lex-only            print the token stream and exit");
    println!("  -h, --help                show this help");
    println!("  -v, --version             show the version");
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args();
    let exec = args.next().unwrap_or_else(|| "tmasm".to_string());

    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut lex_only = false;

    while let Some(arg) = args.next() {
        match &arg[..] {
            "-i" | "--input-file" => match args.next() {
                Some(path) => input = Some(PathBuf::from(path)),
                None => {
                    eprintln!("{exec}: expected a path after {arg}");
                    return ExitCode::FAILURE;
                }
            },
            "-o" | "--output-file" => match args.next() {
                Some(path) => output = Some(PathBuf::from(path)),
                None => {
                    eprintln!("{exec}: expected a path after {arg}");
                    return ExitCode::FAILURE;
                }
            },
            "-l" | "--lex-only" => lex_only = true,
            "-h" | "--help" => {
                usage(&exec);
                return ExitCode::SUCCESS;
            }
            "-v" | "--version" => {
                println!("{exec} {VERSION}");
                return ExitCode::SUCCESS;
            }
            _ => {
                eprintln!("{exec}: unknown parameter \"{arg}\"");
                usage(&exec);
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(input) = input else {
        eprintln!("{exec}: an input file is required");
        usage(&exec);
        return ExitCode::FAILURE;
    };

    if lex_only {
        return lex_listing(&input);
    }

    let Some(output) = output else {
        eprintln!("{exec}: an output file is required");
        usage(&exec);
        return ExitCode::FAILURE;
    };

    let mut builder = asm::Builder::new();
    if let Err(e) = builder.build_file(&input) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = builder.save_binary(&output) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// `-l`: tokenize the input and print one token per line.
fn lex_listing(input: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("cannot read {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };
    let file: Rc<str> = input.display().to_string().into();
    match Lexer::lex_source(&source, file) {
        Ok(tokens) => {
            for token in &tokens {
                println!("{}: {token}", token.loc);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
