// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The assembler.
//!
//! Compilation is a straight pipeline: the [lexer](lexer::Lexer) turns a
//! source file into tokens, the [parser] climbs them into a [syntax] tree,
//! and the [Builder] walks the tree emitting bytes and resolving symbols.
//! Forward label references are back-patched when the label is defined;
//! saving the image fails if any reference never resolves.

pub mod builder;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod token;
pub mod value;

pub use builder::Builder;
pub use error::{Error, ErrorKind};
pub use value::Value;

use std::path::Path;

/// Assembles a source string into a flat ROM image.
pub fn assemble_source(source: &str, name: &str) -> error::Result<Vec<u8>> {
    let mut builder = Builder::new();
    builder.build_source(source, name)?;
    builder.finish()
}

/// Assembles a source file into a flat ROM image.
pub fn assemble_file(path: &Path) -> error::Result<Vec<u8>> {
    let mut builder = Builder::new();
    builder.build_file(path)?;
    builder.finish()
}
