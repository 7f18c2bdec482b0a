// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembler errors.
//!
//! Errors are created at the innermost failing node with the source
//! location of that node, then propagated upward unchanged; the driver
//! prints the rendered error once.

use crate::asm::token::SourceLoc;

/// The class of an assembler error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad literal, bad escape, malformed number.
    Lexical,
    /// Unexpected token, unterminated block, missing operator.
    Parse,
    /// Type mismatch, bad operand form, unresolved label, macro misuse.
    Semantic,
    /// Include/incbin/output file trouble.
    Io,
}

impl ErrorKind {
    fn name(self) -> &'static str {
        match self {
            Self::Lexical => "lexical error",
            Self::Parse => "parse error",
            Self::Semantic => "error",
            Self::Io => "i/o error",
        }
    }
}

/// An assembler diagnostic with its source location.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub loc: Option<SourceLoc>,
    pub message: String,
}

impl Error {
    pub fn lexical(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Lexical, loc: Some(loc), message: message.into() }
    }

    pub fn parse(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Parse, loc: Some(loc), message: message.into() }
    }

    pub fn semantic(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Semantic, loc: Some(loc), message: message.into() }
    }

    pub fn io(loc: Option<SourceLoc>, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, loc, message: message.into() }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{}: {}: {}", loc, self.kind.name(), self.message),
            None => write!(f, "{}: {}", self.kind.name(), self.message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
