// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The streaming tokenizer.
//!
//! A file is read whole, tokenized in one pass and closed before anything
//! is evaluated. The lexer also owns include deduplication: every file is
//! resolved to its canonical path, and a path seen before lexes to nothing
//! instead of being tokenized again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::asm::error::{Error, Result};
use crate::asm::token::{lookup_keyword, Op, Radix, SourceLoc, Token, TokenKind};
use crate::registers::Register;

/// The tokenizer, carrying the set of files already included.
#[derive(Default)]
pub struct Lexer {
    included: HashSet<PathBuf>,
}

impl Lexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes a file, deduplicating includes.
    ///
    /// Returns `Ok(None)` when the file was already included earlier; a
    /// repeat include is a success that produces nothing.
    pub fn lex_file(&mut self, path: &Path, from: Option<SourceLoc>) -> Result<Option<Vec<Token>>> {
        let canonical = path
            .canonicalize()
            .map_err(|e| Error::io(from.clone(), format!("cannot open {}: {e}", path.display())))?;
        if !self.included.insert(canonical) {
            return Ok(None);
        }

        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::io(from, format!("cannot read {}: {e}", path.display())))?;
        let file: Rc<str> = path.display().to_string().into();
        Self::lex_source(&source, file).map(Some)
    }

    /// Tokenizes a source string under the given file name.
    pub fn lex_source(source: &str, file: Rc<str>) -> Result<Vec<Token>> {
        let mut scanner = Scanner::new(source, file);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Character-level cursor over one source file.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    file: Rc<str>,
}

impl Scanner {
    fn new(source: &str, file: Rc<str>) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file,
        }
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.file.clone(), self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes the next character when it matches.
    fn eat(&mut self, want: char) -> bool {
        if self.peek() == Some(want) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        // Skip blanks and comments; a comment runs to end of line.
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let loc = self.loc();
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, loc });
        };

        let kind = match c {
            '\n' => {
                self.bump();
                TokenKind::Newline
            }
            'a'..='z' | 'A'..='Z' | '_' => self.lex_word(),
            '0'..='9' => self.lex_number(&loc)?,
            '$' => {
                self.bump();
                self.lex_radix_digits(&loc, 16, Radix::Hex, is_hex_digit)?
            }
            '%' if self.peek_at(1).is_some_and(|d| d == '0' || d == '1') => {
                self.bump();
                self.lex_radix_digits(&loc, 2, Radix::Binary, |d| d == '0' || d == '1')?
            }
            '&' if self.peek_at(1).is_some_and(|d| ('0'..='7').contains(&d)) => {
                self.bump();
                self.lex_radix_digits(&loc, 8, Radix::Octal, |d| ('0'..='7').contains(&d))?
            }
            '`' => {
                self.bump();
                self.lex_graphics(&loc)?
            }
            '\'' => {
                self.bump();
                self.lex_char(&loc)?
            }
            '"' => {
                self.bump();
                self.lex_string(&loc)?
            }
            '@' | '\\' => {
                self.bump();
                self.lex_argument(&loc, c)?
            }
            _ => self.lex_operator(&loc)?,
        };

        Ok(Token { kind, loc })
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }

        if let Some(entry) = lookup_keyword(&word) {
            TokenKind::Keyword(entry.tag)
        } else if let Some(reg) = Register::from_name(&word) {
            TokenKind::Register(reg)
        } else {
            TokenKind::Identifier(word)
        }
    }

    /// Decimal numbers (with an optional fraction) and the `0b`/`0o`/`0x`
    /// prefix forms.
    fn lex_number(&mut self, loc: &SourceLoc) -> Result<TokenKind> {
        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('b') | Some('B') => {
                    self.bump();
                    self.bump();
                    return self.lex_radix_digits(loc, 2, Radix::Binary, |d| d == '0' || d == '1');
                }
                Some('o') | Some('O') => {
                    self.bump();
                    self.bump();
                    return self.lex_radix_digits(loc, 8, Radix::Octal, |d| ('0'..='7').contains(&d));
                }
                Some('x') | Some('X') => {
                    self.bump();
                    self.bump();
                    return self.lex_radix_digits(loc, 16, Radix::Hex, is_hex_digit);
                }
                _ => {}
            }
        }

        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }

        let value: f64 = text
            .parse()
            .map_err(|_| Error::lexical(loc.clone(), format!("malformed number \"{text}\"")))?;
        Ok(TokenKind::Number { value, radix: Radix::Decimal })
    }

    /// Digits of a prefixed literal; the prefix is already consumed.
    fn lex_radix_digits(
        &mut self,
        loc: &SourceLoc,
        radix: u32,
        kind: Radix,
        accept: fn(char) -> bool,
    ) -> Result<TokenKind> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if accept(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return Err(Error::lexical(loc.clone(), "malformed number: missing digits"));
        }
        let value = u64::from_str_radix(&text, radix)
            .map_err(|_| Error::lexical(loc.clone(), format!("malformed number \"{text}\"")))?;
        Ok(TokenKind::Number { value: value as f64, radix: kind })
    }

    /// An 8-character `0..3` graphics literal, decoded to the two-bitplane
    /// word the video hardware consumes: bit 1 of each pixel goes to the
    /// high plane byte, bit 0 to the low plane byte, first pixel in the
    /// most significant bit.
    fn lex_graphics(&mut self, loc: &SourceLoc) -> Result<TokenKind> {
        let mut high = 0u16;
        let mut low = 0u16;
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !('0'..='3').contains(&c) {
                break;
            }
            let pixel = c as u16 - '0' as u16;
            high = high << 1 | pixel >> 1;
            low = low << 1 | (pixel & 1);
            count += 1;
            self.bump();
        }
        if count != 8 {
            return Err(Error::lexical(
                loc.clone(),
                "graphics literal must be exactly eight characters of 0..3",
            ));
        }
        let value = (high << 8 | low) as f64;
        Ok(TokenKind::Number { value, radix: Radix::Graphics })
    }

    fn lex_char(&mut self, loc: &SourceLoc) -> Result<TokenKind> {
        let c = match self.bump() {
            None | Some('\n') | Some('\'') => {
                return Err(Error::lexical(
                    loc.clone(),
                    "character literal must contain exactly one character",
                ))
            }
            Some('\\') => {
                let escaped = self.bump().ok_or_else(|| {
                    Error::lexical(loc.clone(), "unterminated character literal")
                })?;
                unescape(escaped, loc)?
            }
            Some(c) => c,
        };
        if !self.eat('\'') {
            return Err(Error::lexical(
                loc.clone(),
                "character literal must contain exactly one character",
            ));
        }
        Ok(TokenKind::Number { value: c as u32 as f64, radix: Radix::Char })
    }

    fn lex_string(&mut self, loc: &SourceLoc) -> Result<TokenKind> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(Error::lexical(loc.clone(), "unterminated string"))
                }
                Some('"') => return Ok(TokenKind::String(text)),
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| Error::lexical(loc.clone(), "unterminated string"))?;
                    text.push(unescape(escaped, loc)?);
                }
                Some(c) => text.push(c),
            }
        }
    }

    /// A macro argument placeholder, `@n` or `\n`.
    fn lex_argument(&mut self, loc: &SourceLoc, intro: char) -> Result<TokenKind> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return Err(Error::lexical(
                loc.clone(),
                format!("expected an argument number after '{intro}'"),
            ));
        }
        let n: u32 = text
            .parse()
            .map_err(|_| Error::lexical(loc.clone(), format!("bad argument number \"{text}\"")))?;
        Ok(TokenKind::Argument(n))
    }

    fn lex_operator(&mut self, loc: &SourceLoc) -> Result<TokenKind> {
        let c = self.bump().expect("caller checked");
        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Op(if self.eat('=') { Op::AddAssign } else { Op::Plus }),
            '-' => TokenKind::Op(if self.eat('=') { Op::SubAssign } else { Op::Minus }),
            '*' => {
                if self.eat('*') {
                    TokenKind::Op(Op::StarStar)
                } else if self.eat('=') {
                    TokenKind::Op(Op::MulAssign)
                } else {
                    TokenKind::Op(Op::Star)
                }
            }
            '/' => TokenKind::Op(if self.eat('=') { Op::DivAssign } else { Op::Slash }),
            '%' => TokenKind::Op(if self.eat('=') { Op::ModAssign } else { Op::Percent }),
            '~' => TokenKind::Op(Op::BitNot),
            '^' => TokenKind::Op(if self.eat('=') { Op::XorAssign } else { Op::BitXor }),
            '!' => TokenKind::Op(if self.eat('=') { Op::NotEqual } else { Op::Not }),
            '=' => TokenKind::Op(if self.eat('=') { Op::Equal } else { Op::Assign }),
            '&' => {
                if self.eat('&') {
                    TokenKind::Op(Op::LogicalAnd)
                } else if self.eat('=') {
                    TokenKind::Op(Op::AndAssign)
                } else {
                    TokenKind::Op(Op::BitAnd)
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::Op(Op::LogicalOr)
                } else if self.eat('=') {
                    TokenKind::Op(Op::OrAssign)
                } else {
                    TokenKind::Op(Op::BitOr)
                }
            }
            '<' => {
                if self.eat('<') {
                    TokenKind::Op(if self.eat('=') { Op::ShlAssign } else { Op::Shl })
                } else if self.eat('=') {
                    TokenKind::Op(Op::LessEqual)
                } else {
                    TokenKind::Op(Op::Less)
                }
            }
            '>' => {
                if self.eat('>') {
                    TokenKind::Op(if self.eat('=') { Op::ShrAssign } else { Op::Shr })
                } else if self.eat('=') {
                    TokenKind::Op(Op::GreaterEqual)
                } else {
                    TokenKind::Op(Op::Greater)
                }
            }
            _ => {
                return Err(Error::lexical(
                    loc.clone(),
                    format!("unexpected character '{c}'"),
                ))
            }
        };
        Ok(kind)
    }
}

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

/// Resolves one escape character, shared by string and character literals.
fn unescape(c: char, loc: &SourceLoc) -> Result<char> {
    match c {
        '0' => Ok('\0'),
        'a' => Ok('\x07'),
        'b' => Ok('\x08'),
        'f' => Ok('\x0C'),
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        't' => Ok('\t'),
        'v' => Ok('\x0B'),
        '\\' => Ok('\\'),
        '"' => Ok('"'),
        '?' => Ok('?'),
        '\'' => Ok('\''),
        _ => Err(Error::lexical(loc.clone(), format!("bad escape '\\{c}'"))),
    }
}
