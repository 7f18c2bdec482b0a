// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tokens, source locations and the keyword table.

use std::rc::Rc;

use crate::isa::Mnemonic;
use crate::registers::Register;

/// A position in an assembly source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: Rc<str>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl SourceLoc {
    pub fn new(file: Rc<str>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Operator tokens, shared between the lexer, the parser's precedence
/// ladder and `DEF`'s compound assignments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Plus, Minus, Star, Slash, Percent, StarStar,
    Shl, Shr, BitAnd, BitOr, BitXor, BitNot, Not,
    LogicalAnd, LogicalOr,
    Equal, NotEqual, Less, LessEqual, Greater, GreaterEqual,
    Assign, AddAssign, SubAssign, MulAssign, DivAssign, ModAssign,
    AndAssign, OrAssign, XorAssign, ShlAssign, ShrAssign,
}

impl Op {
    /// The spelling of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::StarStar => "**",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitNot => "~",
            Self::Not => "!",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::ModAssign => "%=",
            Self::AndAssign => "&=",
            Self::OrAssign => "|=",
            Self::XorAssign => "^=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
        }
    }

    /// True for `=` and the compound assignment operators.
    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign | Self::AddAssign | Self::SubAssign | Self::MulAssign
                | Self::DivAssign | Self::ModAssign | Self::AndAssign | Self::OrAssign
                | Self::XorAssign | Self::ShlAssign | Self::ShrAssign
        )
    }

    /// The binary operator a compound assignment applies, if any.
    pub const fn compound_op(self) -> Option<Op> {
        match self {
            Self::AddAssign => Some(Self::Plus),
            Self::SubAssign => Some(Self::Minus),
            Self::MulAssign => Some(Self::Star),
            Self::DivAssign => Some(Self::Slash),
            Self::ModAssign => Some(Self::Percent),
            Self::AndAssign => Some(Self::BitAnd),
            Self::OrAssign => Some(Self::BitOr),
            Self::XorAssign => Some(Self::BitXor),
            Self::ShlAssign => Some(Self::Shl),
            Self::ShrAssign => Some(Self::Shr),
            _ => None,
        }
    }
}

/// Directive and instruction keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Include, Incbin,
    Def, Macro, Endm, Shift,
    Repeat, Endr,
    If, Elif, Else, Endc,
    Assert, Org, Rom, Ram,
    Db, Dw, Dl, Ds, Df,
    Narg,
    Ins(Mnemonic),
}

/// One row of the keyword table.
pub struct KeywordEntry {
    /// Canonical upper-case spelling.
    pub name: &'static str,
    pub tag: Keyword,
    /// Operand count for instructions (the maximum where a trailing operand
    /// is optional); -1 for directives with their own grammar.
    pub params: i8,
}

/// The flat keyword table. Alternate spellings map to the same tag.
pub static KEYWORDS: &[KeywordEntry] = &[
    KeywordEntry { name: "INCLUDE", tag: Keyword::Include, params: 1 },
    KeywordEntry { name: "INCBIN", tag: Keyword::Incbin, params: -1 },
    KeywordEntry { name: "DEF", tag: Keyword::Def, params: -1 },
    KeywordEntry { name: "MACRO", tag: Keyword::Macro, params: 1 },
    KeywordEntry { name: "ENDM", tag: Keyword::Endm, params: 0 },
    KeywordEntry { name: "SHIFT", tag: Keyword::Shift, params: -1 },
    KeywordEntry { name: "REPEAT", tag: Keyword::Repeat, params: 1 },
    KeywordEntry { name: "REPT", tag: Keyword::Repeat, params: 1 },
    KeywordEntry { name: "ENDR", tag: Keyword::Endr, params: 0 },
    KeywordEntry { name: "IF", tag: Keyword::If, params: 1 },
    KeywordEntry { name: "ELIF", tag: Keyword::Elif, params: 1 },
    KeywordEntry { name: "ELSEIF", tag: Keyword::Elif, params: 1 },
    KeywordEntry { name: "ELSE", tag: Keyword::Else, params: 0 },
    KeywordEntry { name: "ENDC", tag: Keyword::Endc, params: 0 },
    KeywordEntry { name: "ENDIF", tag: Keyword::Endc, params: 0 },
    KeywordEntry { name: "ASSERT", tag: Keyword::Assert, params: -1 },
    KeywordEntry { name: "ORG", tag: Keyword::Org, params: -1 },
    KeywordEntry { name: "ROM", tag: Keyword::Rom, params: 0 },
    KeywordEntry { name: "RAM", tag: Keyword::Ram, params: 0 },
    KeywordEntry { name: "DB", tag: Keyword::Db, params: -1 },
    KeywordEntry { name: "BYTE", tag: Keyword::Db, params: -1 },
    KeywordEntry { name: "DW", tag: Keyword::Dw, params: -1 },
    KeywordEntry { name: "WORD", tag: Keyword::Dw, params: -1 },
    KeywordEntry { name: "DL", tag: Keyword::Dl, params: -1 },
    KeywordEntry { name: "LONG", tag: Keyword::Dl, params: -1 },
    KeywordEntry { name: "DS", tag: Keyword::Ds, params: -1 },
    KeywordEntry { name: "DF", tag: Keyword::Df, params: -1 },
    KeywordEntry { name: "_NARG", tag: Keyword::Narg, params: 0 },

    KeywordEntry { name: "NOP", tag: Keyword::Ins(Mnemonic::Nop), params: 0 },
    KeywordEntry { name: "STOP", tag: Keyword::Ins(Mnemonic::Stop), params: 0 },
    KeywordEntry { name: "HALT", tag: Keyword::Ins(Mnemonic::Halt), params: 0 },
    KeywordEntry { name: "SEC", tag: Keyword::Ins(Mnemonic::Sec), params: 1 },
    KeywordEntry { name: "CEC", tag: Keyword::Ins(Mnemonic::Cec), params: 0 },
    KeywordEntry { name: "DI", tag: Keyword::Ins(Mnemonic::Di), params: 0 },
    KeywordEntry { name: "EI", tag: Keyword::Ins(Mnemonic::Ei), params: 0 },
    KeywordEntry { name: "DAA", tag: Keyword::Ins(Mnemonic::Daa), params: 0 },
    KeywordEntry { name: "SCF", tag: Keyword::Ins(Mnemonic::Scf), params: 0 },
    KeywordEntry { name: "CCF", tag: Keyword::Ins(Mnemonic::Ccf), params: 0 },
    KeywordEntry { name: "LD", tag: Keyword::Ins(Mnemonic::Ld), params: 2 },
    KeywordEntry { name: "LDQ", tag: Keyword::Ins(Mnemonic::Ldq), params: 2 },
    KeywordEntry { name: "LDH", tag: Keyword::Ins(Mnemonic::Ldh), params: 2 },
    KeywordEntry { name: "ST", tag: Keyword::Ins(Mnemonic::St), params: 2 },
    KeywordEntry { name: "STQ", tag: Keyword::Ins(Mnemonic::Stq), params: 2 },
    KeywordEntry { name: "STH", tag: Keyword::Ins(Mnemonic::Sth), params: 2 },
    KeywordEntry { name: "MV", tag: Keyword::Ins(Mnemonic::Mv), params: 2 },
    KeywordEntry { name: "PUSH", tag: Keyword::Ins(Mnemonic::Push), params: 1 },
    KeywordEntry { name: "POP", tag: Keyword::Ins(Mnemonic::Pop), params: 1 },
    KeywordEntry { name: "JMP", tag: Keyword::Ins(Mnemonic::Jmp), params: 2 },
    KeywordEntry { name: "JP", tag: Keyword::Ins(Mnemonic::Jmp), params: 2 },
    KeywordEntry { name: "JPB", tag: Keyword::Ins(Mnemonic::Jpb), params: 1 },
    KeywordEntry { name: "CALL", tag: Keyword::Ins(Mnemonic::Call), params: 1 },
    KeywordEntry { name: "RET", tag: Keyword::Ins(Mnemonic::Ret), params: 1 },
    KeywordEntry { name: "RETI", tag: Keyword::Ins(Mnemonic::Reti), params: 0 },
    KeywordEntry { name: "RST", tag: Keyword::Ins(Mnemonic::Rst), params: 1 },
    KeywordEntry { name: "JPS", tag: Keyword::Ins(Mnemonic::Jps), params: 0 },
    KeywordEntry { name: "INC", tag: Keyword::Ins(Mnemonic::Inc), params: 1 },
    KeywordEntry { name: "DEC", tag: Keyword::Ins(Mnemonic::Dec), params: 1 },
    KeywordEntry { name: "ADD", tag: Keyword::Ins(Mnemonic::Add), params: 2 },
    KeywordEntry { name: "ADC", tag: Keyword::Ins(Mnemonic::Adc), params: 2 },
    KeywordEntry { name: "SUB", tag: Keyword::Ins(Mnemonic::Sub), params: 2 },
    KeywordEntry { name: "SBC", tag: Keyword::Ins(Mnemonic::Sbc), params: 2 },
    KeywordEntry { name: "CMP", tag: Keyword::Ins(Mnemonic::Cmp), params: 2 },
    KeywordEntry { name: "AND", tag: Keyword::Ins(Mnemonic::And), params: 2 },
    KeywordEntry { name: "OR", tag: Keyword::Ins(Mnemonic::Or), params: 2 },
    KeywordEntry { name: "XOR", tag: Keyword::Ins(Mnemonic::Xor), params: 2 },
    KeywordEntry { name: "NOT", tag: Keyword::Ins(Mnemonic::Not), params: 1 },
    KeywordEntry { name: "CPL", tag: Keyword::Ins(Mnemonic::Not), params: 1 },
    KeywordEntry { name: "SLA", tag: Keyword::Ins(Mnemonic::Sla), params: 1 },
    KeywordEntry { name: "SRA", tag: Keyword::Ins(Mnemonic::Sra), params: 1 },
    KeywordEntry { name: "SRL", tag: Keyword::Ins(Mnemonic::Srl), params: 1 },
    KeywordEntry { name: "RL", tag: Keyword::Ins(Mnemonic::Rl), params: 1 },
    KeywordEntry { name: "RLC", tag: Keyword::Ins(Mnemonic::Rlc), params: 1 },
    KeywordEntry { name: "RR", tag: Keyword::Ins(Mnemonic::Rr), params: 1 },
    KeywordEntry { name: "RRC", tag: Keyword::Ins(Mnemonic::Rrc), params: 1 },
    KeywordEntry { name: "BIT", tag: Keyword::Ins(Mnemonic::Bit), params: 2 },
    KeywordEntry { name: "RES", tag: Keyword::Ins(Mnemonic::Res), params: 2 },
    KeywordEntry { name: "SET", tag: Keyword::Ins(Mnemonic::Set), params: 2 },
    KeywordEntry { name: "SWAP", tag: Keyword::Ins(Mnemonic::Swap), params: 1 },
];

/// Case-insensitive keyword lookup.
pub fn lookup_keyword(name: &str) -> Option<&'static KeywordEntry> {
    let upper = name.to_ascii_uppercase();
    KEYWORDS.iter().find(|entry| entry.name == upper)
}

/// The numeral form a number token was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Binary,
    Octal,
    Hex,
    /// A character literal.
    Char,
    /// A backtick graphics literal.
    Graphics,
}

/// What a token is.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Keyword(Keyword),
    Register(Register),
    Number { value: f64, radix: Radix },
    String(String),
    /// A macro argument placeholder `@n` or `\n`.
    Argument(u32),
    Op(Op),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Newline,
    Eof,
}

/// A token with its source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLoc,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TokenKind::Identifier(name) => write!(f, "identifier {name}"),
            TokenKind::Keyword(Keyword::Ins(m)) => write!(f, "instruction {}", m.name()),
            TokenKind::Keyword(keyword) => write!(f, "keyword {keyword:?}"),
            TokenKind::Register(reg) => write!(f, "register {reg}"),
            TokenKind::Number { value, radix } => write!(f, "number {value} ({radix:?})"),
            TokenKind::String(text) => write!(f, "string {text:?}"),
            TokenKind::Argument(n) => write!(f, "argument @{n}"),
            TokenKind::Op(op) => write!(f, "operator {}", op.symbol()),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
