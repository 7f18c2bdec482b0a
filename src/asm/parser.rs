// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The parser: statement dispatch plus a precedence-climbing expression
//! grammar.
//!
//! The ladder, tightest first: primary and parenthesized, unary `+ - ! ~`,
//! `**`, `* / %`, `+ -`, `<< >>`, `&`, `^`, `|`, comparisons, `&&`, `||`.

use crate::asm::error::{Error, Result};
use crate::asm::syntax::{DataKind, Region, Syntax, SyntaxKind};
use crate::asm::token::{Keyword, Op, SourceLoc, Token, TokenKind, KEYWORDS};
use crate::isa::Mnemonic;

/// Parses a token stream into a block of statements.
pub fn parse(tokens: Vec<Token>) -> Result<Syntax> {
    let mut parser = Parser { tokens, pos: 0 };
    let (block, _) = parser.parse_block(&[], None)?;
    Ok(block)
}

/// Maximum operand count of an instruction keyword.
fn mnemonic_params(mnemonic: Mnemonic) -> usize {
    KEYWORDS
        .iter()
        .find(|entry| entry.tag == Keyword::Ins(mnemonic))
        .map(|entry| entry.params.max(0) as usize)
        .unwrap_or(0)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let i = self.pos + ahead;
        &self.tokens[i.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn eat_comma(&mut self) -> bool {
        if self.peek().kind == TokenKind::Comma {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_statement_end(&mut self) -> Result<()> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => {
                let token = self.peek();
                Err(Error::parse(
                    token.loc.clone(),
                    format!("expected end of line, found {token}"),
                ))
            }
        }
    }

    /// Parses statements until one of `terminators` (consumed) or, with no
    /// terminators, the end of input. Returns the block and the terminator
    /// that closed it.
    fn parse_block(
        &mut self,
        terminators: &[Keyword],
        opened: Option<(&'static str, SourceLoc)>,
    ) -> Result<(Syntax, Option<Keyword>)> {
        let loc = self.peek().loc.clone();
        let mut statements = Vec::new();
        loop {
            while self.peek().kind == TokenKind::Newline {
                self.advance();
            }
            match &self.peek().kind {
                TokenKind::Eof => {
                    return if let Some((what, open_loc)) = opened {
                        Err(Error::parse(open_loc, format!("unterminated {what}")))
                    } else {
                        Ok((Syntax::new(SyntaxKind::Block(statements), loc), None))
                    };
                }
                TokenKind::Keyword(k) if terminators.contains(k) => {
                    let k = *k;
                    self.advance();
                    return Ok((Syntax::new(SyntaxKind::Block(statements), loc), Some(k)));
                }
                _ => statements.push(self.parse_statement()?),
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Syntax> {
        let loc = self.peek().loc.clone();
        match &self.peek().kind {
            TokenKind::Identifier(_) => {
                if self.peek_at(1).kind == TokenKind::Colon {
                    let name = self.expect_identifier()?;
                    self.advance();
                    // A second colon marks an exported label; same meaning here.
                    if self.peek().kind == TokenKind::Colon {
                        self.advance();
                    }
                    // Labels may share a line with the statement they head.
                    Ok(Syntax::new(SyntaxKind::Label { name }, loc))
                } else {
                    let statement = self.parse_macro_call(loc)?;
                    self.expect_statement_end()?;
                    Ok(statement)
                }
            }
            TokenKind::Keyword(keyword) => {
                let keyword = *keyword;
                self.advance();
                let statement = self.parse_keyword_statement(keyword, loc)?;
                self.expect_statement_end()?;
                Ok(statement)
            }
            _ => Err(Error::parse(
                loc,
                format!("expected a statement, found {}", self.peek()),
            )),
        }
    }

    fn parse_keyword_statement(&mut self, keyword: Keyword, loc: SourceLoc) -> Result<Syntax> {
        let kind = match keyword {
            Keyword::Db => self.parse_data(DataKind::Db)?,
            Keyword::Dw => self.parse_data(DataKind::Dw)?,
            Keyword::Dl => self.parse_data(DataKind::Dl)?,
            Keyword::Df => self.parse_data(DataKind::Df)?,
            Keyword::Ds => {
                let count = Box::new(self.parse_expression()?);
                let items = if self.eat_comma() {
                    self.parse_expression_list()?
                } else {
                    Vec::new()
                };
                SyntaxKind::Data { kind: DataKind::Ds, count: Some(count), items }
            }
            Keyword::Def => {
                let name = self.expect_identifier()?;
                let op = self.expect_assignment_op()?;
                let value = Box::new(self.parse_expression()?);
                SyntaxKind::Def { name, op, value }
            }
            Keyword::Macro => {
                let name = self.expect_identifier()?;
                self.expect_statement_end()?;
                let (body, _) = self.parse_block(&[Keyword::Endm], Some(("macro", loc.clone())))?;
                return Ok(Syntax::new(
                    SyntaxKind::Macro { name, body: Box::new(body) },
                    loc,
                ));
            }
            Keyword::Shift => {
                let count = if self.at_line_end() {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                SyntaxKind::Shift { count }
            }
            Keyword::Repeat => {
                let count = Box::new(self.parse_expression()?);
                self.expect_statement_end()?;
                let (body, _) = self.parse_block(&[Keyword::Endr], Some(("repeat", loc.clone())))?;
                return Ok(Syntax::new(
                    SyntaxKind::Repeat { count, body: Box::new(body) },
                    loc,
                ));
            }
            Keyword::If => return self.parse_if(loc),
            Keyword::Include => {
                let path = Box::new(self.parse_expression()?);
                SyntaxKind::Include { path }
            }
            Keyword::Incbin => {
                let path = Box::new(self.parse_expression()?);
                let offset = if self.eat_comma() {
                    Some(Box::new(self.parse_expression()?))
                } else {
                    None
                };
                let length = if offset.is_some() && self.eat_comma() {
                    Some(Box::new(self.parse_expression()?))
                } else {
                    None
                };
                SyntaxKind::Incbin { path, offset, length }
            }
            Keyword::Assert => {
                let cond = Box::new(self.parse_expression()?);
                let message = if self.eat_comma() {
                    Some(Box::new(self.parse_expression()?))
                } else {
                    None
                };
                SyntaxKind::Assert { cond, message }
            }
            Keyword::Org => match self.advance() {
                Token { kind: TokenKind::Keyword(Keyword::Rom), .. } => {
                    SyntaxKind::Org { region: Region::Rom, offset: None }
                }
                Token { kind: TokenKind::Keyword(Keyword::Ram), .. } => {
                    let offset = Box::new(self.parse_expression()?);
                    SyntaxKind::Org { region: Region::Ram, offset: Some(offset) }
                }
                token => {
                    return Err(Error::parse(
                        token.loc,
                        "expected ROM or RAM after ORG".to_string(),
                    ))
                }
            },
            Keyword::Ins(mnemonic) => {
                let operands = self.parse_operands(mnemonic)?;
                SyntaxKind::Instruction { mnemonic, operands }
            }
            Keyword::Endm | Keyword::Endr | Keyword::Endc | Keyword::Else | Keyword::Elif => {
                return Err(Error::parse(
                    loc,
                    format!("{keyword:?} without a matching opening block"),
                ))
            }
            Keyword::Rom | Keyword::Ram | Keyword::Narg => {
                return Err(Error::parse(loc, "expected a statement".to_string()))
            }
        };
        Ok(Syntax::new(kind, loc))
    }

    /// `IF` and, recursively, its `ELIF` chain. `ELIF` parses as a nested
    /// `IF` in the right child.
    fn parse_if(&mut self, loc: SourceLoc) -> Result<Syntax> {
        let cond = Box::new(self.parse_expression()?);
        self.expect_statement_end()?;
        let (then, terminator) = self.parse_block(
            &[Keyword::Elif, Keyword::Else, Keyword::Endc],
            Some(("if", loc.clone())),
        )?;

        let otherwise = match terminator {
            Some(Keyword::Elif) => {
                let elif_loc = self.peek().loc.clone();
                Some(Box::new(self.parse_if(elif_loc)?))
            }
            Some(Keyword::Else) => {
                self.expect_statement_end()?;
                let (block, _) = self.parse_block(&[Keyword::Endc], Some(("if", loc.clone())))?;
                Some(Box::new(block))
            }
            _ => None,
        };

        Ok(Syntax::new(
            SyntaxKind::If { cond, then: Box::new(then), otherwise },
            loc,
        ))
    }

    fn parse_data(&mut self, kind: DataKind) -> Result<SyntaxKind> {
        let items = self.parse_expression_list()?;
        Ok(SyntaxKind::Data { kind, count: None, items })
    }

    fn parse_macro_call(&mut self, loc: SourceLoc) -> Result<Syntax> {
        let name = self.expect_identifier()?;
        let mut args = Vec::new();
        if !self.at_line_end() {
            args.push(self.parse_expression()?);
            while self.eat_comma() {
                args.push(self.parse_expression()?);
            }
        }
        Ok(Syntax::new(SyntaxKind::MacroCall { name, args }, loc))
    }

    fn parse_operands(&mut self, mnemonic: Mnemonic) -> Result<Vec<Syntax>> {
        let mut operands = Vec::new();
        if !self.at_line_end() {
            operands.push(self.parse_operand()?);
            while self.eat_comma() {
                operands.push(self.parse_operand()?);
            }
        }
        let params = mnemonic_params(mnemonic);
        if operands.len() > params {
            return Err(Error::parse(
                self.peek().loc.clone(),
                format!("{} takes at most {params} operand(s)", mnemonic.name()),
            ));
        }
        Ok(operands)
    }

    /// An instruction operand: `[expr]`, `[reg]`, or a bare expression
    /// (which includes bare registers).
    fn parse_operand(&mut self) -> Result<Syntax> {
        let loc = self.peek().loc.clone();
        if self.peek().kind == TokenKind::LeftBracket {
            self.advance();
            if let TokenKind::Register(reg) = self.peek().kind {
                if self.peek_at(1).kind == TokenKind::RightBracket {
                    self.advance();
                    self.advance();
                    return Ok(Syntax::new(SyntaxKind::RegPtr(reg), loc));
                }
            }
            let inner = self.parse_expression()?;
            self.expect_right_bracket()?;
            return Ok(Syntax::new(SyntaxKind::Address(Box::new(inner)), loc));
        }
        self.parse_expression()
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Syntax>> {
        let mut items = vec![self.parse_expression()?];
        while self.eat_comma() {
            items.push(self.parse_expression()?);
        }
        Ok(items)
    }

    fn parse_expression(&mut self) -> Result<Syntax> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_bp: u8) -> Result<Syntax> {
        let mut left = self.parse_unary()?;
        loop {
            let TokenKind::Op(op) = self.peek().kind else { break };
            let Some((lbp, rbp)) = binding_power(op) else { break };
            if lbp < min_bp {
                break;
            }
            let loc = self.advance().loc;
            let right = self.parse_binary(rbp)?;
            left = Syntax::new(
                SyntaxKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Syntax> {
        if let TokenKind::Op(op) = self.peek().kind {
            if matches!(op, Op::Plus | Op::Minus | Op::Not | Op::BitNot) {
                let loc = self.advance().loc;
                let operand = Box::new(self.parse_unary()?);
                return Ok(Syntax::new(SyntaxKind::Unary { op, operand }, loc));
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Syntax> {
        let token = self.advance();
        let loc = token.loc.clone();
        let kind = match token.kind {
            TokenKind::Number { value, .. } => SyntaxKind::Number(value),
            TokenKind::String(text) => SyntaxKind::String(text),
            TokenKind::Identifier(name) => SyntaxKind::Identifier(name),
            TokenKind::Argument(n) => SyntaxKind::Argument(n),
            TokenKind::Register(reg) => SyntaxKind::Register(reg),
            TokenKind::Keyword(Keyword::Narg) => SyntaxKind::NArg,
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                match self.advance() {
                    Token { kind: TokenKind::RightParen, .. } => return Ok(inner),
                    token => {
                        let loc = token.loc.clone();
                        return Err(Error::parse(
                            loc,
                            format!("expected ')', found {token}"),
                        ))
                    }
                }
            }
            _ => {
                return Err(Error::parse(
                    loc,
                    format!("expected an expression, found {token}"),
                ))
            }
        };
        Ok(Syntax::new(kind, loc))
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.advance() {
            Token { kind: TokenKind::Identifier(name), .. } => Ok(name),
            token => {
                let loc = token.loc.clone();
                Err(Error::parse(
                    loc,
                    format!("expected an identifier, found {token}"),
                ))
            }
        }
    }

    fn expect_assignment_op(&mut self) -> Result<Op> {
        match self.advance() {
            Token { kind: TokenKind::Op(op), .. } if op.is_assignment() => Ok(op),
            token => {
                let loc = token.loc.clone();
                Err(Error::parse(
                    loc,
                    format!("expected an assignment operator, found {token}"),
                ))
            }
        }
    }

    fn expect_right_bracket(&mut self) -> Result<()> {
        match self.advance() {
            Token { kind: TokenKind::RightBracket, .. } => Ok(()),
            token => {
                let loc = token.loc.clone();
                Err(Error::parse(
                    loc,
                    format!("expected ']', found {token}"),
                ))
            }
        }
    }
}

/// Left/right binding powers of the binary operators. `**` is
/// right-associative; `None` for tokens that are not binary operators.
fn binding_power(op: Op) -> Option<(u8, u8)> {
    Some(match op {
        Op::LogicalOr => (1, 2),
        Op::LogicalAnd => (3, 4),
        Op::Equal | Op::NotEqual | Op::Less | Op::LessEqual | Op::Greater | Op::GreaterEqual => {
            (5, 6)
        }
        Op::BitOr => (7, 8),
        Op::BitXor => (9, 10),
        Op::BitAnd => (11, 12),
        Op::Shl | Op::Shr => (13, 14),
        Op::Plus | Op::Minus => (15, 16),
        Op::Star | Op::Slash | Op::Percent => (17, 18),
        Op::StarStar => (20, 19),
        _ => return None,
    })
}
