// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The builder walks the syntax tree and produces two side effects: bytes
//! into the ROM output buffer, and mutations of the symbol tables
//! (defines, labels, macros).
//!
//! Emission happens at one of two cursors, selected by `ORG`. The ROM
//! cursor appends to the output buffer; labels defined under it resolve to
//! `CODE_BEGIN` plus their offset, the program's load address. The RAM
//! cursor is an address counter in the RAM window; nothing is written
//! there, and scalar data advances it by the scalar's size times its value
//! (a "reserve n units" idiom inherited from the original toolchain).

use std::path::Path;
use std::rc::Rc;

use crate::asm::error::{Error, Result};
use crate::asm::lexer::Lexer;
use crate::asm::parser;
use crate::asm::syntax::{DataKind, Region, Syntax, SyntaxKind};
use crate::asm::token::{Op, SourceLoc};
use crate::asm::value::{fraction_part, integer_part, number_text, Value};
use crate::isa::{Condition, Isa, Mnemonic};
use crate::memory::{CODE_BEGIN, DRAM_BEGIN};
use crate::registers::{Register, Size, Slice};

/// Macro calls may nest this deep.
pub const MACRO_DEPTH_MAX: usize = 32;

/// The output buffer may grow to the size of the ROM window.
pub const ROM_CAPACITY: usize = (DRAM_BEGIN - CODE_BEGIN) as usize;

/// A label, resolved or still pending.
#[derive(Debug)]
struct Label {
    name: String,
    /// Where the label was first seen (definition or first reference).
    loc: SourceLoc,
    address: u32,
    resolved: bool,
    refs: Vec<PendingRef>,
}

/// An output offset waiting for a label's address.
#[derive(Debug)]
struct PendingRef {
    offset: usize,
    /// 4 bytes for references captured under the ROM cursor, 2 in RAM mode.
    width: usize,
}

struct MacroDef {
    name: String,
    /// The macro stores its own deep copy of the body at definition time;
    /// calls share it behind `Rc`.
    body: Rc<Syntax>,
}

/// One live macro invocation.
struct Frame {
    args: Vec<Value>,
    shift: usize,
}

/// The assembler state: output buffer, cursors and symbol tables.
#[derive(Default)]
pub struct Builder {
    lexer: Lexer,
    output: Vec<u8>,
    ram_cursor: u32,
    ram_mode: bool,
    labels: Vec<Label>,
    macros: Vec<MacroDef>,
    defines: Vec<(String, Value)>,
    frames: Vec<Frame>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lexes, parses and evaluates a source file.
    pub fn build_file(&mut self, path: &Path) -> Result<()> {
        let Some(tokens) = self.lexer.lex_file(path, None)? else {
            return Ok(());
        };
        let tree = parser::parse(tokens)?;
        self.eval(&tree)?;
        Ok(())
    }

    /// Lexes, parses and evaluates a source string.
    pub fn build_source(&mut self, source: &str, name: &str) -> Result<()> {
        let tokens = Lexer::lex_source(source, name.into())?;
        let tree = parser::parse(tokens)?;
        self.eval(&tree)?;
        Ok(())
    }

    /// The ROM image produced so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Checks that every referenced label was defined and returns the
    /// finished image.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.require_resolved()?;
        Ok(self.output)
    }

    /// Writes the finished image to a file.
    pub fn save_binary(&self, path: &Path) -> Result<()> {
        self.require_resolved()?;
        std::fs::write(path, &self.output)
            .map_err(|e| Error::io(None, format!("cannot write {}: {e}", path.display())))
    }

    fn require_resolved(&self) -> Result<()> {
        match self.labels.iter().find(|label| !label.resolved) {
            Some(label) => Err(Error::semantic(
                label.loc.clone(),
                format!("unresolved label \"{}\"", label.name),
            )),
            None => Ok(()),
        }
    }

    /// Evaluates one node, producing a value.
    pub fn eval(&mut self, node: &Syntax) -> Result<Value> {
        let loc = &node.loc;
        match &node.kind {
            SyntaxKind::Block(statements) => {
                let mut last = Value::Void;
                for statement in statements {
                    last = self.eval(statement)?;
                }
                Ok(last)
            }

            SyntaxKind::Label { name } => self.define_label(name, loc),

            SyntaxKind::Identifier(name) => self.eval_identifier(name, loc),

            SyntaxKind::Number(n) => Ok(Value::Number(*n)),
            SyntaxKind::String(s) => Ok(Value::String(s.clone())),

            SyntaxKind::Binary { op, left, right } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                self.binary_op(*op, lhs, rhs, loc)
            }
            SyntaxKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                self.unary_op(*op, value, loc)
            }

            SyntaxKind::NArg => {
                let frame = self.current_frame(loc, "_NARG")?;
                Ok(Value::Number(frame.args.len() as f64))
            }
            SyntaxKind::Argument(n) => self.eval_argument(*n, loc),
            SyntaxKind::Shift { count } => {
                let amount = match count {
                    Some(expr) => {
                        let value = self.eval(expr)?;
                        integer_part(self.expect_number(value, loc)?) as usize
                    }
                    None => 1,
                };
                let frame = self.current_frame_mut(loc, "SHIFT")?;
                frame.shift += amount;
                Ok(Value::Void)
            }

            SyntaxKind::Data { kind, count, items } => self.eval_data(*kind, count, items, loc),

            SyntaxKind::Def { name, op, value } => {
                let value = self.eval(value)?;
                self.eval_def(name, *op, value, loc)
            }

            SyntaxKind::Macro { name, body } => {
                if self.macros.iter().any(|m| m.name == *name) {
                    return Err(Error::semantic(
                        loc.clone(),
                        format!("macro \"{name}\" is already defined"),
                    ));
                }
                self.macros.push(MacroDef {
                    name: name.clone(),
                    body: Rc::new((**body).clone()),
                });
                Ok(Value::Void)
            }

            SyntaxKind::MacroCall { name, args } => self.eval_macro_call(name, args, loc),

            SyntaxKind::Repeat { count, body } => {
                let value = self.eval(count)?;
                let times = integer_part(self.expect_number(value, loc)?);
                for _ in 0..times {
                    self.eval(body)?;
                }
                Ok(Value::Void)
            }

            SyntaxKind::If { cond, then, otherwise } => {
                let value = self.eval(cond)?;
                let taken = self.expect_number(value, loc)? != 0.0;
                if taken {
                    self.eval(then)
                } else if let Some(otherwise) = otherwise {
                    self.eval(otherwise)
                } else {
                    Ok(Value::Void)
                }
            }

            SyntaxKind::Include { path } => {
                let value = self.eval(path)?;
                let Value::String(path) = value else {
                    return Err(Error::semantic(
                        loc.clone(),
                        format!("INCLUDE expects a string, found {}", value.type_name()),
                    ));
                };
                let Some(tokens) = self.lexer.lex_file(Path::new(&path), Some(loc.clone()))? else {
                    return Ok(Value::Void);
                };
                let tree = parser::parse(tokens)?;
                self.eval(&tree)
            }

            SyntaxKind::Incbin { path, offset, length } => {
                self.eval_incbin(path, offset.as_deref(), length.as_deref(), loc)
            }

            SyntaxKind::Assert { cond, message } => {
                let value = self.eval(cond)?;
                if self.expect_number(value, loc)? != 0.0 {
                    return Ok(Value::Void);
                }
                let text = match message {
                    Some(message) => {
                        let value = self.eval(message)?;
                        match value {
                            Value::String(s) => s,
                            other => {
                                return Err(Error::semantic(
                                    loc.clone(),
                                    format!(
                                        "ASSERT message must be a string, found {}",
                                        other.type_name()
                                    ),
                                ))
                            }
                        }
                    }
                    None => "assertion failed".to_string(),
                };
                Err(Error::semantic(loc.clone(), text))
            }

            SyntaxKind::Org { region, offset } => {
                match region {
                    Region::Rom => self.ram_mode = false,
                    Region::Ram => {
                        let offset = offset.as_ref().expect("parser requires a RAM offset");
                        let value = self.eval(offset)?;
                        let mut addr = integer_part(self.expect_number(value, loc)?) as u32;
                        // Offsets below the RAM window are rebased into it.
                        if addr < DRAM_BEGIN {
                            addr = addr.wrapping_add(DRAM_BEGIN);
                        }
                        self.ram_cursor = addr;
                        self.ram_mode = true;
                    }
                }
                Ok(Value::Void)
            }

            SyntaxKind::Instruction { mnemonic, operands } => {
                self.eval_instruction(*mnemonic, operands, loc)?;
                Ok(Value::Void)
            }

            SyntaxKind::Register(_) | SyntaxKind::RegPtr(_) | SyntaxKind::Address(_) => {
                Err(Error::semantic(
                    loc.clone(),
                    "register or address operand outside an instruction",
                ))
            }
        }
    }

    /// The current emit position: ROM load address or RAM counter.
    fn here(&self) -> u32 {
        if self.ram_mode {
            self.ram_cursor
        } else {
            CODE_BEGIN + self.output.len() as u32
        }
    }

    // ----- labels ------------------------------------------------------

    fn define_label(&mut self, name: &str, loc: &SourceLoc) -> Result<Value> {
        let address = self.here();
        match self.labels.iter().position(|l| l.name == name) {
            Some(i) => {
                if self.labels[i].resolved {
                    return Err(Error::semantic(
                        loc.clone(),
                        format!("label \"{name}\" is already defined"),
                    ));
                }
                self.labels[i].address = address;
                self.labels[i].resolved = true;
                let refs = std::mem::take(&mut self.labels[i].refs);
                for pending in refs {
                    self.patch(&pending, address, loc)?;
                }
            }
            None => self.labels.push(Label {
                name: name.to_string(),
                loc: loc.clone(),
                address,
                resolved: true,
                refs: Vec::new(),
            }),
        }
        Ok(Value::Void)
    }

    /// Back-patches one recorded reference with the resolved address.
    fn patch(&mut self, pending: &PendingRef, address: u32, loc: &SourceLoc) -> Result<()> {
        if pending.offset + pending.width > self.output.len() {
            return Err(Error::semantic(
                loc.clone(),
                "label reference site lies outside the ROM output",
            ));
        }
        for i in 0..pending.width {
            self.output[pending.offset + i] = (address >> (i * 8)) as u8;
        }
        Ok(())
    }

    fn eval_identifier(&mut self, name: &str, loc: &SourceLoc) -> Result<Value> {
        if let Some((_, value)) = self.defines.iter().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }

        // Not a define: a label, known or forward-referenced.
        let width = if self.ram_mode { 2 } else { 4 };
        let offset = self.output.len();
        match self.labels.iter_mut().find(|l| l.name == name) {
            Some(label) => {
                if label.resolved {
                    Ok(Value::Number(label.address as f64))
                } else {
                    label.refs.push(PendingRef { offset, width });
                    Ok(Value::Number(0.0))
                }
            }
            None => {
                self.labels.push(Label {
                    name: name.to_string(),
                    loc: loc.clone(),
                    address: 0,
                    resolved: false,
                    refs: vec![PendingRef { offset, width }],
                });
                Ok(Value::Number(0.0))
            }
        }
    }

    // ----- defines and macros ------------------------------------------

    fn eval_def(&mut self, name: &str, op: Op, value: Value, loc: &SourceLoc) -> Result<Value> {
        match self.defines.iter().position(|(n, _)| n == name) {
            None => {
                self.defines.push((name.to_string(), value));
                Ok(Value::Void)
            }
            Some(i) => {
                let new = match op.compound_op() {
                    Some(binary) => {
                        let old = self.defines[i].1.clone();
                        self.binary_op(binary, old, value, loc)?
                    }
                    None => value,
                };
                self.defines[i].1 = new;
                Ok(Value::Void)
            }
        }
    }

    fn eval_macro_call(&mut self, name: &str, args: &[Syntax], loc: &SourceLoc) -> Result<Value> {
        let Some(i) = self.macros.iter().position(|m| m.name == name) else {
            return Err(Error::semantic(
                loc.clone(),
                format!("\"{name}\" is not a macro or instruction"),
            ));
        };
        if self.frames.len() >= MACRO_DEPTH_MAX {
            return Err(Error::semantic(
                loc.clone(),
                format!("macro call depth exceeds {MACRO_DEPTH_MAX}"),
            ));
        }

        // Arguments evaluate in the caller's frame, before the body runs.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }

        let body = Rc::clone(&self.macros[i].body);
        self.frames.push(Frame { args: values, shift: 0 });
        let result = self.eval(&body);
        self.frames.pop();
        result?;
        Ok(Value::Void)
    }

    fn eval_argument(&mut self, n: u32, loc: &SourceLoc) -> Result<Value> {
        let frame = self.current_frame(loc, "a macro argument")?;
        if n == 0 {
            return Err(Error::semantic(loc.clone(), "macro arguments count from 1"));
        }
        let index = n as usize + frame.shift;
        match frame.args.get(index - 1) {
            Some(value) => Ok(value.clone()),
            None => Err(Error::semantic(
                loc.clone(),
                format!("macro argument {index} is out of range"),
            )),
        }
    }

    fn current_frame(&self, loc: &SourceLoc, what: &str) -> Result<&Frame> {
        self.frames.last().ok_or_else(|| {
            Error::semantic(loc.clone(), format!("{what} is only valid inside a macro"))
        })
    }

    fn current_frame_mut(&mut self, loc: &SourceLoc, what: &str) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| {
            Error::semantic(loc.clone(), format!("{what} is only valid inside a macro"))
        })
    }

    // ----- operators ----------------------------------------------------

    fn expect_number(&self, value: Value, loc: &SourceLoc) -> Result<f64> {
        value.as_number().ok_or_else(|| {
            Error::semantic(
                loc.clone(),
                format!("expected a number, found {}", value.type_name()),
            )
        })
    }

    fn binary_op(&self, op: Op, lhs: Value, rhs: Value, loc: &SourceLoc) -> Result<Value> {
        use Value::{Number, String};

        let mismatch = |l: &Value, r: &Value| {
            Error::semantic(
                loc.clone(),
                format!(
                    "operator '{}' cannot combine {} and {}",
                    op.symbol(),
                    l.type_name(),
                    r.type_name()
                ),
            )
        };

        // String concatenation, with number coercion on either side.
        if op == Op::Plus {
            return match (lhs, rhs) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (String(a), String(b)) => Ok(String(a + &b)),
                (String(a), Number(b)) => Ok(String(a + &number_text(b))),
                (Number(a), String(b)) => Ok(String(number_text(a) + &b)),
                (l, r) => Err(mismatch(&l, &r)),
            };
        }

        let (Number(a), Number(b)) = (&lhs, &rhs) else {
            return Err(mismatch(&lhs, &rhs));
        };
        let (a, b) = (*a, *b);
        let (ia, ib) = (integer_part(a), integer_part(b));

        let result = match op {
            Op::Minus => a - b,
            Op::Star => a * b,
            Op::Slash => {
                if b == 0.0 {
                    return Err(Error::semantic(loc.clone(), "division by zero"));
                }
                a / b
            }
            Op::Percent => {
                if b == 0.0 {
                    return Err(Error::semantic(loc.clone(), "modulo by zero"));
                }
                a % b
            }
            Op::StarStar => a.powf(b),
            Op::Shl => ia.wrapping_shl(ib as u32) as f64,
            Op::Shr => ia.wrapping_shr(ib as u32) as f64,
            Op::BitAnd => (ia & ib) as f64,
            Op::BitOr => (ia | ib) as f64,
            Op::BitXor => (ia ^ ib) as f64,
            Op::LogicalAnd => (ia != 0 && ib != 0) as u8 as f64,
            Op::LogicalOr => (ia != 0 || ib != 0) as u8 as f64,
            Op::Equal => (a == b) as u8 as f64,
            Op::NotEqual => (a != b) as u8 as f64,
            Op::Less => (a < b) as u8 as f64,
            Op::LessEqual => (a <= b) as u8 as f64,
            Op::Greater => (a > b) as u8 as f64,
            Op::GreaterEqual => (a >= b) as u8 as f64,
            _ => {
                return Err(Error::semantic(
                    loc.clone(),
                    format!("'{}' is not a binary operator", op.symbol()),
                ))
            }
        };
        Ok(Number(result))
    }

    fn unary_op(&self, op: Op, value: Value, loc: &SourceLoc) -> Result<Value> {
        let n = self.expect_number(value, loc)?;
        let result = match op {
            Op::Plus => n,
            Op::Minus => -n,
            Op::Not => (integer_part(n) == 0) as u8 as f64,
            Op::BitNot => !integer_part(n) as f64,
            _ => {
                return Err(Error::semantic(
                    loc.clone(),
                    format!("'{}' is not a unary operator", op.symbol()),
                ))
            }
        };
        Ok(Value::Number(result))
    }

    // ----- emission -----------------------------------------------------

    fn emit_byte(&mut self, byte: u8, loc: &SourceLoc) -> Result<()> {
        if self.output.len() >= ROM_CAPACITY {
            return Err(Error::semantic(loc.clone(), "ROM capacity exceeded"));
        }
        self.output.push(byte);
        Ok(())
    }

    fn emit_bytes(&mut self, bytes: &[u8], loc: &SourceLoc) -> Result<()> {
        if self.output.len() + bytes.len() > ROM_CAPACITY {
            return Err(Error::semantic(loc.clone(), "ROM capacity exceeded"));
        }
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn emit_sized(&mut self, value: u32, size: Size, loc: &SourceLoc) -> Result<()> {
        for shift in 0..size as u32 {
            self.emit_byte((value >> (shift * 8)) as u8, loc)?;
        }
        Ok(())
    }

    /// Advances the RAM cursor by `size * value` bytes.
    fn ram_advance(&mut self, size: u32, value: f64, loc: &SourceLoc) -> Result<()> {
        let units = integer_part(value);
        let end = self.ram_cursor as u64 + size as u64 * units;
        if end > u32::MAX as u64 {
            return Err(Error::semantic(loc.clone(), "RAM cursor past the end of memory"));
        }
        self.ram_cursor = end as u32;
        Ok(())
    }

    // ----- data directives ---------------------------------------------

    /// Converts a `DB`/`DS` item to one byte, warning on truncation.
    fn data_byte(&mut self, value: f64, loc: &SourceLoc) -> u8 {
        if value > 0xFF as f64 {
            log::warn!("{loc}: byte value {} truncated to 8 bits", number_text(value));
        }
        integer_part(value) as u8
    }

    fn eval_data(
        &mut self,
        kind: DataKind,
        count: &Option<Box<Syntax>>,
        items: &[Syntax],
        loc: &SourceLoc,
    ) -> Result<Value> {
        match kind {
            DataKind::Db => {
                for item in items {
                    let value = self.eval(item)?;
                    match value {
                        Value::Number(n) => {
                            if self.ram_mode {
                                self.ram_advance(1, n, &item.loc)?;
                            } else {
                                let byte = self.data_byte(n, &item.loc);
                                self.emit_byte(byte, &item.loc)?;
                            }
                        }
                        Value::String(text) => {
                            if self.ram_mode {
                                return Err(Error::semantic(
                                    item.loc.clone(),
                                    "strings cannot be emitted with the RAM cursor active",
                                ));
                            }
                            self.emit_bytes(text.as_bytes(), &item.loc)?;
                            self.emit_byte(0, &item.loc)?;
                        }
                        other => {
                            return Err(Error::semantic(
                                item.loc.clone(),
                                format!("DB expects numbers or strings, found {}", other.type_name()),
                            ))
                        }
                    }
                }
            }
            DataKind::Dw | DataKind::Dl => {
                let size = if kind == DataKind::Dw { Size::Word } else { Size::Long };
                for item in items {
                    let value = self.eval(item)?;
                    let n = self.expect_number(value, &item.loc)?;
                    if self.ram_mode {
                        self.ram_advance(size as u32, n, &item.loc)?;
                    } else {
                        self.emit_sized(integer_part(n) as u32, size, &item.loc)?;
                    }
                }
            }
            DataKind::Ds => {
                if self.ram_mode {
                    return Err(Error::semantic(
                        loc.clone(),
                        "DS is not allowed with the RAM cursor active",
                    ));
                }
                let count = count.as_ref().expect("parser requires a DS count");
                let value = self.eval(count)?;
                let times = integer_part(self.expect_number(value, &count.loc)?);

                let mut bytes = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.eval(item)?;
                    let n = self.expect_number(value, &item.loc)?;
                    bytes.push(self.data_byte(n, &item.loc));
                }
                for _ in 0..times {
                    self.emit_bytes(&bytes, loc)?;
                }
            }
            DataKind::Df => {
                if self.ram_mode {
                    return Err(Error::semantic(
                        loc.clone(),
                        "DF is not allowed with the RAM cursor active",
                    ));
                }
                for item in items {
                    let value = self.eval(item)?;
                    let n = self.expect_number(value, &item.loc)?;
                    self.emit_sized(integer_part(n) as u32, Size::Long, &item.loc)?;
                    self.emit_sized(fraction_part(n) as u32, Size::Long, &item.loc)?;
                }
            }
        }
        Ok(Value::Void)
    }

    fn eval_incbin(
        &mut self,
        path: &Syntax,
        offset: Option<&Syntax>,
        length: Option<&Syntax>,
        loc: &SourceLoc,
    ) -> Result<Value> {
        if self.ram_mode {
            return Err(Error::semantic(
                loc.clone(),
                "INCBIN is not allowed with the RAM cursor active",
            ));
        }

        let value = self.eval(path)?;
        let Value::String(path) = value else {
            return Err(Error::semantic(
                loc.clone(),
                format!("INCBIN expects a string, found {}", value.type_name()),
            ));
        };

        let data = std::fs::read(&path)
            .map_err(|e| Error::io(Some(loc.clone()), format!("cannot read {path}: {e}")))?;

        let start = match offset {
            Some(expr) => {
                let value = self.eval(expr)?;
                integer_part(self.expect_number(value, &expr.loc)?) as usize
            }
            None => 0,
        };
        if start > data.len() {
            return Err(Error::semantic(
                loc.clone(),
                format!("INCBIN offset {start} is past the end of {path}"),
            ));
        }

        let end = match length {
            Some(expr) => {
                let value = self.eval(expr)?;
                let length = integer_part(self.expect_number(value, &expr.loc)?) as usize;
                if start + length > data.len() {
                    return Err(Error::semantic(
                        loc.clone(),
                        format!("INCBIN length {length} is past the end of {path}"),
                    ));
                }
                start + length
            }
            None => data.len(),
        };

        self.emit_bytes(&data[start..end], loc)?;
        Ok(Value::Void)
    }

    // ----- instructions -------------------------------------------------

    fn emit_opcode(&mut self, isa: Isa, xy: u8, loc: &SourceLoc) -> Result<()> {
        self.emit_byte(isa.ii(), loc)?;
        self.emit_byte(xy, loc)
    }

    /// Evaluates an address or immediate operand and emits it at the given
    /// width. Must run after the opcode bytes so that a forward label
    /// reference is recorded at the patch site.
    fn emit_operand_value(&mut self, expr: &Syntax, size: Size) -> Result<()> {
        let value = self.eval(expr)?;
        let n = self.expect_number(value, &expr.loc)?;
        self.emit_sized(integer_part(n) as u32, size, &expr.loc)
    }

    fn eval_instruction(
        &mut self,
        mnemonic: Mnemonic,
        operands: &[Syntax],
        loc: &SourceLoc,
    ) -> Result<()> {
        if self.ram_mode {
            return Err(Error::semantic(
                loc.clone(),
                "instructions cannot be assembled with the RAM cursor active",
            ));
        }

        match mnemonic {
            Mnemonic::Nop => self.encode_plain(Isa::Nop, operands, loc),
            Mnemonic::Stop => self.encode_plain(Isa::Stop, operands, loc),
            Mnemonic::Halt => self.encode_plain(Isa::Halt, operands, loc),
            Mnemonic::Cec => self.encode_plain(Isa::Cec, operands, loc),
            Mnemonic::Di => self.encode_plain(Isa::Di, operands, loc),
            Mnemonic::Ei => self.encode_plain(Isa::Ei, operands, loc),
            Mnemonic::Daa => self.encode_plain(Isa::Daa, operands, loc),
            Mnemonic::Scf => self.encode_plain(Isa::Scf, operands, loc),
            Mnemonic::Ccf => self.encode_plain(Isa::Ccf, operands, loc),
            Mnemonic::Reti => self.encode_plain(Isa::Reti, operands, loc),
            Mnemonic::Jps => self.encode_plain(Isa::Jps, operands, loc),

            Mnemonic::Sec => {
                let expr = self.one_operand(operands, "SEC", loc)?;
                let value = self.eval(expr)?;
                let code = integer_part(self.expect_number(value, &expr.loc)?) as u8;
                self.emit_opcode(Isa::Sec, code, loc)
            }

            Mnemonic::Ld => self.encode_load(Isa::LdImm, operands, loc),
            Mnemonic::Ldq => self.encode_load(Isa::LdqImm, operands, loc),
            Mnemonic::Ldh => self.encode_load(Isa::LdhImm, operands, loc),
            Mnemonic::St => self.encode_store(Isa::StAbs, operands, loc),
            Mnemonic::Stq => self.encode_store(Isa::StqAbs, operands, loc),
            Mnemonic::Sth => self.encode_store(Isa::SthAbs, operands, loc),

            Mnemonic::Mv => {
                let (dst, src) = self.two_registers(operands, "MV", loc)?;
                if dst.size() != src.size() {
                    return Err(Error::semantic(
                        loc.clone(),
                        "MV needs two registers of the same size",
                    ));
                }
                self.emit_opcode(Isa::Mv, (dst as u8) << 4 | src as u8, loc)
            }

            Mnemonic::Push | Mnemonic::Pop => {
                let reg = self.one_register(operands, mnemonic.name(), loc)?;
                if reg.slice() != Slice::Long {
                    return Err(Error::semantic(
                        loc.clone(),
                        format!("{} needs a 32-bit register", mnemonic.name()),
                    ));
                }
                let isa = if mnemonic == Mnemonic::Push { Isa::Push } else { Isa::Pop };
                self.emit_opcode(isa, (reg as u8) << 4, loc)
            }

            Mnemonic::Jmp => {
                if operands.is_empty() {
                    return Err(Error::semantic(loc.clone(), "JMP needs a target address"));
                }
                let cond = self.parse_condition(operands.get(1))?;
                self.emit_opcode(Isa::Jmp, (cond as u8) << 4, loc)?;
                self.emit_operand_value(&operands[0], Size::Long)
            }
            Mnemonic::Jpb => {
                let expr = self.one_operand(operands, "JPB", loc)?;
                self.emit_opcode(Isa::Jpb, 0, loc)?;
                self.emit_operand_value(expr, Size::Word)
            }
            Mnemonic::Call => {
                let expr = self.one_operand(operands, "CALL", loc)?;
                self.emit_opcode(Isa::Call, 0, loc)?;
                self.emit_operand_value(expr, Size::Long)
            }
            Mnemonic::Rst => {
                let expr = self.one_operand(operands, "RST", loc)?;
                let value = self.eval(expr)?;
                let vec = integer_part(self.expect_number(value, &expr.loc)?);
                if vec > 15 {
                    return Err(Error::semantic(
                        expr.loc.clone(),
                        format!("restart vector {vec} is out of range 0..15"),
                    ));
                }
                self.emit_opcode(Isa::Rst, (vec as u8) << 4, loc)
            }
            Mnemonic::Ret => {
                let cond = self.parse_condition(operands.first())?;
                self.emit_opcode(Isa::Ret, (cond as u8) << 4, loc)
            }

            Mnemonic::Inc => self.encode_register(Isa::Inc, operands, loc),
            Mnemonic::Dec => self.encode_register(Isa::Dec, operands, loc),
            Mnemonic::Not => self.encode_register(Isa::Not, operands, loc),
            Mnemonic::Sla => self.encode_register(Isa::Sla, operands, loc),
            Mnemonic::Sra => self.encode_register(Isa::Sra, operands, loc),
            Mnemonic::Srl => self.encode_register(Isa::Srl, operands, loc),
            Mnemonic::Rl => self.encode_register(Isa::Rl, operands, loc),
            Mnemonic::Rlc => self.encode_register(Isa::Rlc, operands, loc),
            Mnemonic::Rr => self.encode_register(Isa::Rr, operands, loc),
            Mnemonic::Rrc => self.encode_register(Isa::Rrc, operands, loc),
            Mnemonic::Swap => self.encode_register(Isa::Swap, operands, loc),

            Mnemonic::Add => self.encode_arithmetic(Isa::AddImm, Isa::AddReg, operands, loc),
            Mnemonic::Adc => self.encode_arithmetic(Isa::AdcImm, Isa::AdcReg, operands, loc),
            Mnemonic::Sub => self.encode_arithmetic(Isa::SubImm, Isa::SubReg, operands, loc),
            Mnemonic::Sbc => self.encode_arithmetic(Isa::SbcImm, Isa::SbcReg, operands, loc),
            Mnemonic::Cmp => self.encode_arithmetic(Isa::CmpImm, Isa::CmpReg, operands, loc),
            Mnemonic::And => self.encode_arithmetic(Isa::AndImm, Isa::AndReg, operands, loc),
            Mnemonic::Or => self.encode_arithmetic(Isa::OrImm, Isa::OrReg, operands, loc),
            Mnemonic::Xor => self.encode_arithmetic(Isa::XorImm, Isa::XorReg, operands, loc),

            Mnemonic::Bit => self.encode_bit(Isa::Bit, operands, loc),
            Mnemonic::Res => self.encode_bit(Isa::Res, operands, loc),
            Mnemonic::Set => self.encode_bit(Isa::Set, operands, loc),
        }
    }

    fn encode_plain(&mut self, isa: Isa, operands: &[Syntax], loc: &SourceLoc) -> Result<()> {
        if !operands.is_empty() {
            return Err(Error::semantic(
                loc.clone(),
                format!("{} takes no operands", isa.mnemonic()),
            ));
        }
        self.emit_opcode(isa, 0, loc)
    }

    fn encode_register(&mut self, isa: Isa, operands: &[Syntax], loc: &SourceLoc) -> Result<()> {
        let reg = self.one_register(operands, isa.mnemonic(), loc)?;
        self.emit_opcode(isa, (reg as u8) << 4, loc)
    }

    /// The three load sub-forms. `base` is the immediate form; the absolute
    /// form is one opcode later, the register-pointer form two.
    fn encode_load(&mut self, base: Isa, operands: &[Syntax], loc: &SourceLoc) -> Result<()> {
        let [dst_node, src_node] = operands else {
            return Err(Error::semantic(
                loc.clone(),
                format!("{} needs a destination register and a source", base.mnemonic()),
            ));
        };
        let Some(dst) = register_of(dst_node) else {
            return Err(Error::semantic(
                dst_node.loc.clone(),
                format!("{} destination must be a register", base.mnemonic()),
            ));
        };
        let imm = base.immediate().expect("load base form carries an immediate");

        match &src_node.kind {
            SyntaxKind::Address(addr) => {
                let isa = Isa::from_ii(base.ii() + 0x01);
                self.emit_opcode(isa, (dst as u8) << 4, loc)?;
                self.emit_operand_value(addr, imm)
            }
            SyntaxKind::RegPtr(src) => {
                let isa = Isa::from_ii(base.ii() + 0x02);
                if src.size() != imm {
                    return Err(Error::semantic(
                        src_node.loc.clone(),
                        format!(
                            "{} needs a {}-bit pointer register, found {}",
                            base.mnemonic(),
                            imm.bits(),
                            src
                        ),
                    ));
                }
                self.emit_opcode(isa, (dst as u8) << 4 | *src as u8, loc)
            }
            SyntaxKind::Register(_) => Err(Error::semantic(
                src_node.loc.clone(),
                "register-to-register moves use MV",
            )),
            _ => {
                self.emit_opcode(base, (dst as u8) << 4, loc)?;
                self.emit_operand_value(src_node, imm)
            }
        }
    }

    /// The two store sub-forms. `base` is the absolute form; the
    /// register-pointer form is one opcode later.
    fn encode_store(&mut self, base: Isa, operands: &[Syntax], loc: &SourceLoc) -> Result<()> {
        let [dst_node, src_node] = operands else {
            return Err(Error::semantic(
                loc.clone(),
                format!("{} needs a destination and a source register", base.mnemonic()),
            ));
        };
        let Some(src) = register_of(src_node) else {
            return Err(Error::semantic(
                src_node.loc.clone(),
                format!("{} source must be a register", base.mnemonic()),
            ));
        };
        let imm = base.immediate().expect("store base form carries an immediate");

        match &dst_node.kind {
            SyntaxKind::Address(addr) => {
                self.emit_opcode(base, (src as u8) << 4, loc)?;
                self.emit_operand_value(addr, imm)
            }
            SyntaxKind::RegPtr(dst) => {
                let isa = Isa::from_ii(base.ii() + 0x01);
                if dst.size() != imm {
                    return Err(Error::semantic(
                        dst_node.loc.clone(),
                        format!(
                            "{} needs a {}-bit pointer register, found {}",
                            base.mnemonic(),
                            imm.bits(),
                            dst
                        ),
                    ));
                }
                self.emit_opcode(isa, (src as u8) << 4 | *dst as u8, loc)
            }
            _ => Err(Error::semantic(
                dst_node.loc.clone(),
                format!("{} destination must be a bracketed address or register", base.mnemonic()),
            )),
        }
    }

    fn encode_arithmetic(
        &mut self,
        imm_form: Isa,
        reg_form: Isa,
        operands: &[Syntax],
        loc: &SourceLoc,
    ) -> Result<()> {
        let [dst_node, rhs_node] = operands else {
            return Err(Error::semantic(
                loc.clone(),
                format!("{} needs a destination register and an operand", imm_form.mnemonic()),
            ));
        };
        let Some(dst) = register_of(dst_node) else {
            return Err(Error::semantic(
                dst_node.loc.clone(),
                format!("{} destination must be a register", imm_form.mnemonic()),
            ));
        };

        match &rhs_node.kind {
            SyntaxKind::Register(src) => {
                if dst.size() != src.size() {
                    return Err(Error::semantic(
                        rhs_node.loc.clone(),
                        format!("{} needs operands of the same size", reg_form.mnemonic()),
                    ));
                }
                self.emit_opcode(reg_form, (dst as u8) << 4 | *src as u8, loc)
            }
            SyntaxKind::Address(_) | SyntaxKind::RegPtr(_) => Err(Error::semantic(
                rhs_node.loc.clone(),
                format!("{} cannot take a memory operand", imm_form.mnemonic()),
            )),
            _ => {
                self.emit_opcode(imm_form, (dst as u8) << 4, loc)?;
                self.emit_operand_value(rhs_node, Size::Long)
            }
        }
    }

    fn encode_bit(&mut self, isa: Isa, operands: &[Syntax], loc: &SourceLoc) -> Result<()> {
        let [bit_node, reg_node] = operands else {
            return Err(Error::semantic(
                loc.clone(),
                format!("{} needs a bit number and a register", isa.mnemonic()),
            ));
        };
        let Some(reg) = register_of(reg_node) else {
            return Err(Error::semantic(
                reg_node.loc.clone(),
                format!("{} operand must be a register", isa.mnemonic()),
            ));
        };
        self.emit_opcode(isa, (reg as u8) << 4, loc)?;
        self.emit_operand_value(bit_node, Size::Byte)
    }

    /// Resolves a condition operand. The `c` spelling collides with
    /// register C and arrives as a register node.
    fn parse_condition(&self, node: Option<&Syntax>) -> Result<Condition> {
        let Some(node) = node else {
            return Ok(Condition::None);
        };
        match &node.kind {
            SyntaxKind::Identifier(name) => match name.to_ascii_uppercase().as_str() {
                "Z" => Ok(Condition::Zero),
                "NZ" => Ok(Condition::NotZero),
                "NC" => Ok(Condition::NotCarry),
                other => Err(Error::semantic(
                    node.loc.clone(),
                    format!("\"{other}\" is not a branch condition"),
                )),
            },
            SyntaxKind::Register(Register::C) => Ok(Condition::Carry),
            _ => Err(Error::semantic(
                node.loc.clone(),
                "expected a branch condition (Z, NZ, C or NC)",
            )),
        }
    }

    fn one_operand<'a>(
        &self,
        operands: &'a [Syntax],
        what: &str,
        loc: &SourceLoc,
    ) -> Result<&'a Syntax> {
        match operands {
            [operand] => Ok(operand),
            _ => Err(Error::semantic(
                loc.clone(),
                format!("{what} needs exactly one operand"),
            )),
        }
    }

    fn one_register(
        &self,
        operands: &[Syntax],
        what: &str,
        loc: &SourceLoc,
    ) -> Result<Register> {
        let operand = self.one_operand(operands, what, loc)?;
        register_of(operand).ok_or_else(|| {
            Error::semantic(
                operand.loc.clone(),
                format!("{what} operand must be a register"),
            )
        })
    }

    fn two_registers(
        &self,
        operands: &[Syntax],
        what: &str,
        loc: &SourceLoc,
    ) -> Result<(Register, Register)> {
        let [a, b] = operands else {
            return Err(Error::semantic(
                loc.clone(),
                format!("{what} needs two register operands"),
            ));
        };
        match (register_of(a), register_of(b)) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(Error::semantic(
                loc.clone(),
                format!("{what} needs two register operands"),
            )),
        }
    }
}

fn register_of(node: &Syntax) -> Option<Register> {
    match node.kind {
        SyntaxKind::Register(reg) => Some(reg),
        _ => None,
    }
}
