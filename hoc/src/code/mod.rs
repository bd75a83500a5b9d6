//! Instruction tape
//!
//! A flat, growable sequence of opcodes and the operands embedded after
//! `push-constant` / `push-variable`. Positions are plain indices so growth
//! never invalidates a position handed out earlier; only [`Tape::reset`] does.

use crate::machine::EvalResult;
use crate::symbol::{SymbolId, SymbolTable};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Primitive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Op {
    Eval,
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Power,
    Assign,
    CallBuiltin,
    PushVariable,
    PushConstant,
    Print,
    Stop,
}

impl Op {
    pub fn name(self) -> &'static str {
        match self {
            Op::Eval => "eval",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Negate => "negate",
            Op::Power => "power",
            Op::Assign => "assign",
            Op::CallBuiltin => "call-builtin",
            Op::PushVariable => "push-variable",
            Op::PushConstant => "push-constant",
            Op::Print => "print",
            Op::Stop => "stop",
        }
    }

    /// Whether the next tape slot belongs to this instruction
    pub fn has_operand(self) -> bool {
        matches!(self, Op::PushVariable | Op::PushConstant)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tape slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Inst {
    Op(Op),
    Constant(f64),
    Symbol(SymbolId),
}

impl From<Op> for Inst {
    fn from(op: Op) -> Self {
        Inst::Op(op)
    }
}

/// Index of a slot on the tape
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(pub usize);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tape {
    code: Vec<Inst>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one slot, growing storage geometrically
    pub fn append(&mut self, inst: impl Into<Inst>) -> EvalResult<Position> {
        if self.code.len() == self.code.capacity() {
            // double, starting from a small tape
            let additional = self.code.capacity().max(16);
            self.code.try_reserve(additional)?;
        }
        let at = Position(self.code.len());
        self.code.push(inst.into());
        Ok(at)
    }

    /// Truncate to empty, invalidating every position handed out so far
    pub fn reset(&mut self) {
        self.code.clear();
    }

    pub fn emit_op(&mut self, op: Op) -> EvalResult<Position> {
        self.append(op)
    }

    /// `push-constant value`
    pub fn emit_constant(&mut self, value: f64) -> EvalResult<Position> {
        let at = self.append(Op::PushConstant)?;
        self.append(Inst::Constant(value))?;
        Ok(at)
    }

    /// `push-variable symbol`
    pub fn emit_variable(&mut self, symbol: SymbolId) -> EvalResult<Position> {
        let at = self.append(Op::PushVariable)?;
        self.append(Inst::Symbol(symbol))?;
        Ok(at)
    }

    pub fn get(&self, at: Position) -> Option<&Inst> {
        self.code.get(at.0)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.code.capacity()
    }

    pub fn ends_with_stop(&self) -> bool {
        matches!(self.code.last(), Some(Inst::Op(Op::Stop)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inst> {
        self.code.iter()
    }

    /// Human-readable listing, one instruction (with its operand) per line
    pub fn disassemble(&self, symbols: &SymbolTable) -> String {
        let mut out = String::new();
        let mut at = 0;
        while at < self.code.len() {
            let _ = write!(out, "{at:04}  ");
            match self.code[at] {
                Inst::Op(op) if op.has_operand() => {
                    let operand = self
                        .code
                        .get(at + 1)
                        .map(|inst| describe_operand(inst, symbols))
                        .unwrap_or_else(|| "<missing>".to_string());
                    let _ = writeln!(out, "{op} {operand}");
                    at += 2;
                    continue;
                }
                Inst::Op(op) => {
                    let _ = writeln!(out, "{op}");
                }
                ref operand => {
                    let _ = writeln!(out, ".operand {}", describe_operand(operand, symbols));
                }
            }
            at += 1;
        }
        out
    }
}

fn describe_operand(inst: &Inst, symbols: &SymbolTable) -> String {
    match inst {
        Inst::Constant(v) => format!("{v}"),
        Inst::Symbol(id) => match symbols.get(*id) {
            Some(symbol) => symbol.name().to_string(),
            None => format!("<symbol #{}>", id.index()),
        },
        Inst::Op(op) => format!("<{op}>"),
    }
}
