//! Code generation: AST to instruction tape
//!
//! Every statement gets a tape of its own ending in `stop`. Expression
//! statements end in `print`; the value an assignment statement leaves on the
//! stack is dropped when the machine halts.
//!
//! Built-in calls use this layout:
//!
//! ```text
//! <arg 1> ... <arg n>  push-constant n  push-variable f  call-builtin
//! ```

use crate::ast::{BinOp, Expr, Span, Spanned};
use crate::code::{Op, Tape};
use crate::error::{CompileError, Result};
use crate::symbol::SymbolTable;

pub struct Compiler<'a> {
    tape: &'a mut Tape,
    symbols: &'a mut SymbolTable,
}

impl<'a> Compiler<'a> {
    pub fn new(tape: &'a mut Tape, symbols: &'a mut SymbolTable) -> Self {
        Self { tape, symbols }
    }

    /// Append one statement to the tape, terminated by `stop`
    pub fn compile_statement(&mut self, stmt: &Spanned<Expr>) -> Result<()> {
        self.expr(stmt)?;
        if !stmt.node.is_assignment() {
            self.op(Op::Print, stmt.span)?;
        }
        self.op(Op::Stop, stmt.span)?;
        tracing::trace!(slots = self.tape.len(), "compiled statement");
        Ok(())
    }

    fn expr(&mut self, expr: &Spanned<Expr>) -> Result<()> {
        let span = expr.span;
        match &expr.node {
            Expr::Number(value) => {
                self.tape
                    .emit_constant(*value)
                    .map_err(|e| CompileError::codegen(e, span))?;
            }
            Expr::Var(name) => {
                self.variable(name, span)?;
                self.op(Op::Eval, span)?;
            }
            Expr::Assign { name, value } => {
                self.variable(&name.node, name.span)?;
                self.expr(value)?;
                self.op(Op::Assign, span)?;
            }
            Expr::Binary { left, op, right } => {
                self.expr(left)?;
                self.expr(right)?;
                let op = match op {
                    BinOp::Add => Op::Add,
                    BinOp::Sub => Op::Sub,
                    BinOp::Mul => Op::Mul,
                    BinOp::Div => Op::Div,
                    BinOp::Pow => Op::Power,
                };
                self.op(op, span)?;
            }
            Expr::Neg(inner) => {
                self.expr(inner)?;
                self.op(Op::Negate, span)?;
            }
            Expr::Call { func, args } => {
                for arg in args {
                    self.expr(arg)?;
                }
                self.tape
                    .emit_constant(args.len() as f64)
                    .map_err(|e| CompileError::codegen(e, span))?;
                self.variable(&func.node, func.span)?;
                self.op(Op::CallBuiltin, span)?;
            }
        }
        Ok(())
    }

    fn variable(&mut self, name: &str, span: Span) -> Result<()> {
        let id = self
            .symbols
            .intern(name)
            .map_err(|e| CompileError::codegen(e, span))?;
        self.tape
            .emit_variable(id)
            .map_err(|e| CompileError::codegen(e, span))?;
        Ok(())
    }

    fn op(&mut self, op: Op, span: Span) -> Result<()> {
        self.tape
            .emit_op(op)
            .map_err(|e| CompileError::codegen(e, span))?;
        Ok(())
    }
}

/// Compile `stmt` onto `tape`
pub fn compile(stmt: &Spanned<Expr>, tape: &mut Tape, symbols: &mut SymbolTable) -> Result<()> {
    Compiler::new(tape, symbols).compile_statement(stmt)
}
