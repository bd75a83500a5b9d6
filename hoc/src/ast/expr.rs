//! Expression AST nodes

use super::Spanned;
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal
    Number(f64),

    /// Variable reference
    Var(String),

    /// Assignment: name = value (itself an expression)
    Assign {
        name: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Arithmetic negation
    Neg(Box<Spanned<Expr>>),

    /// Built-in function call
    Call {
        func: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
}

impl Expr {
    /// Assignments are evaluated for effect; everything else is printed
    pub fn is_assignment(&self) -> bool {
        matches!(self, Expr::Assign { .. })
    }
}

/// Build a binary node spanning both operands
pub fn binary(left: Spanned<Expr>, op: BinOp, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.merge(right.span);
    Spanned::new(
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        };
        write!(f, "{s}")
    }
}
