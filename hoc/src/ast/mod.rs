//! Abstract Syntax Tree definitions

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};

/// One input line: zero or more statements separated by `;`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub stmts: Vec<Spanned<Expr>>,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}
