//! Operand stack cells

use crate::symbol::SymbolId;

/// A single stack cell: a number or a reference into the symbol table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum {
    Number(f64),
    Symbol(SymbolId),
}

impl Datum {
    /// Tag name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Number(_) => "number",
            Datum::Symbol(_) => "symbol reference",
        }
    }
}
