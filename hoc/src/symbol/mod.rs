//! Symbol table
//!
//! Symbols are stored append-only; a [`SymbolId`] is an index into the
//! table and stays valid for the table's lifetime. Reinstalling a name
//! overwrites the existing record in place, so every name maps to exactly
//! one record.

use crate::builtins::Builtin;
use crate::machine::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Back-reference into a [`SymbolTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a symbol currently holds. The variant is the symbol's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolValue {
    /// Referenced by a program but never assigned
    Undefined,
    Variable(f64),
    Builtin(Builtin),
}

impl SymbolValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SymbolValue::Undefined => "undefined",
            SymbolValue::Variable(_) => "variable",
            SymbolValue::Builtin(_) => "builtin",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SymbolValue::Variable(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_builtin(&self) -> Option<&Builtin> {
        match self {
            SymbolValue::Builtin(b) => Some(b),
            _ => None,
        }
    }
}

/// A named entity
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    name: String,
    value: SymbolValue,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SymbolValue {
        &self.value
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the symbol called `name`
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    /// Install or update `name`.
    ///
    /// An existing record is overwritten in place and keeps its id. A new
    /// record is only linked into the index once storage for it has been
    /// reserved, so an allocation failure leaves the table unchanged.
    pub fn install(&mut self, name: &str, value: SymbolValue) -> EvalResult<SymbolId> {
        if let Some(id) = self.lookup(name) {
            self.symbols[id.index()].value = value;
            return Ok(id);
        }

        let id = SymbolId(u32::try_from(self.symbols.len()).map_err(|_| EvalError::OutOfMemory)?);
        self.symbols.try_reserve(1)?;
        self.index.try_reserve(1)?;

        let mut owned = String::new();
        owned.try_reserve_exact(name.len())?;
        owned.push_str(name);

        self.symbols.push(Symbol {
            name: owned.clone(),
            value,
        });
        self.index.insert(owned, id);
        tracing::trace!(name, id = id.index(), "installed symbol");
        Ok(id)
    }

    /// Look `name` up, installing it as [`SymbolValue::Undefined`] if absent
    pub fn intern(&mut self, name: &str) -> EvalResult<SymbolId> {
        match self.lookup(name) {
            Some(id) => Ok(id),
            None => self.install(name, SymbolValue::Undefined),
        }
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Store a number into a variable slot. Fails for builtins.
    pub fn assign(&mut self, id: SymbolId, value: f64) -> EvalResult<()> {
        let symbol = self
            .symbols
            .get_mut(id.index())
            .ok_or_else(|| EvalError::malformed(id.index(), "symbol reference outside the table"))?;
        if let SymbolValue::Builtin(_) = symbol.value {
            return Err(EvalError::NotAVariable(symbol.name.clone()));
        }
        symbol.value = SymbolValue::Variable(value);
        Ok(())
    }

    /// Convenience: the numeric value of a variable, if it has one
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.lookup(name)
            .and_then(|id| self.get(id))
            .and_then(|s| s.value().as_number())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// Variables with an assigned value, in installation order
    pub fn variables(&self) -> impl Iterator<Item = (&str, f64)> {
        self.symbols
            .iter()
            .filter_map(|s| s.value.as_number().map(|v| (s.name(), v)))
    }
}
