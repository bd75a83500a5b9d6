//! hoc - stack-machine calculator
//!
//! The core is a symbol table, an instruction tape and a stack machine that
//! executes the tape. The lexer, parser and compiler turn infix text into
//! tapes; [`session::Session`] ties them together one line at a time.

pub mod ast;
pub mod builtins;
pub mod code;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod repl;
pub mod session;
pub mod symbol;

pub use ast::Span;
pub use code::{Inst, Op, Position, Tape};
pub use error::{CompileError, HocError, Result};
pub use machine::{Datum, EvalError, Machine, MachineState, PrintSink};
pub use session::Session;
pub use symbol::{Symbol, SymbolId, SymbolTable, SymbolValue};
