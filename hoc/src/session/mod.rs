//! Evaluation context
//!
//! A session owns everything one calculator needs: the symbol table (with
//! builtins registered), one tape per statement of the current line, the
//! machine, and the current line number used in diagnostics.

use crate::ast::Line;
use crate::builtins;
use crate::code::Tape;
use crate::compiler;
use crate::config::Config;
use crate::error::{CompileError, HocError};
use crate::lexer::tokenize;
use crate::machine::{EvalError, Machine, PrintSink};
use crate::parser::parse;
use crate::symbol::SymbolTable;

pub struct Session {
    symbols: SymbolTable,
    /// Reused across lines; only the first `used` belong to the current one
    tapes: Vec<Tape>,
    used: usize,
    machine: Machine,
    config: Config,
    lineno: usize,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, EvalError> {
        let mut symbols = SymbolTable::new();
        builtins::register(&mut symbols)?;
        Ok(Self {
            symbols,
            tapes: Vec::new(),
            used: 0,
            machine: Machine::with_limits(config.limits()),
            config,
            lineno: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The tapes compiled for the most recent line, one per statement
    pub fn tapes(&self) -> &[Tape] {
        &self.tapes[..self.used]
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Number of lines seen so far
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.symbols.value_of(name)
    }

    /// Compile one line without running it. Each statement is reset onto its
    /// own tape.
    pub fn compile_line(&mut self, source: &str) -> Result<&[Tape], HocError> {
        self.lineno += 1;
        self.used = 0;
        let lineno = self.lineno;
        let line = self.parse_line(source)?;

        for stmt in &line.stmts {
            if self.used == self.tapes.len() {
                self.tapes.try_reserve(1).map_err(|e| HocError::Compile {
                    line: lineno,
                    source: CompileError::codegen(e.into(), stmt.span),
                })?;
                self.tapes.push(Tape::new());
            }
            let tape = &mut self.tapes[self.used];
            tape.reset();
            compiler::compile(stmt, tape, &mut self.symbols)
                .map_err(|source| HocError::Compile { line: lineno, source })?;
            self.used += 1;
        }

        Ok(self.tapes())
    }

    /// Compile and execute one line, sending printed values to `sink`.
    /// Statements run in order; the first failure stops the line.
    pub fn run_line(&mut self, source: &str, sink: &mut dyn PrintSink) -> Result<(), HocError> {
        self.compile_line(source)?;
        let lineno = self.lineno;
        for tape in &self.tapes[..self.used] {
            tracing::trace!(line = lineno, "tape:\n{}", tape.disassemble(&self.symbols));
            self.machine
                .execute(tape, &mut self.symbols, sink)
                .map_err(|source| HocError::Eval { line: lineno, source })?;
        }
        Ok(())
    }

    /// Run a script line by line. A failing line is reported and skipped;
    /// later lines still run.
    pub fn run_source(&mut self, source: &str, sink: &mut dyn PrintSink) -> Vec<HocError> {
        let mut errors = Vec::new();
        for line in source.lines() {
            if let Err(err) = self.run_line(line, sink) {
                tracing::debug!(line = self.lineno, error = %err, "line failed");
                errors.push(err);
            }
        }
        errors
    }

    fn parse_line(&self, source: &str) -> Result<Line, HocError> {
        let lineno = self.lineno;
        tokenize(source)
            .and_then(parse)
            .map_err(|source| HocError::Compile { line: lineno, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{ErrorKind, MachineState};

    fn session() -> Session {
        Session::new(Config::default()).unwrap()
    }

    fn eval_err(err: &HocError) -> ErrorKind {
        err.as_eval().expect("expected an evaluation error").kind()
    }

    #[test]
    fn test_run_line_prints_expression() {
        let mut s = session();
        let mut out: Vec<f64> = Vec::new();
        s.run_line("2 + 3", &mut out).unwrap();
        assert_eq!(out, vec![5.0]);
    }

    #[test]
    fn test_assignment_persists_across_lines() {
        let mut s = session();
        let mut out: Vec<f64> = Vec::new();
        s.run_line("x = 4", &mut out).unwrap();
        s.run_line("x * x", &mut out).unwrap();
        assert_eq!(out, vec![16.0]);
        assert_eq!(s.value_of("x"), Some(4.0));
    }

    #[test]
    fn test_line_numbers_in_errors() {
        let mut s = session();
        let mut out: Vec<f64> = Vec::new();
        s.run_line("1", &mut out).unwrap();
        let err = s.run_line("1 / 0", &mut out).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.to_string(), "division by zero near line 2");
    }

    #[test]
    fn test_unbound_variable() {
        let mut s = session();
        let err = s.run_line("y", &mut Vec::<f64>::new()).unwrap_err();
        assert_eq!(eval_err(&err), ErrorKind::UnboundSymbol);
        assert_eq!(s.machine().state(), MachineState::Failed);
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let mut s = session();
        let err = s.run_line("1 +", &mut Vec::<f64>::new()).unwrap_err();
        assert!(err.as_compile().is_some());
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_run_source_continues_after_error() {
        let mut s = session();
        let mut out: Vec<f64> = Vec::new();
        let errors = s.run_source("a = 2\nb\na * 3\n", &mut out);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), Some(2));
        assert_eq!(out, vec![6.0]);
    }

    #[test]
    fn test_compile_line_leaves_tapes_for_inspection() {
        let mut s = session();
        let tapes = s.compile_line("1 + 2; x = 3").unwrap();
        assert_eq!(tapes.len(), 2);
        assert_eq!(tapes[0].len(), 7);
        assert!(tapes.iter().all(|t| t.ends_with_stop()));
        assert_eq!(s.value_of("x"), None);
    }

    #[test]
    fn test_tapes_are_reset_between_lines() {
        let mut s = session();
        let mut out: Vec<f64> = Vec::new();
        s.run_line("1 + 2 + 3 + 4; 6; 7", &mut out).unwrap();
        s.run_line("5", &mut out).unwrap();
        assert_eq!(s.tapes().len(), 1);
        assert_eq!(s.tapes()[0].len(), 4);
        assert_eq!(out, vec![10.0, 6.0, 7.0, 5.0]);
    }

    #[test]
    fn test_many_assignments_on_one_line() {
        let mut s = session();
        let line = (0..300)
            .map(|i| format!("v{i} = {i}"))
            .collect::<Vec<_>>()
            .join("; ");
        s.run_line(&line, &mut Vec::<f64>::new()).unwrap();
        assert_eq!(s.value_of("v0"), Some(0.0));
        assert_eq!(s.value_of("v299"), Some(299.0));
        assert!(s.machine().stack().is_empty());
    }

    #[test]
    fn test_assignment_values_do_not_linger() {
        let mut s = session();
        s.run_line("a = 1; b = 2", &mut Vec::<f64>::new()).unwrap();
        assert!(s.machine().stack().is_empty());
        assert_eq!(s.machine().state(), MachineState::Halted);
    }

    #[test]
    fn test_statements_after_a_failure_do_not_run() {
        let mut s = session();
        let mut out: Vec<f64> = Vec::new();
        let err = s.run_line("a = 1; 1 / 0; b = 2; 9", &mut out).unwrap_err();
        assert_eq!(eval_err(&err), ErrorKind::DivisionByZero);
        assert_eq!(s.value_of("a"), Some(1.0));
        assert_eq!(s.value_of("b"), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_step_limit_from_config() {
        let config = Config {
            max_steps: Some(4),
            ..Config::default()
        };
        let mut s = Session::new(config).unwrap();
        let err = s.run_line("1 + 2 + 3", &mut Vec::<f64>::new()).unwrap_err();
        assert_eq!(eval_err(&err), ErrorKind::StepLimitExceeded);
    }
}
