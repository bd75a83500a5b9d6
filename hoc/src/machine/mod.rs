//! Stack machine
//!
//! Walks a [`Tape`] one instruction at a time against an explicit operand
//! stack. Numeric consumers dereference symbol cells on the way (implicit
//! `eval`); `assign` and `call-builtin` require a symbol cell on top.

mod datum;
mod error;
mod sink;

pub use datum::Datum;
pub use error::{ErrorKind, EvalError, EvalResult};
pub use sink::{format_number, PrintSink, WriterSink};

use crate::builtins;
use crate::code::{Inst, Op, Position, Tape};
use crate::symbol::{SymbolId, SymbolTable, SymbolValue};

/// Default operand stack depth
pub const DEFAULT_MAX_STACK: usize = 256;

/// Lifecycle of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Ready,
    Running,
    Halted,
    Failed,
}

/// Resource bounds for one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_stack: usize,
    /// Instruction budget; `None` runs until `stop`
    pub max_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_stack: DEFAULT_MAX_STACK,
            max_steps: None,
        }
    }
}

#[derive(Debug)]
pub struct Machine {
    stack: Vec<Datum>,
    pc: usize,
    steps: u64,
    state: MachineState,
    limits: Limits,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            stack: Vec::new(),
            pc: 0,
            steps: 0,
            state: MachineState::Ready,
            limits,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    /// Instructions dispatched by the last execution
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Operand stack, bottom first. Empty after a halt; after a failure it
    /// holds whatever the failing instruction left.
    pub fn stack(&self) -> &[Datum] {
        &self.stack
    }

    /// Run `tape` from its first slot until `stop`.
    ///
    /// On failure the machine is left `Failed`; assignments that completed
    /// before the failing instruction stay in `symbols`.
    pub fn execute(
        &mut self,
        tape: &Tape,
        symbols: &mut SymbolTable,
        sink: &mut dyn PrintSink,
    ) -> EvalResult<()> {
        self.stack.clear();
        self.pc = 0;
        self.steps = 0;
        self.state = MachineState::Ready;

        if !tape.ends_with_stop() {
            self.state = MachineState::Failed;
            return Err(EvalError::MissingStop);
        }

        self.state = MachineState::Running;
        match self.run(tape, symbols, sink) {
            Ok(()) => {
                // Values a statement leaves behind are discarded at `stop`.
                self.stack.clear();
                self.state = MachineState::Halted;
                tracing::trace!(steps = self.steps, "halted");
                Ok(())
            }
            Err(err) => {
                self.state = MachineState::Failed;
                tracing::debug!(pc = self.pc, error = %err, "execution failed");
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        tape: &Tape,
        symbols: &mut SymbolTable,
        sink: &mut dyn PrintSink,
    ) -> EvalResult<()> {
        loop {
            if let Some(limit) = self.limits.max_steps
                && self.steps >= limit
            {
                return Err(EvalError::StepLimitExceeded(limit));
            }
            self.steps += 1;

            let op = match tape.get(Position(self.pc)) {
                Some(Inst::Op(op)) => *op,
                Some(_) => {
                    return Err(EvalError::malformed(
                        self.pc,
                        "operand where an opcode was expected",
                    ));
                }
                None => {
                    return Err(EvalError::malformed(self.pc, "ran past the end of the tape"));
                }
            };
            self.pc += 1;

            match op {
                Op::PushConstant => {
                    let value = self.constant_operand(tape)?;
                    self.push(Datum::Number(value))?;
                }
                Op::PushVariable => {
                    let id = self.symbol_operand(tape)?;
                    self.push(Datum::Symbol(id))?;
                }
                Op::Eval => {
                    let value = self.pop_number(symbols)?;
                    self.push(Datum::Number(value))?;
                }
                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Power => {
                    let rhs = self.pop_number(symbols)?;
                    let lhs = self.pop_number(symbols)?;
                    let result = arithmetic(op, lhs, rhs)?;
                    self.push(Datum::Number(result))?;
                }
                Op::Negate => {
                    let value = self.pop_number(symbols)?;
                    self.push(Datum::Number(-value))?;
                }
                Op::Assign => {
                    let value = self.pop_number(symbols)?;
                    let target = self.pop_symbol()?;
                    symbols.assign(target, value)?;
                    self.push(Datum::Number(value))?;
                }
                Op::CallBuiltin => self.call_builtin(symbols)?,
                Op::Print => {
                    let value = self.pop_number(symbols)?;
                    sink.emit(value).map_err(|e| EvalError::Output(e.to_string()))?;
                }
                Op::Stop => return Ok(()),
            }
        }
    }

    fn constant_operand(&mut self, tape: &Tape) -> EvalResult<f64> {
        match tape.get(Position(self.pc)) {
            Some(Inst::Constant(value)) => {
                self.pc += 1;
                Ok(*value)
            }
            _ => Err(EvalError::malformed(
                self.pc,
                "push-constant without a constant operand",
            )),
        }
    }

    fn symbol_operand(&mut self, tape: &Tape) -> EvalResult<SymbolId> {
        match tape.get(Position(self.pc)) {
            Some(Inst::Symbol(id)) => {
                self.pc += 1;
                Ok(*id)
            }
            _ => Err(EvalError::malformed(
                self.pc,
                "push-variable without a symbol operand",
            )),
        }
    }

    /// Callee on top, then the argument count, then the arguments in push order
    fn call_builtin(&mut self, symbols: &mut SymbolTable) -> EvalResult<()> {
        let callee = self.pop_symbol()?;
        let symbol = symbols.get(callee).ok_or_else(|| {
            EvalError::malformed(self.pc, "symbol reference outside the table")
        })?;
        let builtin = *symbol
            .value()
            .as_builtin()
            .ok_or_else(|| EvalError::NotAFunction(symbol.name().to_string()))?;

        let argc = self.pop_number(symbols)?;
        if argc < 0.0 || argc.fract() != 0.0 {
            return Err(EvalError::malformed(
                self.pc,
                "argument count is not a whole number",
            ));
        }
        let argc = argc as usize;
        if argc != builtin.arity {
            return Err(EvalError::arity_mismatch(builtin.name, builtin.arity, argc));
        }
        if self.stack.len() < argc {
            return Err(EvalError::StackUnderflow);
        }

        let mut args = vec![0.0; argc];
        for slot in args.iter_mut().rev() {
            *slot = self.pop_number(symbols)?;
        }
        let result = builtin.call(&args)?;
        self.push(Datum::Number(result))
    }

    fn push(&mut self, datum: Datum) -> EvalResult<()> {
        if self.stack.len() >= self.limits.max_stack {
            return Err(EvalError::StackOverflow(self.limits.max_stack));
        }
        self.stack.try_reserve(1)?;
        self.stack.push(datum);
        Ok(())
    }

    fn pop(&mut self) -> EvalResult<Datum> {
        self.stack.pop().ok_or(EvalError::StackUnderflow)
    }

    /// Pop a number, dereferencing a symbol cell
    fn pop_number(&mut self, symbols: &SymbolTable) -> EvalResult<f64> {
        match self.pop()? {
            Datum::Number(value) => Ok(value),
            Datum::Symbol(id) => {
                let symbol = symbols.get(id).ok_or_else(|| {
                    EvalError::malformed(self.pc, "symbol reference outside the table")
                })?;
                match symbol.value() {
                    SymbolValue::Variable(value) => Ok(*value),
                    SymbolValue::Undefined => {
                        Err(EvalError::UnboundSymbol(symbol.name().to_string()))
                    }
                    SymbolValue::Builtin(_) => Err(EvalError::type_mismatch(
                        "number",
                        format!("builtin {}", symbol.name()),
                    )),
                }
            }
        }
    }

    /// Pop a symbol cell without dereferencing it
    fn pop_symbol(&mut self) -> EvalResult<SymbolId> {
        match self.pop()? {
            Datum::Symbol(id) => Ok(id),
            other => Err(EvalError::type_mismatch("symbol reference", other.type_name())),
        }
    }
}

fn arithmetic(op: Op, lhs: f64, rhs: f64) -> EvalResult<f64> {
    match op {
        Op::Add => Ok(lhs + rhs),
        Op::Sub => Ok(lhs - rhs),
        Op::Mul => Ok(lhs * rhs),
        Op::Div if rhs == 0.0 => Err(EvalError::DivisionByZero),
        Op::Div => Ok(lhs / rhs),
        Op::Power => builtins::power(lhs, rhs),
        other => unreachable!("{other} is not a binary operator"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        symbols: SymbolTable,
        tape: Tape,
        machine: Machine,
        output: Vec<f64>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut symbols = SymbolTable::new();
            builtins::register(&mut symbols).unwrap();
            Self {
                symbols,
                tape: Tape::new(),
                machine: Machine::new(),
                output: Vec::new(),
            }
        }

        fn var(&mut self, name: &str) -> SymbolId {
            self.symbols.intern(name).unwrap()
        }

        fn constant(&mut self, value: f64) -> &mut Self {
            self.tape.emit_constant(value).unwrap();
            self
        }

        fn variable(&mut self, name: &str) -> &mut Self {
            let id = self.var(name);
            self.tape.emit_variable(id).unwrap();
            self
        }

        fn op(&mut self, op: Op) -> &mut Self {
            self.tape.emit_op(op).unwrap();
            self
        }

        fn run(&mut self) -> EvalResult<()> {
            self.machine
                .execute(&self.tape, &mut self.symbols, &mut self.output)
        }
    }

    #[test]
    fn test_add_and_print() {
        let mut f = Fixture::new();
        f.constant(2.0).constant(3.0).op(Op::Add).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![5.0]);
        assert_eq!(f.machine.state(), MachineState::Halted);
    }

    #[test]
    fn test_halt_discards_assigned_value() {
        let mut f = Fixture::new();
        f.variable("x").constant(7.0).op(Op::Assign).op(Op::Stop);
        f.run().unwrap();
        assert!(f.machine.stack().is_empty());
        assert_eq!(f.symbols.value_of("x"), Some(7.0));
    }

    struct BrokenSink;

    impl PrintSink for BrokenSink {
        fn emit(&mut self, _value: f64) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_print_to_failing_sink() {
        let mut f = Fixture::new();
        f.variable("x").constant(1.0).op(Op::Assign);
        f.constant(2.0).op(Op::Print);
        f.variable("y").constant(3.0).op(Op::Assign).op(Op::Stop);
        let err = f
            .machine
            .execute(&f.tape, &mut f.symbols, &mut BrokenSink)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Output);
        assert_eq!(f.machine.state(), MachineState::Failed);
        assert_eq!(f.symbols.value_of("x"), Some(1.0));
        assert_eq!(f.symbols.value_of("y"), None);
    }

    #[test]
    fn test_division_by_zero_emits_nothing() {
        let mut f = Fixture::new();
        f.constant(1.0).constant(0.0).op(Op::Div).op(Op::Print).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::DivisionByZero);
        assert!(f.output.is_empty());
        assert_eq!(f.machine.state(), MachineState::Failed);
    }

    #[test]
    fn test_assign_is_an_expression() {
        let mut f = Fixture::new();
        f.variable("x").constant(7.0).op(Op::Assign).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![7.0]);
        assert_eq!(f.symbols.value_of("x"), Some(7.0));
    }

    #[test]
    fn test_eval_unbound_symbol() {
        let mut f = Fixture::new();
        f.variable("y").op(Op::Eval).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::UnboundSymbol("y".to_string()));
    }

    #[test]
    fn test_eval_leaves_numbers_alone() {
        let mut f = Fixture::new();
        f.constant(4.0).op(Op::Eval).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![4.0]);
    }

    #[test]
    fn test_non_commutative_operand_order() {
        let mut f = Fixture::new();
        f.constant(10.0).constant(4.0).op(Op::Sub).op(Op::Print);
        f.constant(8.0).constant(2.0).op(Op::Div).op(Op::Print);
        f.constant(2.0).constant(3.0).op(Op::Power).op(Op::Print);
        f.op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![6.0, 4.0, 8.0]);
    }

    #[test]
    fn test_binary_ops_dereference_symbols() {
        let mut f = Fixture::new();
        let x = f.var("x");
        f.symbols.assign(x, 5.0).unwrap();
        f.variable("x").constant(2.0).op(Op::Mul).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![10.0]);
    }

    #[test]
    fn test_negate() {
        let mut f = Fixture::new();
        f.constant(3.0).op(Op::Negate).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![-3.0]);
    }

    #[test]
    fn test_call_builtin() {
        let mut f = Fixture::new();
        f.constant(2.0).constant(8.0).constant(2.0).variable("pow");
        f.op(Op::CallBuiltin).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![256.0]);
    }

    #[test]
    fn test_call_builtin_arity_mismatch() {
        let mut f = Fixture::new();
        f.constant(2.0).constant(1.0).variable("pow");
        f.op(Op::CallBuiltin).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::arity_mismatch("pow", 2, 1));
    }

    #[test]
    fn test_call_non_function() {
        let mut f = Fixture::new();
        f.constant(1.0).constant(1.0).variable("x");
        f.op(Op::CallBuiltin).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::NotAFunction("x".to_string()));
    }

    #[test]
    fn test_call_builtin_overwritten_by_variable() {
        let mut f = Fixture::new();
        f.symbols
            .install("sqrt", SymbolValue::Variable(2.0))
            .unwrap();
        f.constant(9.0).constant(1.0).variable("sqrt");
        f.op(Op::CallBuiltin).op(Op::Stop);
        assert_eq!(f.run().unwrap_err().kind(), ErrorKind::NotAFunction);
    }

    #[test]
    fn test_assign_to_builtin_fails() {
        let mut f = Fixture::new();
        f.variable("sin").constant(1.0).op(Op::Assign).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::NotAVariable("sin".to_string()));
    }

    #[test]
    fn test_assign_needs_symbol_target() {
        let mut f = Fixture::new();
        f.constant(1.0).constant(2.0).op(Op::Assign).op(Op::Stop);
        assert_eq!(f.run().unwrap_err().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_stack_underflow() {
        let mut f = Fixture::new();
        f.constant(1.0).op(Op::Add).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::StackUnderflow);
    }

    #[test]
    fn test_missing_stop_runs_nothing() {
        let mut f = Fixture::new();
        f.variable("x").constant(1.0).op(Op::Assign);
        assert_eq!(f.run().unwrap_err(), EvalError::MissingStop);
        assert_eq!(f.symbols.value_of("x"), None);
        assert_eq!(f.machine.steps(), 0);
    }

    #[test]
    fn test_missing_operand_is_malformed() {
        let mut f = Fixture::new();
        f.op(Op::PushConstant).op(Op::Stop);
        assert_eq!(f.run().unwrap_err().kind(), ErrorKind::MalformedTape);
    }

    #[test]
    fn test_stray_operand_is_malformed() {
        let mut f = Fixture::new();
        f.tape.append(Inst::Constant(1.0)).unwrap();
        f.op(Op::Stop);
        assert_eq!(
            f.run().unwrap_err(),
            EvalError::malformed(0, "operand where an opcode was expected")
        );
    }

    #[test]
    fn test_failure_keeps_earlier_assignments() {
        let mut f = Fixture::new();
        f.variable("a").constant(1.0).op(Op::Assign);
        f.constant(1.0).constant(0.0).op(Op::Div);
        f.variable("b").constant(2.0).op(Op::Assign);
        f.op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(f.symbols.value_of("a"), Some(1.0));
        assert_eq!(f.symbols.value_of("b"), None);
    }

    #[test]
    fn test_machine_is_reusable_after_failure() {
        let mut f = Fixture::new();
        f.op(Op::Add).op(Op::Stop);
        assert!(f.run().is_err());
        f.tape.reset();
        f.constant(1.0).op(Op::Print).op(Op::Stop);
        f.run().unwrap();
        assert_eq!(f.output, vec![1.0]);
        assert_eq!(f.machine.state(), MachineState::Halted);
    }

    #[test]
    fn test_step_limit() {
        let mut f = Fixture::new();
        f.machine.set_limits(Limits {
            max_steps: Some(3),
            ..Limits::default()
        });
        f.constant(1.0).constant(2.0).op(Op::Add).op(Op::Print).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::StepLimitExceeded(3));
        assert!(f.output.is_empty());
    }

    #[test]
    fn test_stack_limit() {
        let mut f = Fixture::new();
        f.machine.set_limits(Limits {
            max_stack: 2,
            max_steps: None,
        });
        f.constant(1.0).constant(2.0).constant(3.0).op(Op::Stop);
        assert_eq!(f.run().unwrap_err(), EvalError::StackOverflow(2));
    }

    #[test]
    fn test_arithmetic_operators() {
        assert_eq!(arithmetic(Op::Sub, 10.0, 4.0), Ok(6.0));
        assert_eq!(arithmetic(Op::Div, 9.0, 2.0), Ok(4.5));
        assert_eq!(arithmetic(Op::Div, 1.0, 0.0), Err(EvalError::DivisionByZero));
        assert_eq!(arithmetic(Op::Power, 2.0, 10.0), Ok(1024.0));
    }

    #[test]
    fn test_power_domain_error() {
        let mut f = Fixture::new();
        f.constant(-8.0).constant(0.5).op(Op::Power).op(Op::Stop);
        assert_eq!(f.run().unwrap_err().kind(), ErrorKind::DomainError);
    }
}
