//! Built-in functions and constants
//!
//! Builtins are ordinary symbols whose value is a [`Builtin`]; the machine
//! reaches them through `call-builtin`. Every routine that can leave the
//! real line goes through [`check`], which turns NaN into a domain error and
//! an overflow into a range error.

use crate::machine::{EvalError, EvalResult};
use crate::symbol::{SymbolTable, SymbolValue};

/// Native routine signature: arguments in push order
pub type NativeFn = fn(&[f64]) -> EvalResult<f64>;

/// A native function exposed under a reserved name
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl Builtin {
    pub fn call(&self, args: &[f64]) -> EvalResult<f64> {
        if args.len() != self.arity {
            return Err(EvalError::arity_mismatch(self.name, self.arity, args.len()));
        }
        (self.func)(args)
    }
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Builtin({}/{})", self.name, self.arity)
    }
}

// Builtins are identified by name; there is one routine per name.
impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "pow", arity: 2, func: builtin_pow },
    Builtin { name: "sin", arity: 1, func: builtin_sin },
    Builtin { name: "cos", arity: 1, func: builtin_cos },
    Builtin { name: "atan", arity: 1, func: builtin_atan },
    Builtin { name: "exp", arity: 1, func: builtin_exp },
    Builtin { name: "log", arity: 1, func: builtin_log },
    Builtin { name: "log10", arity: 1, func: builtin_log10 },
    Builtin { name: "sqrt", arity: 1, func: builtin_sqrt },
    Builtin { name: "int", arity: 1, func: builtin_int },
    Builtin { name: "abs", arity: 1, func: builtin_abs },
];

pub const CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    // Euler-Mascheroni
    ("GAMMA", 0.577_215_664_901_532_9),
    // degrees per radian
    ("DEG", 57.295_779_513_082_32),
    // golden ratio
    ("PHI", 1.618_033_988_749_895),
];

/// Install every builtin and constant into `table`
pub fn register(table: &mut SymbolTable) -> EvalResult<()> {
    for builtin in BUILTINS {
        table.install(builtin.name, SymbolValue::Builtin(*builtin))?;
    }
    for (name, value) in CONSTANTS {
        table.install(name, SymbolValue::Variable(*value))?;
    }
    tracing::debug!(
        builtins = BUILTINS.len(),
        constants = CONSTANTS.len(),
        "registered builtins"
    );
    Ok(())
}

/// Reject results that left the real line
pub fn check(result: f64, what: &str) -> EvalResult<f64> {
    if result.is_nan() {
        Err(EvalError::DomainError(what.to_string()))
    } else if result.is_infinite() {
        Err(EvalError::RangeError(what.to_string()))
    } else {
        Ok(result)
    }
}

/// Checked exponentiation, shared by `pow(x, y)` and the `^` operator
pub fn power(x: f64, y: f64) -> EvalResult<f64> {
    check(x.powf(y), "exponentiation")
}

fn builtin_pow(args: &[f64]) -> EvalResult<f64> {
    power(args[0], args[1])
}

fn builtin_sin(args: &[f64]) -> EvalResult<f64> {
    Ok(args[0].sin())
}

fn builtin_cos(args: &[f64]) -> EvalResult<f64> {
    Ok(args[0].cos())
}

fn builtin_atan(args: &[f64]) -> EvalResult<f64> {
    Ok(args[0].atan())
}

fn builtin_exp(args: &[f64]) -> EvalResult<f64> {
    check(args[0].exp(), "exp")
}

fn builtin_log(args: &[f64]) -> EvalResult<f64> {
    check(args[0].ln(), "log")
}

fn builtin_log10(args: &[f64]) -> EvalResult<f64> {
    check(args[0].log10(), "log10")
}

fn builtin_sqrt(args: &[f64]) -> EvalResult<f64> {
    check(args[0].sqrt(), "sqrt")
}

fn builtin_int(args: &[f64]) -> EvalResult<f64> {
    Ok(args[0].trunc())
}

fn builtin_abs(args: &[f64]) -> EvalResult<f64> {
    Ok(args[0].abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ErrorKind;

    fn builtin(name: &str) -> Builtin {
        *BUILTINS.iter().find(|b| b.name == name).unwrap()
    }

    #[test]
    fn test_register_installs_all() {
        let mut table = SymbolTable::new();
        register(&mut table).unwrap();
        assert_eq!(table.len(), BUILTINS.len() + CONSTANTS.len());
        let pow = table.lookup("pow").unwrap();
        assert!(table.get(pow).unwrap().value().as_builtin().is_some());
        assert_eq!(table.value_of("PI"), Some(std::f64::consts::PI));
    }

    #[test]
    fn test_pow() {
        assert_eq!(builtin("pow").call(&[2.0, 10.0]).unwrap(), 1024.0);
    }

    #[test]
    fn test_pow_domain_error() {
        let err = power(-8.0, 1.0 / 3.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainError);
    }

    #[test]
    fn test_pow_range_error() {
        let err = power(10.0, 400.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
    }

    #[test]
    fn test_log_of_negative_is_domain_error() {
        let err = builtin("log").call(&[-1.0]).unwrap_err();
        assert_eq!(err, EvalError::DomainError("log".to_string()));
    }

    #[test]
    fn test_log_of_zero_is_range_error() {
        let err = builtin("log").call(&[0.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
    }

    #[test]
    fn test_exp_overflow() {
        let err = builtin("exp").call(&[1000.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
    }

    #[test]
    fn test_sqrt_and_abs() {
        assert_eq!(builtin("sqrt").call(&[16.0]).unwrap(), 4.0);
        assert_eq!(builtin("abs").call(&[-2.5]).unwrap(), 2.5);
    }

    #[test]
    fn test_int_truncates_toward_zero() {
        assert_eq!(builtin("int").call(&[2.7]).unwrap(), 2.0);
        assert_eq!(builtin("int").call(&[-2.7]).unwrap(), -2.0);
    }

    #[test]
    fn test_call_checks_arity() {
        let err = builtin("sin").call(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err, EvalError::arity_mismatch("sin", 1, 2));
    }
}
