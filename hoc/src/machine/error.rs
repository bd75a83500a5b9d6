//! Runtime errors for the stack machine

use thiserror::Error;

/// Error raised while growing the table/tape or executing a tape
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("undefined variable {0}")]
    UnboundSymbol(String),

    #[error("{0} is not a function")]
    NotAFunction(String),

    #[error("assignment to non-variable {0}")]
    NotAVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack overflow: more than {0} operands")]
    StackOverflow(usize),

    #[error("function {name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("type error: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("tape does not end with stop")]
    MissingStop,

    #[error("malformed tape at {position}: {reason}")]
    MalformedTape {
        position: usize,
        reason: &'static str,
    },

    #[error("{0}: argument out of domain")]
    DomainError(String),

    #[error("{0}: result out of range")]
    RangeError(String),

    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    #[error("output error: {0}")]
    Output(String),
}

/// Fieldless discriminant of [`EvalError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfMemory,
    UnboundSymbol,
    NotAFunction,
    NotAVariable,
    DivisionByZero,
    StackUnderflow,
    StackOverflow,
    ArityMismatch,
    TypeMismatch,
    MissingStop,
    MalformedTape,
    DomainError,
    RangeError,
    StepLimitExceeded,
    Output,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::OutOfMemory => ErrorKind::OutOfMemory,
            EvalError::UnboundSymbol(_) => ErrorKind::UnboundSymbol,
            EvalError::NotAFunction(_) => ErrorKind::NotAFunction,
            EvalError::NotAVariable(_) => ErrorKind::NotAVariable,
            EvalError::DivisionByZero => ErrorKind::DivisionByZero,
            EvalError::StackUnderflow => ErrorKind::StackUnderflow,
            EvalError::StackOverflow(_) => ErrorKind::StackOverflow,
            EvalError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            EvalError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            EvalError::MissingStop => ErrorKind::MissingStop,
            EvalError::MalformedTape { .. } => ErrorKind::MalformedTape,
            EvalError::DomainError(_) => ErrorKind::DomainError,
            EvalError::RangeError(_) => ErrorKind::RangeError,
            EvalError::StepLimitExceeded(_) => ErrorKind::StepLimitExceeded,
            EvalError::Output(_) => ErrorKind::Output,
        }
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        EvalError::ArityMismatch {
            name: name.to_string(),
            expected,
            got,
        }
    }

    pub fn type_mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            expected,
            found: found.into(),
        }
    }

    pub fn malformed(position: usize, reason: &'static str) -> Self {
        EvalError::MalformedTape { position, reason }
    }
}

impl From<std::collections::TryReserveError> for EvalError {
    fn from(_: std::collections::TryReserveError) -> Self {
        EvalError::OutOfMemory
    }
}

/// Result type for machine operations
pub type EvalResult<T> = std::result::Result<T, EvalError>;
