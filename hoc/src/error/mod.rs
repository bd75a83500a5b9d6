//! Error types and reporting

use crate::ast::Span;
use crate::machine::EvalError;
use thiserror::Error;

/// Result type alias for the compile pipeline
pub type Result<T> = std::result::Result<T, CompileError>;

/// Error raised while turning text into a tape
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    /// The tape or symbol table refused to grow while emitting code
    #[error("Code generation error at {span}: {source}")]
    Codegen {
        #[source]
        source: EvalError,
        span: Span,
    },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn codegen(source: EvalError, span: Span) -> Self {
        Self::Codegen { source, span }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } | Self::Codegen { span, .. } => {
                Some(*span)
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Lexer { message, .. } | Self::Parser { message, .. } => message.clone(),
            Self::Codegen { source, .. } => source.to_string(),
        }
    }
}

/// Top-level error of a calculator session
#[derive(Debug, Error)]
pub enum HocError {
    #[error("{source} near line {line}")]
    Compile {
        line: usize,
        #[source]
        source: CompileError,
    },

    #[error("{source} near line {line}")]
    Eval {
        line: usize,
        #[source]
        source: EvalError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl HocError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Line number the error was raised on, for line-scoped errors
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Compile { line, .. } | Self::Eval { line, .. } => Some(*line),
            Self::Io(_) | Self::Config(_) => None,
        }
    }

    pub fn as_eval(&self) -> Option<&EvalError> {
        match self {
            Self::Eval { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn as_compile(&self) -> Option<&CompileError> {
        match self {
            Self::Compile { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Report a compile error against the line it came from
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        CompileError::Lexer { .. } => "Lexer",
        CompileError::Parser { .. } => "Parser",
        CompileError::Codegen { .. } => "Code generation",
    };

    let range: std::ops::Range<usize> = error.span().unwrap_or_default().into();
    Report::build(ReportKind::Error, (filename, range.clone()))
        .with_message(format!("{kind} error"))
        .with_label(
            Label::new((filename, range))
                .with_message(error.message())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)))
}
