//! Parser implementation using lalrpop

use crate::ast::{Line, Span};
use crate::error::{CompileError, Result};
use crate::lexer::Token;


lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Parse the tokens of one input line
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Line> {
    let end = tokens.last().map(|(_, span)| span.end).unwrap_or(0);
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end));

    grammar::ProgramParser::new()
        .parse(token_iter)
        .map_err(|e| {
            let span = match &e {
                lalrpop_util::ParseError::InvalidToken { location } => {
                    Span::new(*location, *location + 1)
                }
                lalrpop_util::ParseError::UnrecognizedEof { location, .. } => {
                    Span::new(*location, (*location).max(end) + 1)
                }
                lalrpop_util::ParseError::UnrecognizedToken { token, .. } => {
                    Span::new(token.0, token.2)
                }
                lalrpop_util::ParseError::ExtraToken { token } => Span::new(token.0, token.2),
                lalrpop_util::ParseError::User { .. } => Span::new(0, 1),
            };
            CompileError::parser(describe(&e), span)
        })
}

/// Tokenize and parse in one step
pub fn parse_str(source: &str) -> Result<Line> {
    let tokens = crate::lexer::tokenize(source)?;
    parse(tokens)
}

fn describe<E: std::fmt::Display>(e: &lalrpop_util::ParseError<usize, Token, E>) -> String {
    match e {
        lalrpop_util::ParseError::UnrecognizedEof { .. } => {
            "syntax error: unexpected end of input".to_string()
        }
        lalrpop_util::ParseError::UnrecognizedToken { token, .. } => {
            format!("syntax error: unexpected `{}`", token.1)
        }
        lalrpop_util::ParseError::ExtraToken { token } => {
            format!("syntax error: extra `{}`", token.1)
        }
        other => format!("syntax error: {other}"),
    }
}
