//! Error hierarchy for the interpreter.
//!
//! Two families are kept apart:
//!
//! * [`LoxError`] covers everything detected *before* execution (scanner,
//!   parser, resolver) plus the failures of reading a script. Static errors
//!   are collected and block interpretation entirely.
//! * [`RuntimeError`] covers failures while executing a resolved program.
//!   The first one aborts the remaining top-level statements.
//!
//! Neither type prints anything itself; the driver decides where diagnostics go.

use std::io;
use thiserror::Error;

use log::debug;

use crate::token::{Token, TokenType};

/// Static (pre-execution) and I/O errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical error. Scanner errors carry no token, hence no location.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic error. `location` is ` at 'lexeme'`, ` at end` or empty.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        location: String,
    },

    /// Static-analysis error found by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    #[error("Could not read script: {0}")]
    Io(#[from] io::Error),

    #[error("Script is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    pub fn parse<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location(token),
        }
    }

    pub fn resolve<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: location(token),
        }
    }

    /// True for errors that must block execution (exit code 65).
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

fn location(token: &Token<'_>) -> String {
    match token.token_type {
        TokenType::EOF => " at end".to_string(),
        _ => format!(" at '{}'", token.lexeme),
    }
}

/// Failures raised while executing a program.
///
/// Every variant raised by program code carries the line of the offending
/// token; `Output` and `ScopeChain` come from the host side and have none.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.")]
    UndefinedProperty { name: String, line: usize },

    /// Operand or callee of the wrong kind.
    #[error("{message}")]
    Type { message: String, line: usize },

    #[error("Expected {expected} arguments but got {got}.")]
    Arity {
        expected: usize,
        got: usize,
        line: usize,
    },

    /// Nested calls went past the interpreter's depth limit.
    #[error("Stack overflow.")]
    StackOverflow { line: usize },

    /// `print` could not write to its output.
    #[error("Failed to write output: {message}")]
    Output { message: String },

    /// A resolved distance did not match the live environment chain.
    #[error("Internal error: no binding for '{name}' at scope distance {distance}.")]
    ScopeChain { name: String, distance: usize },
}

impl RuntimeError {
    pub fn type_error<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        RuntimeError::Type {
            message: msg.into(),
            line: token.line,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::Type { line, .. }
            | RuntimeError::Arity { line, .. }
            | RuntimeError::StackOverflow { line } => Some(*line),
            RuntimeError::Output { .. } | RuntimeError::ScopeChain { .. } => None,
        }
    }

    /// `message\n[line N]`, the form written to stderr by the driver.
    pub fn report(&self) -> String {
        match self.line() {
            Some(line) => format!("{}\n[line {}]", self, line),
            None => self.to_string(),
        }
    }
}

/// Crate-wide `Result` alias for static-phase operations.
pub type Result<T> = std::result::Result<T, LoxError>;
