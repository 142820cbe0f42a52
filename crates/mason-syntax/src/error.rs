//! Error handling types shared by the Mason toolchain.
//!
//! Every stage of the pipeline reports through one exception-free taxonomy:
//! lexing and parsing failures carry a 1-based source position, evaluation
//! failures carry a message, and the target graph reports dependency cycles.
//! The pipeline is linear and the first error aborts the run; a partially
//! accumulated build model from an aborted run is discarded by the caller.
//!
//! # Examples
//!
//! ```rust
//! use mason_syntax::error::{Error, Result, runtime_err};
//!
//! fn parse_count(s: &str) -> Result<i64> {
//!     s.parse()
//!         .map_err(|_| Error::runtime(format!("Invalid count: {}", s)))
//! }
//!
//! fn positive(n: i64) -> Result<i64> {
//!     if n <= 0 {
//!         runtime_err("count must be positive")
//!     } else {
//!         Ok(n)
//!     }
//! }
//! ```

use thiserror::Error;

/// An error raised while processing a Mason build file.
///
/// Lexer and parser errors are positioned; runtime errors are best-effort
/// about location and carry only a message; `Cycle` names the targets left
/// mutually unordered by the dependency graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{message} at {line}:{column}")]
    Lexer {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("{message} at {line}:{column}")]
    Parser {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("{message}")]
    Runtime { message: String },
    #[error("cycle detected among targets [{}]", .names.join(", "))]
    Cycle { names: Vec<String> },
}

impl Error {
    pub fn lexer(message: impl Into<String>, line: usize, column: usize) -> Self {
        Error::Lexer {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn parser(message: impl Into<String>, line: usize, column: usize) -> Self {
        Error::Parser {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime {
            message: message.into(),
        }
    }

    /// Short stage label for user-facing rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Lexer { .. } => "Lex error",
            Error::Parser { .. } => "Parse error",
            Error::Runtime { .. } => "Runtime error",
            Error::Cycle { .. } => "Graph error",
        }
    }

    /// Source position, when the stage that produced the error tracks one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Error::Lexer { line, column, .. } | Error::Parser { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }

    /// The message without the position suffix.
    pub fn message(&self) -> String {
        match self {
            Error::Lexer { message, .. }
            | Error::Parser { message, .. }
            | Error::Runtime { message } => message.clone(),
            Error::Cycle { names } => {
                format!("cycle detected among targets [{}]", names.join(", "))
            }
        }
    }
}

/// A specialized `Result` for Mason operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for a positioned lexer error result.
pub fn lex_err<T>(line: usize, column: usize, message: impl Into<String>) -> Result<T> {
    Err(Error::lexer(message, line, column))
}

/// Shorthand for a positioned parser error result.
pub fn parse_err<T>(line: usize, column: usize, message: impl Into<String>) -> Result<T> {
    Err(Error::parser(message, line, column))
}

/// Shorthand for a runtime error result.
pub fn runtime_err<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::runtime(message))
}
