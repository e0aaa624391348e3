// ABOUTME: Error types for reader and evaluator failures

use std::fmt;
use thiserror::Error;

/// All failures visible at the engine boundary.
///
/// `Display` renders as `Kind: message`, which is exactly the string `trap`
/// reifies into Lisp on a protected-evaluation failure.
#[derive(Error, Debug, Clone)]
pub enum LispError {
    /// Unbound symbol on lookup or `set!`
    #[error("NameError: {0}")]
    Name(String),

    /// Reader errors, malformed forms, wrong argument counts
    #[error("SyntaxError: {0}")]
    Syntax(String),

    /// Wrong operand type (non-pair to `car`, non-integer to `nand`, ...)
    #[error("TypeError: {0}")]
    Type(String),

    /// Raised by the `error` primitive with a caller-supplied message
    #[error("Error: {0}")]
    User(String),

    /// Raised by `exit`; the shell layer interprets it
    #[error("Exit: {0}")]
    Exit(ExitStatus),
}

/// Payload of an `exit` request: a numeric status or a stringified value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitStatus {
    Code(i64),
    Message(String),
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(c) => write!(f, "{}", c),
            ExitStatus::Message(m) => write!(f, "{}", m),
        }
    }
}

impl LispError {
    pub fn name(sym: impl Into<String>) -> Self {
        LispError::Name(sym.into())
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        LispError::Syntax(msg.into())
    }

    pub fn type_err(msg: impl Into<String>) -> Self {
        LispError::Type(msg.into())
    }

    /// The kind name as it appears at the boundary and in `trap` output
    pub fn kind(&self) -> &'static str {
        match self {
            LispError::Name(_) => "NameError",
            LispError::Syntax(_) => "SyntaxError",
            LispError::Type(_) => "TypeError",
            LispError::User(_) => "Error",
            LispError::Exit(_) => "Exit",
        }
    }
}
