//! Runtime error taxonomy. Distinct from [`jary_base::Fatal`]:
//! these are VM-level failures the host maps to its own exit codes.

use std::fmt;

#[derive(Debug)]
pub enum RuntimeError {
    OutOfMemory,
    QueryFailed(String),
    InvariantViolation(String),
    StackUnderflow,
    TypeMismatch(&'static str),
    /// A module function (or row callback) returned a nonzero status,
    /// a clean, deliberate runtime crash rather than a panic.
    ModuleCrash(i32),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::OutOfMemory => write!(f, "out of memory"),
            RuntimeError::QueryFailed(msg) => write!(f, "query failed: {msg}"),
            RuntimeError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            RuntimeError::StackUnderflow => write!(f, "operand stack underflow"),
            RuntimeError::TypeMismatch(what) => write!(f, "type mismatch: {what}"),
            RuntimeError::ModuleCrash(code) => write!(f, "module crash (code {code})"),
        }
    }
}

impl std::error::Error for RuntimeError {}
