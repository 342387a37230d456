//! The host's external error taxonomy: success, generic
//! error, OOM, compile error, storage error.

use std::fmt;

use jary_base::Diagnostic;
use jary_store::StoreError;
use jary_vm::RuntimeError;

#[derive(Debug)]
pub enum JaryError {
    /// Parsing or compilation raised at least one diagnostic.
    Compile(Vec<Diagnostic>),
    Store(StoreError),
    Runtime(RuntimeError),
    /// `insert_event`/`execute` called before a successful `compile`.
    NotCompiled,
    UnknownIngress(String),
}

impl fmt::Display for JaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JaryError::Compile(diags) => write!(f, "compile failed with {} diagnostic(s)", diags.len()),
            JaryError::Store(err) => write!(f, "{err}"),
            JaryError::Runtime(err) => write!(f, "{err}"),
            JaryError::NotCompiled => write!(f, "no program has been compiled yet"),
            JaryError::UnknownIngress(name) => write!(f, "unknown ingress '{name}'"),
        }
    }
}

impl std::error::Error for JaryError {}

impl From<StoreError> for JaryError {
    fn from(err: StoreError) -> Self {
        JaryError::Store(err)
    }
}

impl From<RuntimeError> for JaryError {
    fn from(err: RuntimeError) -> Self {
        JaryError::Runtime(err)
    }
}
