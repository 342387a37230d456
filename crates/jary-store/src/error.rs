//! Store-level errors: failures opening the database or
//! issuing DDL, distinct from the per-query [`jary_vm::RuntimeError`]
//! `q_match` itself raises.

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Open(rusqlite::Error),
    Schema(rusqlite::Error),
    Insert(rusqlite::Error),
    UnknownIngress(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Open(err) => write!(f, "failed to open store: {err}"),
            StoreError::Schema(err) => write!(f, "failed to create ingress table: {err}"),
            StoreError::Insert(err) => write!(f, "failed to insert event: {err}"),
            StoreError::UnknownIngress(name) => write!(f, "no ingress table registered for '{name}'"),
        }
    }
}

impl std::error::Error for StoreError {}
