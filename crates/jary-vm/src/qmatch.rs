//! The `q_match` contract between the VM and the storage layer. The VM
//! builds a handle set of tagged operands; the storage layer turns
//! them into a query, invoking a callback per matched row.

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPredicate {
    Exact,
    Regexp,
}

/// A resolved `"table.column"` reference: the VM turns a compile-time
/// `Descriptor` into this at the point it builds a `QueryOperand`, so the
/// storage layer only ever deals in the ingress-declared names, never
/// raw descriptor ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// One operand built by `EQUAL`/`JOIN`/`BETWEEN`/`WITHIN`/`REGEX`. The
/// source material builds `EXACT` and `REGEXP` from the same
/// `QMbinary` struct tagged by predicate kind; kept that shape here.
#[derive(Debug, Clone)]
pub enum QueryOperand {
    Binary {
        column: ColumnRef,
        predicate: BinaryPredicate,
        value: Value,
    },
    Join {
        left: ColumnRef,
        right: ColumnRef,
    },
    Between {
        column: ColumnRef,
        min: Value,
        max: Value,
    },
    Within {
        column: ColumnRef,
        seconds: i64,
    },
}

/// One column of a matched row, already split into `table`/`column`
/// from the `"table.column"` alias `q_match` synthesizes.
#[derive(Debug, Clone)]
pub struct ColumnValue {
    pub table: String,
    pub column: String,
    pub value: Value,
}

/// The storage-layer interface the VM's `QUERY` opcode drives.
/// Implemented by `jary-store`'s SQLite-backed event store; `&self`
/// rather than `&mut self` so the filter chunk can recursively re-enter
/// the VM from inside `on_row` without a double mutable borrow.
pub trait QMatch {
    fn q_match(
        &self,
        operands: &[QueryOperand],
        on_row: &mut dyn FnMut(&[ColumnValue]) -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError>;
}
