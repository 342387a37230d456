//! The bytecode VM: values, opcodes, and the dispatch loop that runs a
//! compiled rule against a storage layer implementing [`QMatch`].

mod error;
mod opcode;
mod qmatch;
mod value;
mod vm;

pub use error::RuntimeError;
pub use opcode::{Chunk, Opcode};
pub use qmatch::{BinaryPredicate, ColumnRef, ColumnValue, QMatch, QueryOperand};
pub use value::{Descriptor, EventTable, FuncValue, ModuleTable, NativeFn, TimeUnit, TimeValue, Value, ValueKind};
pub use vm::Vm;
