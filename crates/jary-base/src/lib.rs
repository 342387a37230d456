//! Structural atoms shared by every jary crate: arena allocation, source
//! spans, and the diagnostic/fatal-error vocabulary.

mod arena;
mod error;
mod name_table;
mod span;

pub use arena::Arena;
pub use error::{Diagnostic, Fatal};
pub use name_table::NameTable;
pub use span::{Span, TokenSpan};
