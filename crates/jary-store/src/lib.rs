//! SQLite-backed event store: the core VM only
//! ever sees this crate through [`jary_vm::QMatch`]; everything else
//! here is schema/DDL bookkeeping and SQL assembly kept out of the VM.

mod error;
mod schema;
mod sql;
mod store;

pub use error::StoreError;
pub use schema::{sqlite_affinity, IngressSchema};
pub use store::{Store, StoreConfig};
