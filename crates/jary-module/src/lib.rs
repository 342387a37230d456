//! The module ABI: dynamic library loading for `import`ed modules, plus
//! the built-in `mark` module.

mod abi;
pub mod mark;
mod loader;
mod status;

use std::path::Path;

pub use loader::{DynamicLoader, ModuleError};
pub use status::Status;

/// Resolves an `import <name>` statement to a populated [`ModuleTable`].
/// `"mark"` is served in-process; anything else is resolved by dynamic
/// loading from `module_directory`.
pub fn load_module(name: &str, module_directory: Option<&Path>) -> Result<jary_vm::ModuleTable, ModuleError> {
    if name == "mark" {
        return Ok(mark::build());
    }
    DynamicLoader.load(name, module_directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_resolves_without_a_module_directory() {
        let table = load_module("mark", None).unwrap();
        assert!(table.function_by_name("mark").is_some());
    }

    #[test]
    fn unknown_module_without_directory_is_not_found() {
        let err = load_module("nope", None).unwrap_err();
        assert!(matches!(err, ModuleError::NotFound(_)));
    }
}
