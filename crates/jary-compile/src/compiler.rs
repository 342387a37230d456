//! Shared compiler state threaded through `expr.rs`, `decl.rs` and
//! `rule.rs`.

use std::path::Path;

use jary_base::{Diagnostic, NameTable};
use jary_front::{Ast, Token};

use crate::pool::ConstantPool;

pub struct Compiler<'a> {
    /// The significant (non-space, non-comment) token stream — the same
    /// filtering the parser applies internally, replicated here since
    /// `Ast::token` indices are only meaningful against that list.
    pub(crate) tokens: &'a [Token],
    pub(crate) ast: &'a Ast,
    pub(crate) pool: ConstantPool,
    /// Maps each `import`/`ingress` name to its constant-pool id and a
    /// `ValueKind::{Module,Event}` tag.
    pub(crate) root: NameTable,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) module_directory: Option<&'a Path>,
}

impl<'a> Compiler<'a> {
    pub fn new(tokens: &'a [Token], ast: &'a Ast, module_directory: Option<&'a Path>) -> Self {
        Self {
            tokens,
            ast,
            pool: ConstantPool::new(),
            root: NameTable::new(),
            diagnostics: Vec::new(),
            module_directory,
        }
    }
}
