//! Single-pass semantic compiler: turns a parsed rule file into a
//! `Program` — a constant pool, root scope, and the entry/filter
//! bytecode chunks the VM runs.
//!
//! Declarations and rules compile in source order, same as the
//! original: an `ingress`/`import` must precede the rule that
//! references it.

mod compiler;
mod decl;
mod expr;
mod pool;
mod resolve;
mod rule;

use std::path::Path;

use jary_base::{Diagnostic, NameTable};
use jary_front::{Ast, AstKind, TokenKind};
use jary_vm::{Chunk, Value};

pub use pool::ConstantPool;
pub use resolve::{FuncSig, Resolved};
pub use rule::RuleMeta;

use compiler::Compiler;

/// A fully compiled set of declarations and rules, ready to hand to
/// [`jary_vm::Vm::new`].
pub struct Program {
    pub root: NameTable,
    pub constants: Vec<Value>,
    pub entry: Chunk,
    pub filter: Chunk,
    pub rules: Vec<RuleMeta>,
    /// Names of every `ingress` declared, in source order, so a host can
    /// look each one up in `root` and create its backing table without
    /// re-walking the AST itself.
    pub ingresses: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Program {
    /// A compile is only usable if parsing and compilation raised no
    /// diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub fn compile(source: &str, module_directory: Option<&Path>) -> Program {
    let tokens = jary_front::scan(source);
    let parse_output = jary_front::parse(&tokens);

    let significant: Vec<jary_front::Token> = tokens
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Spaces | TokenKind::Comment))
        .collect();

    let mut compiler = Compiler::new(&significant, &parse_output.ast, module_directory);
    let mut entry = Chunk::new();
    let mut filter = Chunk::new();
    let mut rules = Vec::new();
    let mut ingresses = Vec::new();

    for &decl_id in parse_output.ast.children(Ast::ROOT) {
        match parse_output.ast.kind(decl_id) {
            AstKind::ImportStmt => compiler.compile_import(decl_id),
            AstKind::IncludeStmt => compiler.compile_include(decl_id),
            AstKind::IngressDecl => {
                if let Some(name) = compiler.compile_ingress(decl_id) {
                    ingresses.push(name);
                }
            }
            AstKind::RuleDecl => {
                if let Some(meta) = compiler.compile_rule(decl_id, &mut entry, &mut filter) {
                    rules.push(meta);
                }
            }
            other => {
                compiler.error_at(decl_id, format!("unexpected top-level node {other:?}"));
            }
        }
    }

    let mut diagnostics = parse_output.diagnostics;
    diagnostics.extend(compiler.diagnostics);

    Program {
        root: compiler.root,
        constants: compiler.pool.into_values(),
        entry,
        filter,
        rules,
        ingresses,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_basic_match_rule() {
        let src = "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age exact 8\n}\n";
        let program = compile(src, None);
        assert!(program.is_clean(), "{:?}", program.diagnostics);
        assert_eq!(program.rules.len(), 1);
        assert_eq!(program.rules[0].name, "r");
    }

    #[test]
    fn missing_ingress_reference_is_a_diagnostic() {
        let src = "rule r {\nmatch:\n$data.age exact 8\n}\n";
        let program = compile(src, None);
        assert!(!program.is_clean());
    }

    #[test]
    fn mark_module_call_via_dot_access_compiles() {
        let src = "import mark\ningress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age exact 8\naction:\nmark.mark(\"hello\")\n}\n";
        let program = compile(src, None);
        assert!(program.is_clean(), "{:?}", program.diagnostics);
    }

    #[test]
    fn between_accepts_a_range_literal() {
        let src = "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age between 5..10\n}\n";
        let program = compile(src, None);
        assert!(program.is_clean(), "{:?}", program.diagnostics);
    }

    #[test]
    fn within_binds_to_the_bare_event() {
        let src = "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data within 5m\n}\n";
        let program = compile(src, None);
        assert!(program.is_clean(), "{:?}", program.diagnostics);
    }

    #[test]
    fn within_rejects_a_dotted_field() {
        let src = "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age within 5m\n}\n";
        let program = compile(src, None);
        assert!(!program.is_clean());
    }
}
