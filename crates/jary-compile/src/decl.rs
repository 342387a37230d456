//! Top-level declaration compilation: `import`, `include`, `ingress`.

use jary_base::NameTable;
use jary_front::AstKind;
use jary_vm::{EventTable, ValueKind};

use crate::compiler::Compiler;

/// Implicit fields every ingress carries regardless of its declared
/// `field`/`input` section.
const IMPLICIT_FIELDS: &[(&str, ValueKind)] = &[("__name__", ValueKind::Str), ("__arrival__", ValueKind::Time)];

impl<'a> Compiler<'a> {
    pub(crate) fn compile_import(&mut self, id: u32) {
        let name_id = self.ast.children(id)[0];
        let name = self.lexeme(name_id).to_string();

        if self.root.contains(&name) {
            self.error_at(id, "redefinition of import/ingress name");
            return;
        }

        match jary_module::load_module(&name, self.module_directory) {
            Ok(table) => {
                let const_id = self.pool.push_module(table);
                self.root.insert(&name, const_id, ValueKind::Module as u32);
            }
            Err(err) => self.error_at(id, format!("failed to load module '{name}': {err}")),
        }
    }

    /// File inclusion is a host-level concern (resolving and splicing
    /// source text before scanning), not something the core compiler
    /// does — an `include` statement compiles to nothing here.
    pub(crate) fn compile_include(&mut self, _id: u32) {}

    pub(crate) fn compile_ingress(&mut self, id: u32) -> Option<String> {
        let children = self.ast.children(id);
        let name_id = children[0];
        let name = self.lexeme(name_id).to_string();

        if self.root.contains(&name) {
            self.error_at(id, "redefinition of import/ingress name");
            return None;
        }

        let mut schema = NameTable::new();
        let mut names = Vec::new();
        let mut fields = Vec::new();

        for &(field_name, kind) in IMPLICIT_FIELDS {
            let member_id = names.len() as u32;
            schema.insert(field_name, member_id, kind as u32);
            names.push(Box::from(field_name));
            fields.push(default_value(kind));
        }

        for &sect_id in &children[1..] {
            if !matches!(self.ast.kind(sect_id), AstKind::FieldSect) {
                continue;
            }
            for &decl_id in self.ast.children(sect_id) {
                let Some(&type_node) = self.ast.children(decl_id).first() else {
                    continue;
                };
                let field_name = self.lexeme(decl_id).to_string();
                let kind = match self.ast.kind(type_node) {
                    AstKind::LongType => ValueKind::Long,
                    AstKind::StrType => ValueKind::Str,
                    AstKind::BoolType => ValueKind::Bool,
                    _ => {
                        self.error_at(decl_id, "invalid type");
                        continue;
                    }
                };

                if schema.contains(&field_name) {
                    self.error_at(decl_id, "field redefinition");
                    continue;
                }

                let member_id = names.len() as u32;
                schema.insert(&field_name, member_id, kind as u32);
                names.push(field_name.into_boxed_str());
                fields.push(default_value(kind));
            }
        }

        let table = EventTable::new(schema, names, fields);
        let const_id = self.pool.push_event(table);
        self.root.insert(&name, const_id, ValueKind::Event as u32);
        Some(name)
    }
}

fn default_value(kind: ValueKind) -> jary_vm::Value {
    match kind {
        ValueKind::Long => jary_vm::Value::Long(0),
        ValueKind::ULong => jary_vm::Value::ULong(0),
        ValueKind::Bool => jary_vm::Value::Bool(false),
        ValueKind::Str => jary_vm::Value::Str("".into()),
        ValueKind::Time => jary_vm::Value::Time(jary_vm::TimeValue {
            offset: 0,
            unit: jary_vm::TimeUnit::Second,
        }),
        _ => jary_vm::Value::Long(0),
    }
}
