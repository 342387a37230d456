//! The host facade: `open/compile/insert_event/execute`, a
//! regular Rust type whose `Drop` is `close()`.
//!
//! Wires `jary-front`'s scanner/parser, `jary-compile`'s semantic
//! compiler, `jary-vm`'s stack VM, and `jary-store`'s SQLite-backed
//! event store together behind one entry point.

mod error;
mod output;

use std::path::{Path, PathBuf};

use jary_compile::Program;
use jary_store::{IngressSchema, Store, StoreConfig};
use jary_vm::{Value, ValueKind, Vm};

pub use error::JaryError;
pub use output::Output;

/// One compiled program plus its backing store. `compile` may be
/// called again on an open `Runtime` to replace the program; the store
/// (and anything already inserted into it) survives the recompile.
pub struct Runtime {
    store: Store,
    program: Option<Program>,
}

impl Runtime {
    pub fn open(config: StoreConfig) -> Result<Self, JaryError> {
        let store = Store::open(&config)?;
        Ok(Self { store, program: None })
    }

    /// Compiles `source`, creating a backing table for every declared
    /// `ingress`. Non-fatal diagnostics still fail `compile`
    /// at the host boundary — a program with diagnostics is never run.
    pub fn compile(&mut self, source: &str, module_directory: Option<&Path>) -> Result<(), JaryError> {
        let program = jary_compile::compile(source, module_directory);
        if !program.is_clean() {
            return Err(JaryError::Compile(program.diagnostics));
        }

        for name in &program.ingresses {
            let schema = event_schema(&program, name)?;
            self.store.create_ingress(&schema)?;
        }

        self.program = Some(program);
        Ok(())
    }

    /// Inserts one event row into `ingress`'s table. `fields` need not
    /// cover every declared column; `__arrival__` is left to its SQL
    /// default unless the caller supplies it explicitly.
    pub fn insert_event(&self, ingress: &str, fields: &[(&str, Value)]) -> Result<(), JaryError> {
        let columns: Vec<(&str, &Value)> = fields.iter().map(|(name, value)| (*name, value)).collect();
        self.store.insert_event(ingress, &columns)?;
        Ok(())
    }

    /// Runs every compiled rule's entry chunk against the store once,
    /// invoking `on_output` with each rule's name and whatever it
    /// pushed in its `output` section.
    pub fn execute(&self, mut on_output: impl FnMut(&str, Output)) -> Result<(), JaryError> {
        let program = self.program.as_ref().ok_or(JaryError::NotCompiled)?;
        let vm = Vm::new(&program.constants, &program.root, &program.entry, &program.filter);

        for rule in &program.rules {
            log::debug!("executing rule '{}'", rule.name);
            let values = vm.run_rule(rule.entry_offset, &self.store)?;
            on_output(&rule.name, Output::new(values));
        }
        Ok(())
    }
}

fn event_schema(program: &Program, name: &str) -> Result<IngressSchema, JaryError> {
    let (_, const_id, kind) = program
        .root
        .get(name)
        .ok_or_else(|| JaryError::UnknownIngress(name.to_string()))?;
    if kind != ValueKind::Event as u32 {
        return Err(JaryError::UnknownIngress(name.to_string()));
    }
    let Value::Event(cell) = &program.constants[const_id as usize] else {
        return Err(JaryError::UnknownIngress(name.to_string()));
    };

    let table = cell.borrow();
    let field_count = table.schema.len() as u32;
    let mut columns = Vec::with_capacity(field_count as usize);
    for member_id in 0..field_count {
        let field_name = table.field_name(member_id).to_string();
        let (_, _, kind_tag) = table
            .schema
            .get(&field_name)
            .expect("field name enumerated from this table's own schema");
        columns.push((field_name, ValueKind::from_tag(kind_tag).unwrap_or(ValueKind::Long)));
    }

    Ok(IngressSchema::new(name, columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_creates_the_ingress_table_and_execute_matches() {
        let mut runtime = Runtime::open(StoreConfig::default()).unwrap();
        let src = "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age exact 8\noutput:\n$data.age\n}\n";
        runtime.compile(src, None).unwrap();
        runtime
            .insert_event("data", &[("__name__", Value::Str("data".into())), ("age", Value::Long(8))])
            .unwrap();

        let mut seen = Vec::new();
        runtime
            .execute(|rule_name, output| {
                seen.push((rule_name.to_string(), output.long_at(0)));
            })
            .unwrap();

        assert_eq!(seen, vec![("r".to_string(), Some(8))]);
    }

    #[test]
    fn execute_before_compile_is_not_compiled() {
        let runtime = Runtime::open(StoreConfig::default()).unwrap();
        let err = runtime.execute(|_, _| {}).unwrap_err();
        assert!(matches!(err, JaryError::NotCompiled));
    }

    #[test]
    fn compile_with_diagnostics_is_rejected() {
        let mut runtime = Runtime::open(StoreConfig::default()).unwrap();
        let err = runtime.compile("rule r {\nmatch:\n$data.age exact 8\n}\n", None).unwrap_err();
        assert!(matches!(err, JaryError::Compile(_)));
    }
}
