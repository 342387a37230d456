//! The built-in `mark` module (`lib/jay/modules/mark.c`).
//!
//! The original keeps one process-wide table keyed by string, which is
//! a bug: the ABI must not assume single-instance. Here the table
//! lives on an `Rc<RefCell<_>>` owned by one `import mark` statement's
//! compiled `ModuleTable`, so two imports (or two compiled programs)
//! never share state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jary_base::NameTable;
use jary_vm::{FuncValue, ModuleTable, RuntimeError, Value, ValueKind};

type MarkTable = Rc<RefCell<HashMap<String, u64>>>;

fn arg_str(args: &[Value], i: usize) -> Result<&str, RuntimeError> {
    args.get(i)
        .ok_or(RuntimeError::TypeMismatch("mark module expects one STR argument"))?
        .as_str()
}

/// Builds a fresh `mark` module instance with its own counting table.
pub fn build() -> ModuleTable {
    let table: MarkTable = Rc::new(RefCell::new(HashMap::new()));

    let mark_table = table.clone();
    let mark: jary_vm::NativeFn = Rc::new(move |args| {
        let key = arg_str(args, 0)?.to_string();
        *mark_table.borrow_mut().entry(key).or_insert(0) += 1;
        Ok(None)
    });

    let unmark_table = table.clone();
    // A miss is not an error: matches the original's `find_entry` miss path.
    let unmark: jary_vm::NativeFn = Rc::new(move |args| {
        let key = arg_str(args, 0)?;
        if let Some(count) = unmark_table.borrow_mut().get_mut(key) {
            *count = count.saturating_sub(1);
        }
        Ok(None)
    });

    let count_table = table;
    let count: jary_vm::NativeFn = Rc::new(move |args| {
        let key = arg_str(args, 0)?;
        let n = count_table.borrow().get(key).copied().unwrap_or(0);
        Ok(Some(Value::Long(n as i64)))
    });

    let mut schema = NameTable::new();
    schema.insert("mark", 0, ValueKind::Func as u32);
    schema.insert("unmark", 1, ValueKind::Func as u32);
    schema.insert("count", 2, ValueKind::Func as u32);

    let functions = vec![
        FuncValue {
            return_kind: None,
            arg_kinds: vec![ValueKind::Str],
            call: mark,
        },
        FuncValue {
            return_kind: None,
            arg_kinds: vec![ValueKind::Str],
            call: unmark,
        },
        FuncValue {
            return_kind: Some(ValueKind::Long),
            arg_kinds: vec![ValueKind::Str],
            call: count,
        },
    ];

    ModuleTable::new(schema, functions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(table: &ModuleTable, name: &str, args: &[Value]) -> Option<Value> {
        let func = table.function_by_name(name).unwrap();
        (func.call)(args).unwrap()
    }

    #[test]
    fn mark_then_count_reports_one() {
        let table = build();
        call(&table, "mark", &[Value::Str("hello".into())]);
        let n = call(&table, "count", &[Value::Str("hello".into())]).unwrap();
        assert_eq!(n.as_long().unwrap(), 1);
    }

    #[test]
    fn unmark_on_missing_key_is_a_no_op() {
        let table = build();
        call(&table, "unmark", &[Value::Str("missing".into())]);
        let n = call(&table, "count", &[Value::Str("missing".into())]).unwrap();
        assert_eq!(n.as_long().unwrap(), 0);
    }

    #[test]
    fn two_instances_never_share_state() {
        let a = build();
        let b = build();
        call(&a, "mark", &[Value::Str("x".into())]);
        let n = call(&b, "count", &[Value::Str("x".into())]).unwrap();
        assert_eq!(n.as_long().unwrap(), 0);
    }
}
