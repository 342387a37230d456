mod common;

use common::{compile_with_store, module_function};
use jary_vm::{Value, Vm};

/// `within` binds the event's implicit `__arrival__` field; a row
/// inserted with no explicit arrival time falls back to "now" and so
/// is always within a positive window.
#[test]
fn a_freshly_inserted_row_is_within_the_window() {
    let (program, store) = compile_with_store(
        "import mark\n\
         ingress data {\n}\n\
         rule r {\n\
         match:\n\
         $data within 5m\n\
         action:\n\
         mark.mark(\"seen\")\n\
         }\n",
    );
    store.insert_event("data", &[("__name__", &Value::Str("data".into()))]).unwrap();

    let vm = Vm::new(&program.constants, &program.root, &program.entry, &program.filter);
    for rule in &program.rules {
        vm.run_rule(rule.entry_offset, &store).unwrap();
    }

    let count = module_function(&program, "mark", "count");
    let result = (count.call)(&[Value::Str("seen".into())]).unwrap().expect("count returns a value");
    assert_eq!(result.as_long().unwrap(), 1);
}
