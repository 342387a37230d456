mod common;

use common::{compile_with_store, module_function};
use jary_vm::{Value, Vm};

/// A rule's `action` section calls into an imported module; the
/// module's own state (not the VM's output) is what a second query
/// reads back afterwards.
#[test]
fn action_marks_the_row_and_count_reports_one() {
    let (program, store) = compile_with_store(
        "import mark\n\
         ingress data {\n}\n\
         rule r {\n\
         match:\n\
         $data.__name__ exact \"hello\"\n\
         action:\n\
         mark.mark(\"hello\")\n\
         }\n",
    );
    store
        .insert_event("data", &[("__name__", &Value::Str("hello".into()))])
        .unwrap();

    let vm = Vm::new(&program.constants, &program.root, &program.entry, &program.filter);
    for rule in &program.rules {
        vm.run_rule(rule.entry_offset, &store).unwrap();
    }

    let count = module_function(&program, "mark", "count");
    let result = (count.call)(&[Value::Str("hello".into())]).unwrap().expect("count returns a value");
    assert_eq!(result.as_long().unwrap(), 1);
}
