mod common;

use common::{compile_with_store, module_function};
use jary_vm::{Value, Vm};

/// A `join` match line pairs every row of one ingress with every row of
/// another that shares the joined column's value; the action runs once
/// per pair.
#[test]
fn join_across_two_ingresses_runs_the_action_once_per_matching_pair() {
    let (program, store) = compile_with_store(
        "import mark\n\
         ingress data1 {\nfield:\nyes str\nnein str\n}\n\
         ingress data2 {\nfield:\nno str\n}\n\
         rule r {\n\
         match:\n\
         $data1.yes join $data2.no\n\
         action:\n\
         mark.mark(\"hello\")\n\
         }\n",
    );

    store
        .insert_event("data1", &[("yes", &Value::Str("hello".into())), ("nein", &Value::Str("goodbye".into()))])
        .unwrap();
    store
        .insert_event("data1", &[("yes", &Value::Str("hello".into())), ("nein", &Value::Str("bye?".into()))])
        .unwrap();
    store.insert_event("data2", &[("no", &Value::Str("hello".into()))]).unwrap();

    let vm = Vm::new(&program.constants, &program.root, &program.entry, &program.filter);
    for rule in &program.rules {
        vm.run_rule(rule.entry_offset, &store).unwrap();
    }

    let count = module_function(&program, "mark", "count");
    let result = (count.call)(&[Value::Str("hello".into())]).unwrap().expect("count returns a value");
    assert_eq!(result.as_long().unwrap(), 2);
}
