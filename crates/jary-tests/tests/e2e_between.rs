mod common;

use common::compiled;
use jary_vm::Value;

/// `between` is inclusive on both ends; of three rows only the ones
/// inside `[4, 11]` come back out.
#[test]
fn between_keeps_only_rows_inside_the_inclusive_range() {
    let runtime = compiled(
        "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age between 4..11\noutput:\n$data.age\n}\n",
    );
    for age in [8, 4, 11] {
        runtime
            .insert_event("data", &[("__name__", Value::Str("data".into())), ("age", Value::Long(age))])
            .unwrap();
    }

    let mut matched: Vec<i64> = Vec::new();
    runtime
        .execute(|_, output| {
            for i in 0..output.len() {
                if let Some(age) = output.long_at(i) {
                    matched.push(age);
                }
            }
        })
        .unwrap();

    matched.sort_unstable();
    assert_eq!(matched, vec![4, 8, 11]);
}
