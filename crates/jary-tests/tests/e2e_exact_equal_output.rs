mod common;

use common::compiled;
use jary_vm::Value;

/// An `exact` match on one field with an unrelated output field: the
/// output buffer carries whatever the output section names, not the
/// matched field itself.
#[test]
fn exact_match_outputs_a_different_field_than_it_matched_on() {
    let runtime = compiled(
        "ingress data {\nfield:\nid long\nscore long\n}\nrule r {\nmatch:\n$data.id exact 7\noutput:\n$data.score\n}\n",
    );
    runtime
        .insert_event(
            "data",
            &[("__name__", Value::Str("data".into())), ("id", Value::Long(7)), ("score", Value::Long(42))],
        )
        .unwrap();

    let mut seen = Vec::new();
    runtime.execute(|_, output| seen.push(output.long_at(0))).unwrap();

    assert_eq!(seen, vec![Some(42)]);
}
