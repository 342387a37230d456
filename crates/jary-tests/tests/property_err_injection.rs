mod common;

use common::Rng;

const VALID_SOURCE: &str = "import mark\n\
ingress data {\nfield:\nage long\nname str\n}\n\
rule r {\n\
match:\n\
$data.age exact 8\n\
output:\n\
$data.name\n\
action:\n\
mark.mark($data.name)\n\
}\n";

/// Corrupting random bytes of an otherwise-valid source must never
/// make the scanner or parser panic — only ever produce tokens the
/// parser turns into diagnostics.
#[test]
fn random_byte_corruption_never_crashes_the_scanner_or_parser() {
    let mut rng = Rng::new(0xBADF00D);

    for _ in 0..200 {
        let mut bytes = VALID_SOURCE.as_bytes().to_vec();
        let flips = 1 + rng.next_range(5);
        for _ in 0..flips {
            let idx = rng.next_range(bytes.len() as u64) as usize;
            bytes[idx] = rng.next_byte();
        }

        // Corrupting arbitrary bytes can produce invalid UTF-8; the
        // scanner only ever sees `&str`, so skip those mutations (a
        // host never hands the compiler non-UTF-8 source either).
        let Ok(source) = String::from_utf8(bytes) else { continue };

        let result = std::panic::catch_unwind(|| {
            let tokens = jary_front::scan(&source);
            jary_front::parse(&tokens);
        });
        assert!(result.is_ok(), "panicked on corrupted source:\n{source:?}");
    }
}
