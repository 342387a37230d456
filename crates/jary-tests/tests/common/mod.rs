#![allow(dead_code)]

use jary::Runtime;
use jary_compile::Program;
use jary_store::{IngressSchema, Store, StoreConfig};
use jary_vm::{FuncValue, Value, ValueKind};

/// Opens an in-memory runtime and compiles `source`, panicking with the
/// diagnostics on failure so a bad fixture fails loudly at the call site.
pub fn compiled(source: &str) -> Runtime {
    let mut runtime = Runtime::open(StoreConfig::default()).expect("open runtime");
    runtime.compile(source, None).unwrap_or_else(|err| panic!("compile failed: {err}"));
    runtime
}

/// Compiles `source` and opens an in-memory store with a table for every
/// declared ingress, the same setup `jary::Runtime::compile` performs —
/// but hands back the `Program` directly so a test can reach into its
/// constant pool (to call a module's functions after `execute`, or to
/// drive the VM by hand).
pub fn compile_with_store(source: &str) -> (Program, Store) {
    let program = jary_compile::compile(source, None);
    assert!(program.is_clean(), "unexpected diagnostics: {:?}", program.diagnostics);

    let mut store = Store::open(&StoreConfig::default()).expect("open store");
    for name in &program.ingresses {
        let schema = event_schema(&program, name);
        store.create_ingress(&schema).expect("create ingress table");
    }
    (program, store)
}

fn event_schema(program: &Program, name: &str) -> IngressSchema {
    let (_, const_id, _) = program.root.get(name).expect("declared ingress");
    let Value::Event(cell) = &program.constants[const_id as usize] else {
        panic!("'{name}' is not an ingress");
    };

    let table = cell.borrow();
    let field_count = table.schema.len() as u32;
    let mut columns = Vec::with_capacity(field_count as usize);
    for member_id in 0..field_count {
        let field_name = table.field_name(member_id).to_string();
        let (_, _, kind_tag) = table.schema.get(&field_name).expect("field enumerated from its own schema");
        columns.push((field_name, ValueKind::from_tag(kind_tag).unwrap_or(ValueKind::Long)));
    }
    IngressSchema::new(name, columns)
}

/// A tiny deterministic PRNG (splitmix64) for the property tests — no
/// external fuzzing crate is pulled in just to pick random bytes/ints.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(seed | 1)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    pub fn next_range(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    pub fn next_byte(&mut self) -> u8 {
        self.next_u64() as u8
    }

    pub fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}

/// Looks up one function of an `import`ed module by name, so a test can
/// call it directly (e.g. to read back `mark`'s counting table after a
/// rule's `action` section has run).
pub fn module_function(program: &Program, module: &str, func: &str) -> FuncValue {
    let (_, const_id, _) = program.root.get(module).expect("declared import");
    let Value::Module(cell) = &program.constants[const_id as usize] else {
        panic!("'{module}' is not a module");
    };
    cell.borrow().function_by_name(func).expect("declared function").clone()
}
