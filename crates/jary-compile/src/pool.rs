//! The compile-time constant pool.
//!
//! `LONG`/`ULONG`/`STR`/`TIME`/`DESCRIPTOR`/`OFS` constants are
//! deduplicated by a linear scan over what's already interned; `EVENT`,
//! `MODULE` and `FUNC` are always pushed fresh since each `import`/
//! `ingress` is its own runtime object, never structurally shared.

use jary_vm::{Descriptor, Value};

#[derive(Default)]
pub struct ConstantPool {
    values: Vec<Value>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, id: u32) -> &Value {
        &self.values[id as usize]
    }

    fn push(&mut self, value: Value) -> u32 {
        let id = self.values.len() as u32;
        self.values.push(value);
        id
    }

    pub fn intern_long(&mut self, n: i64) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Long(existing) = v {
                if *existing == n {
                    return i as u32;
                }
            }
        }
        self.push(Value::Long(n))
    }

    pub fn intern_ulong(&mut self, n: u64) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::ULong(existing) = v {
                if *existing == n {
                    return i as u32;
                }
            }
        }
        self.push(Value::ULong(n))
    }

    pub fn intern_str(&mut self, s: &str) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Str(existing) = v {
                if existing.as_ref() == s {
                    return i as u32;
                }
            }
        }
        self.push(Value::Str(s.into()))
    }

    pub fn intern_regex(&mut self, s: &str) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Regex(existing) = v {
                if existing.as_ref() == s {
                    return i as u32;
                }
            }
        }
        self.push(Value::Regex(s.into()))
    }

    pub fn intern_time(&mut self, t: jary_vm::TimeValue) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Time(existing) = v {
                if *existing == t {
                    return i as u32;
                }
            }
        }
        self.push(Value::Time(t))
    }

    pub fn intern_descriptor(&mut self, d: Descriptor) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Descriptor(existing) = v {
                if *existing == d {
                    return i as u32;
                }
            }
        }
        self.push(Value::Descriptor(d))
    }

    pub fn intern_bool(&mut self, b: bool) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Bool(existing) = v {
                if *existing == b {
                    return i as u32;
                }
            }
        }
        self.push(Value::Bool(b))
    }

    pub fn intern_ofs(&mut self, ofs: u32) -> u32 {
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Ofs(existing) = v {
                if *existing == ofs {
                    return i as u32;
                }
            }
        }
        self.push(Value::Ofs(ofs))
    }

    /// `EVENT`/`MODULE` constants are never deduplicated: every `import`
    /// or `ingress` declares a distinct runtime object even if two
    /// ingresses happen to share a name's lexeme (the parser already
    /// rejects redeclaration at the root scope before this is called).
    pub fn push_event(&mut self, table: jary_vm::EventTable) -> u32 {
        self.push(Value::Event(std::rc::Rc::new(std::cell::RefCell::new(table))))
    }

    pub fn push_module(&mut self, table: jary_vm::ModuleTable) -> u32 {
        self.push(Value::Module(std::rc::Rc::new(std::cell::RefCell::new(table))))
    }

    pub fn push_func(&mut self, func: jary_vm::FuncValue) -> u32 {
        self.push(Value::Func(func))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_long_reuses_the_same_id() {
        let mut pool = ConstantPool::new();
        let a = pool.intern_long(8);
        let b = pool.intern_long(8);
        assert_eq!(a, b);
        assert_eq!(pool.into_values().len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut pool = ConstantPool::new();
        let a = pool.intern_str("hello");
        let b = pool.intern_str("goodbye");
        assert_ne!(a, b);
    }

    #[test]
    fn str_and_regex_do_not_alias_despite_shared_bytes() {
        let mut pool = ConstantPool::new();
        let s = pool.intern_str("a.*b");
        let r = pool.intern_regex("a.*b");
        assert_ne!(s, r);
    }
}
