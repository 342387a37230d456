//! The runtime value representation.
//!
//! The source material packs every value into one tagged machine word
//! with a parallel type-tag array. Rust already gives us that for
//! free with a niche-packed enum — we don't additionally expose a bit
//! cast across variants as API.

use std::fmt;
use std::rc::Rc;

use jary_base::NameTable;

use crate::error::RuntimeError;
use crate::qmatch::QueryOperand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    pub fn seconds_per_unit(self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeValue {
    pub offset: i64,
    pub unit: TimeUnit,
}

impl TimeValue {
    pub fn as_seconds(&self) -> i64 {
        self.offset * self.unit.seconds_per_unit()
    }
}

/// A compile-time-interned `{scope, member}` pair naming an event
/// field at runtime. Kept as a plain integer pair, never upgraded to
/// pointers — interning and equality are bitwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name_id: u32,
    pub member_id: u32,
}

/// An event's runtime field storage: a schema (`NameTable` mapping field
/// name to member slot and declared kind) plus the current value of
/// each field. `names` is the reverse of the schema (member id → field
/// name): `NameTable` only looks up by key, and the storage layer needs
/// to go the other way to build `"table.column"` SQL aliases.
#[derive(Debug, Clone)]
pub struct EventTable {
    pub schema: NameTable,
    names: Vec<Box<str>>,
    fields: Vec<Value>,
}

impl EventTable {
    pub fn new(schema: NameTable, names: Vec<Box<str>>, fields: Vec<Value>) -> Self {
        Self { schema, names, fields }
    }

    pub fn field(&self, member_id: u32) -> &Value {
        &self.fields[member_id as usize]
    }

    pub fn set_field(&mut self, member_id: u32, value: Value) {
        self.fields[member_id as usize] = value;
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.get(name).map(|(_, member_id, _)| self.field(member_id))
    }

    pub fn field_name(&self, member_id: u32) -> &str {
        &self.names[member_id as usize]
    }
}

/// A module's registered functions: a schema (name → slot) plus the
/// native callables at each slot.
#[derive(Clone)]
pub struct ModuleTable {
    pub schema: NameTable,
    functions: Vec<FuncValue>,
}

impl ModuleTable {
    pub fn new(schema: NameTable, functions: Vec<FuncValue>) -> Self {
        Self { schema, functions }
    }

    pub fn function(&self, slot: u32) -> &FuncValue {
        &self.functions[slot as usize]
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FuncValue> {
        self.schema.get(name).map(|(_, slot, _)| self.function(slot))
    }
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleTable")
            .field("functions", &self.functions.len())
            .finish()
    }
}

pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Option<Value>, RuntimeError>>;

/// A module-provided function: its signature (for `CALL`'s argc/type
/// checking) and the native callable the module ABI registered.
#[derive(Clone)]
pub struct FuncValue {
    pub return_kind: Option<ValueKind>,
    pub arg_kinds: Vec<ValueKind>,
    pub call: NativeFn,
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncValue")
            .field("return_kind", &self.return_kind)
            .field("arg_kinds", &self.arg_kinds)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Long,
    ULong,
    Bool,
    Str,
    Time,
    Regex,
    Descriptor,
    Func,
    Event,
    Module,
    Ofs,
    Handle,
}

impl ValueKind {
    /// Inverse of `as u32`: the name table stores a value's kind as a
    /// bare tag, recovered here by declaration order.
    pub fn from_tag(tag: u32) -> Option<ValueKind> {
        const KINDS: [ValueKind; 12] = [
            ValueKind::Long,
            ValueKind::ULong,
            ValueKind::Bool,
            ValueKind::Str,
            ValueKind::Time,
            ValueKind::Regex,
            ValueKind::Descriptor,
            ValueKind::Func,
            ValueKind::Event,
            ValueKind::Module,
            ValueKind::Ofs,
            ValueKind::Handle,
        ];
        KINDS.get(tag as usize).copied()
    }
}

/// One runtime value. Every variant is conceptually the same 8-byte
/// word with a parallel tag in the source material; here the tag and
/// payload are unified by the enum itself.
#[derive(Debug, Clone)]
pub enum Value {
    Long(i64),
    ULong(u64),
    Bool(bool),
    /// Owned, reference-counted UTF-8.
    Str(Rc<str>),
    Time(TimeValue),
    /// Shares the `Str` payload shape but carries a distinct tag.
    Regex(Rc<str>),
    Descriptor(Descriptor),
    Func(FuncValue),
    Event(Rc<std::cell::RefCell<EventTable>>),
    Module(Rc<std::cell::RefCell<ModuleTable>>),
    /// A code offset into the filter chunk.
    Ofs(u32),
    /// A query operand built by `EQUAL`/`JOIN`/`BETWEEN`/`WITHIN`/`REGEX`,
    /// consumed by `QUERY`.
    Handle(QueryOperand),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Long(_) => ValueKind::Long,
            Value::ULong(_) => ValueKind::ULong,
            Value::Bool(_) => ValueKind::Bool,
            Value::Str(_) => ValueKind::Str,
            Value::Time(_) => ValueKind::Time,
            Value::Regex(_) => ValueKind::Regex,
            Value::Descriptor(_) => ValueKind::Descriptor,
            Value::Func(_) => ValueKind::Func,
            Value::Event(_) => ValueKind::Event,
            Value::Module(_) => ValueKind::Module,
            Value::Ofs(_) => ValueKind::Ofs,
            Value::Handle(_) => ValueKind::Handle,
        }
    }

    pub fn as_long(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Long(n) => Ok(*n),
            _ => Err(RuntimeError::TypeMismatch("expected LONG")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(RuntimeError::TypeMismatch("expected BOOL")),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::Str(s) | Value::Regex(s) => Ok(s),
            _ => Err(RuntimeError::TypeMismatch("expected STR")),
        }
    }

    pub fn as_descriptor(&self) -> Result<Descriptor, RuntimeError> {
        match self {
            Value::Descriptor(d) => Ok(*d),
            _ => Err(RuntimeError::TypeMismatch("expected DESCRIPTOR")),
        }
    }

    pub fn as_ofs(&self) -> Result<u32, RuntimeError> {
        match self {
            Value::Ofs(o) => Ok(*o),
            _ => Err(RuntimeError::TypeMismatch("expected OFS")),
        }
    }

    pub fn as_handle(&self) -> Result<&QueryOperand, RuntimeError> {
        match self {
            Value::Handle(h) => Ok(h),
            _ => Err(RuntimeError::TypeMismatch("expected HANDLE")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_value_converts_to_seconds() {
        let t = TimeValue {
            offset: 2,
            unit: TimeUnit::Hour,
        };
        assert_eq!(t.as_seconds(), 7200);
    }

    #[test]
    fn event_table_reads_back_set_field() {
        let mut schema = NameTable::new();
        schema.insert("age", 0, 0);
        let mut table = EventTable::new(schema, vec!["age".into()], vec![Value::Long(0)]);
        table.set_field(0, Value::Long(8));
        assert_eq!(table.field(0).as_long().unwrap(), 8);
        assert_eq!(table.field_by_name("age").unwrap().as_long().unwrap(), 8);
        assert_eq!(table.field_name(0), "age");
    }

    #[test]
    fn value_kind_matches_variant() {
        assert_eq!(Value::Long(1).kind(), ValueKind::Long);
        assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
    }

    #[test]
    fn as_long_rejects_wrong_kind() {
        assert!(Value::Bool(true).as_long().is_err());
    }
}
