//! Compile-time type information.
//!
//! The source material tags every compiled expression with a
//! `jy_ktype` drawn from the same enum runtime values use, plus two
//! compile-only tags (`JY_K_MATCH`, `JY_K_ACTION`) that never reach the
//! VM. `Resolved` keeps that split explicit: [`jary_vm::ValueKind`] for
//! anything that becomes a runtime value, and two extra variants for
//! the compile-only results.

use jary_vm::ValueKind;

/// A module function's signature, read off its `FuncValue` at the point
/// a `CALL` is compiled.
#[derive(Debug, Clone)]
pub struct FuncSig {
    pub return_kind: Option<ValueKind>,
    pub arg_kinds: Vec<ValueKind>,
}

/// What a compiled expression node type-checks to.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// A loaded runtime value of this kind sits on top of the stack.
    Value(ValueKind),
    /// A `Descriptor` naming a field of this declared kind sits on top
    /// of the stack (only reachable inside a `match` section).
    Descriptor(ValueKind),
    /// A bare scope reference — an `EVENT` or `MODULE` named but not
    /// yet dotted into. Nothing is pushed; this only exists so `within`
    /// can require its left operand to name an ingress directly:
    /// `within` binds to the event, not a dotted field.
    Event(u32),
    Module(u32),
    /// A dotted module member that resolved to a function, not yet
    /// called.
    Func(FuncSig),
    /// The result of a match operator (`exact`/`equal`/`join`/`within`/
    /// `between`/`regex`) — a `Handle` sits on top of the stack.
    Match,
    /// A void-returning call, valid only inside an `action` section.
    Action,
}

impl Resolved {
    pub fn describe(&self) -> &'static str {
        match self {
            Resolved::Value(ValueKind::Long) => "LONG",
            Resolved::Value(ValueKind::ULong) => "ULONG",
            Resolved::Value(ValueKind::Bool) => "BOOL",
            Resolved::Value(ValueKind::Str) => "STR",
            Resolved::Value(ValueKind::Time) => "TIME",
            Resolved::Value(ValueKind::Regex) => "REGEX",
            Resolved::Value(_) => "VALUE",
            Resolved::Descriptor(_) => "DESCRIPTOR",
            Resolved::Event(_) => "EVENT",
            Resolved::Module(_) => "MODULE",
            Resolved::Func(_) => "FUNC",
            Resolved::Match => "MATCH",
            Resolved::Action => "ACTION",
        }
    }
}
