//! The C-shaped ABI a dynamically loaded module library exports.
//!
//! A module library exports `module_load`/`module_unload`, each of which
//! receives a context pointer and registers functions through `def_func`.
//! Function signature: `fn(state, argc, argv[], &result) -> int` — a
//! nonzero return aborts the VM with a crash code.

use std::os::raw::{c_char, c_int, c_void};

/// Tag for [`CValue`]'s payload. Only the kinds a module signature can
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CKind {
    Long = 0,
    ULong = 1,
    Bool = 2,
    Str = 3,
}

impl CKind {
    pub fn from_raw(raw: i32) -> Option<CKind> {
        match raw {
            0 => Some(CKind::Long),
            1 => Some(CKind::ULong),
            2 => Some(CKind::Bool),
            3 => Some(CKind::Str),
            _ => None,
        }
    }
}

/// A value crossing the module ABI boundary. `str_ptr`/`str_len` are only
/// meaningful when `kind == CKind::Str`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CValue {
    pub kind: i32,
    pub long_val: i64,
    pub str_ptr: *const c_char,
    pub str_len: usize,
}

impl CValue {
    pub fn long(n: i64) -> Self {
        CValue {
            kind: CKind::Long as i32,
            long_val: n,
            str_ptr: std::ptr::null(),
            str_len: 0,
        }
    }

    pub fn ulong(n: u64) -> Self {
        CValue {
            kind: CKind::ULong as i32,
            long_val: n as i64,
            str_ptr: std::ptr::null(),
            str_len: 0,
        }
    }

    pub fn boolean(b: bool) -> Self {
        CValue {
            kind: CKind::Bool as i32,
            long_val: b as i64,
            str_ptr: std::ptr::null(),
            str_len: 0,
        }
    }

    pub fn zeroed() -> Self {
        CValue {
            kind: -1,
            long_val: 0,
            str_ptr: std::ptr::null(),
            str_len: 0,
        }
    }
}

/// Native function pointer a module registers: `fn(state, argc, argv[],
/// &result) -> int`.
pub type NativeCallFn =
    unsafe extern "C" fn(state: *mut c_void, argc: usize, argv: *const CValue, result: *mut CValue) -> c_int;

/// `def_func(ctx, name, return_kind, arg_kinds[], func_ptr)` — registers
/// one function against the module's context. `return_kind` is negative
/// for a void return.
pub type DefFuncFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    name: *const c_char,
    return_kind: c_int,
    arg_kinds: *const c_int,
    arg_count: usize,
    func: NativeCallFn,
    state: *mut c_void,
);

/// `module_load(ctx, def_func, &errmsg)` / `module_unload(ctx, &errmsg)`.
/// The host hands the library its `def_func` trampoline directly rather
/// than the library resolving it by symbol name (see `loader.rs`).
pub type ModuleEntryFn =
    unsafe extern "C" fn(ctx: *mut c_void, def_func: DefFuncFn, errmsg: *mut *const c_char) -> c_int;

/// `module_unload(ctx, &errmsg)` — symmetric cleanup, no registration.
pub type ModuleUnloadFn = unsafe extern "C" fn(ctx: *mut c_void, errmsg: *mut *const c_char) -> c_int;
