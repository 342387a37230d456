//! Dynamic module loading, via `libloading` rather than raw `dlopen`.
//!
//! `module_load` is handed the host's `def_func` trampoline directly
//! rather than calling back into a host-exported symbol — Rust binaries
//! don't export symbols for `dlopen`'d libraries to resolve the way a
//! C host would, so the function pointer crosses explicitly as a
//! parameter instead.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::rc::Rc;

use jary_base::NameTable;
use jary_vm::{FuncValue, ModuleTable, RuntimeError, Value, ValueKind};
use libloading::{Library, Symbol};

use crate::abi::{CKind, CValue, ModuleEntryFn, NativeCallFn};
use crate::status::Status;

#[derive(Debug)]
pub enum ModuleError {
    NotFound(String),
    Load(String),
}

impl std::fmt::Display for ModuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleError::NotFound(name) => write!(f, "module '{name}' not found"),
            ModuleError::Load(msg) => write!(f, "module load failed: {msg}"),
        }
    }
}

impl std::error::Error for ModuleError {}

/// Collects `def_func` registrations made during one `module_load` call.
#[derive(Default)]
struct RegistrationContext {
    functions: Vec<(String, FuncValue)>,
}

unsafe extern "C" fn def_func_trampoline(
    ctx: *mut c_void,
    name: *const c_char,
    return_kind: c_int,
    arg_kinds: *const c_int,
    arg_count: usize,
    func: NativeCallFn,
    state: *mut c_void,
) {
    let ctx = &mut *(ctx as *mut RegistrationContext);
    let name = CStr::from_ptr(name).to_string_lossy().into_owned();

    let return_kind = CKind::from_raw(return_kind).map(ckind_to_value_kind);
    let arg_kinds: Vec<ValueKind> = std::slice::from_raw_parts(arg_kinds, arg_count)
        .iter()
        .filter_map(|&k| CKind::from_raw(k))
        .map(ckind_to_value_kind)
        .collect();

    let state = state as usize;
    let call: jary_vm::NativeFn = Rc::new(move |args: &[Value]| -> Result<Option<Value>, RuntimeError> {
        // `backing` keeps each Str argument's CString alive until the call
        // returns; `func` only borrows the pointer, it never takes ownership.
        let mut backing = Vec::with_capacity(args.len());
        let cargs: Vec<CValue> = args
            .iter()
            .map(|v| value_to_cvalue(v, &mut backing))
            .collect::<Result<_, _>>()?;
        let mut result = CValue::zeroed();
        let code = unsafe { func(state as *mut c_void, cargs.len(), cargs.as_ptr(), &mut result) };
        let status = Status::from_raw(code);
        if !status.is_ok() {
            return Err(RuntimeError::ModuleCrash(code));
        }
        match CKind::from_raw(result.kind) {
            Some(kind) => Ok(Some(cvalue_to_value(&result, kind))),
            None => Ok(None),
        }
    });

    ctx.functions.push((
        name,
        FuncValue {
            return_kind,
            arg_kinds,
            call,
        },
    ));
}

fn ckind_to_value_kind(k: CKind) -> ValueKind {
    match k {
        CKind::Long => ValueKind::Long,
        CKind::ULong => ValueKind::ULong,
        CKind::Bool => ValueKind::Bool,
        CKind::Str => ValueKind::Str,
    }
}

fn value_to_cvalue(v: &Value, backing: &mut Vec<CString>) -> Result<CValue, RuntimeError> {
    Ok(match v {
        Value::Long(n) => CValue::long(*n),
        Value::ULong(n) => CValue::ulong(*n),
        Value::Bool(b) => CValue::boolean(*b),
        Value::Str(s) => {
            let owned = CString::new(s.as_ref())
                .map_err(|_| RuntimeError::InvariantViolation("module argument contains a NUL byte".into()))?;
            let len = s.len();
            let ptr = owned.as_ptr();
            backing.push(owned);
            CValue {
                kind: CKind::Str as i32,
                long_val: 0,
                str_ptr: ptr,
                str_len: len,
            }
        }
        _ => return Err(RuntimeError::TypeMismatch("module call argument must be LONG/ULONG/BOOL/STR")),
    })
}

fn cvalue_to_value(v: &CValue, kind: CKind) -> Value {
    match kind {
        CKind::Long => Value::Long(v.long_val),
        CKind::ULong => Value::ULong(v.long_val as u64),
        CKind::Bool => Value::Bool(v.long_val != 0),
        CKind::Str => {
            let bytes = unsafe { std::slice::from_raw_parts(v.str_ptr as *const u8, v.str_len) };
            Value::Str(String::from_utf8_lossy(bytes).into_owned().into())
        }
    }
}

/// Loads a module by name from `module_directory`.
pub struct DynamicLoader;

impl DynamicLoader {
    pub fn load(&self, name: &str, module_directory: Option<&Path>) -> Result<ModuleTable, ModuleError> {
        let dir = module_directory.ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        let filename = format!("{}{}{}", std::env::consts::DLL_PREFIX, name, std::env::consts::DLL_SUFFIX);
        let path = dir.join(filename);

        let lib = unsafe { Library::new(&path) }.map_err(|e| ModuleError::Load(e.to_string()))?;
        let load_fn: Symbol<ModuleEntryFn> =
            unsafe { lib.get(b"module_load\0") }.map_err(|e| ModuleError::Load(e.to_string()))?;

        let mut ctx = RegistrationContext::default();
        let mut errmsg: *const c_char = std::ptr::null();
        let code = unsafe {
            load_fn(
                &mut ctx as *mut RegistrationContext as *mut c_void,
                def_func_trampoline,
                &mut errmsg,
            )
        };
        if !Status::from_raw(code).is_ok() {
            let msg = if errmsg.is_null() {
                format!("module_load returned status {code}")
            } else {
                unsafe { CStr::from_ptr(errmsg).to_string_lossy().into_owned() }
            };
            return Err(ModuleError::Load(msg));
        }

        // The library must outlive every FuncValue closure it registered;
        // leaking it ties its lifetime to the process: module unload
        // is deferred until program destruction.
        std::mem::forget(lib);

        let mut schema = NameTable::new();
        let mut functions = Vec::with_capacity(ctx.functions.len());
        for (slot, (name, func)) in ctx.functions.into_iter().enumerate() {
            schema.insert(&name, slot as u32, ValueKind::Func as u32);
            functions.push(func);
        }
        Ok(ModuleTable::new(schema, functions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_module_directory_is_not_found() {
        let loader = DynamicLoader;
        let err = loader.load("doesnotexist", None).unwrap_err();
        assert!(matches!(err, ModuleError::NotFound(_)));
    }
}
