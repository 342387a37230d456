//! The module ABI's status codes (`include/jary/modules.h`).

use std::fmt;

/// Return code a module's native function (or `module_load`/`module_unload`)
/// hands back across the FFI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    ErrOom = 1,
    ErrMismatch = 2,
    IntCrash = 3,
}

impl Status {
    pub fn from_raw(code: i32) -> Status {
        match code {
            0 => Status::Ok,
            1 => Status::ErrOom,
            2 => Status::ErrMismatch,
            _ => Status::IntCrash,
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "ok"),
            Status::ErrOom => write!(f, "out of memory"),
            Status::ErrMismatch => write!(f, "argument mismatch"),
            Status::IntCrash => write!(f, "module crash"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_maps_known_codes() {
        assert_eq!(Status::from_raw(0), Status::Ok);
        assert_eq!(Status::from_raw(1), Status::ErrOom);
        assert_eq!(Status::from_raw(2), Status::ErrMismatch);
    }

    #[test]
    fn unknown_codes_fold_to_crash() {
        assert_eq!(Status::from_raw(99), Status::IntCrash);
    }
}
