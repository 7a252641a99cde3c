//! The native library's error callback.
//!
//! cephes reports errors through `mtherr(name, code)`, a callback that
//! never returns. Here it is turned into a [`RuntimeError`] that the native
//! entry point propagates out of the call.

use cephes_memory::MemoryRegion;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::error::RuntimeError;

/// Code reported for invalid inputs.
pub const DOMAIN: i32 = 1;

const UNKNOWN_CATEGORY: &str = "unknown error";

/// Categories the library attaches to its error codes.
pub struct ErrorCodeTable {
    categories: FxHashMap<i32, &'static str>,
}

static ERROR_CODES: Lazy<ErrorCodeTable> = Lazy::new(|| {
    let mut categories = FxHashMap::default();
    categories.insert(0, UNKNOWN_CATEGORY);
    categories.insert(DOMAIN, "argument domain error");
    categories.insert(2, "function singularity");
    categories.insert(3, "overflow range error");
    categories.insert(4, "underflow range error");
    categories.insert(5, "total loss of precision");
    categories.insert(6, "partial loss of precision");
    categories.insert(33, "Unix domain error code");
    categories.insert(34, "Unix range error code");
    ErrorCodeTable { categories }
});

impl ErrorCodeTable {
    pub fn global() -> &'static ErrorCodeTable {
        &ERROR_CODES
    }

    pub fn get(&self, code: i32) -> Option<&'static str> {
        self.categories.get(&code).copied()
    }

    /// Category for `code`; codes outside the table read as `unknown error`.
    pub fn category(&self, code: i32) -> &'static str {
        self.get(code).unwrap_or(UNKNOWN_CATEGORY)
    }
}

/// Builds the failure for an `mtherr(name_ptr, code)` callback.
///
/// The function name is a zero-terminated string in linear memory, read up
/// to the terminator or the end of the region. The error class depends only
/// on `code`.
pub fn mtherr(memory: &MemoryRegion, name_ptr: i32, code: i32) -> RuntimeError {
    let function = memory.read_c_string_lossy(name_ptr as u32);
    let category = ErrorCodeTable::global().category(code);
    let message = format!("cephes reports \"{}\" in {}", category, function);
    log::debug!("mtherr code {}: {}", code, message);

    if code == DOMAIN {
        RuntimeError::Domain { function, message }
    } else {
        RuntimeError::Computation { function, code, message }
    }
}
