//! The boundary with the compiled cephes library.
//!
//! The library itself is opaque: an engine supplied by the embedder
//! instantiates the compiled artifact against the imports described by
//! [`ImportLayout`] and hands back a [`NativeLibrary`]. During a call the
//! library sees the bridge only through [`Env`].

use std::fmt;

use cephes_memory::MemoryRegion;

use crate::error::RuntimeError;
use crate::trap;

/// A scalar crossing the native calling convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Double(f64),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Double(v) => *v,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            Value::Double(v) => cephes_memory::to_int32(*v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
        }
    }
}

/// An instantiated native library.
pub trait NativeLibrary {
    /// Names of all exported entry points.
    fn exports(&self) -> Vec<String>;

    /// Runs one entry point. Errors reported through [`Env::mtherr`] or
    /// [`Env::dead_hook`] must be returned as-is.
    ///
    /// Native frames are allocated above the watermark last passed to
    /// [`NativeLibrary::sync_stack_pointer`], through `env.memory_mut()`.
    fn invoke(&mut self, export: &str, args: &[Value], env: &mut Env<'_>) -> Result<Value, RuntimeError>;

    /// Called before every entry point with the region's current watermark.
    /// Libraries that keep their own stack pointer (the artifact's
    /// `stackSave`/`stackRestore`) must move it there, so native frames
    /// start above every live host buffer.
    fn sync_stack_pointer(&mut self, _top: u32) {}
}

/// Stack management exports of the artifact. The watermark they manage is
/// owned by the region and pushed in through [`NativeLibrary::sync_stack_pointer`].
pub const STACK_EXPORTS: [&str; 3] = ["stackAlloc", "stackSave", "stackRestore"];

/// Instantiates a compiled artifact. Implemented by the embedder's engine.
pub trait Instantiate {
    fn instantiate(&self, artifact: &[u8], imports: &ImportLayout) -> Result<Box<dyn NativeLibrary>, RuntimeError>;
}

/// Imports that were stubbed out because the bridge never supports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadHook {
    EnlargeMemory,
    GetTotalMemory,
    AbortOnCannotGrowMemory,
    SetErrNo,
    Abort,
    ErrnoLocation,
}

impl DeadHook {
    pub const ALL: [DeadHook; 6] = [
        DeadHook::EnlargeMemory,
        DeadHook::GetTotalMemory,
        DeadHook::AbortOnCannotGrowMemory,
        DeadHook::SetErrNo,
        DeadHook::Abort,
        DeadHook::ErrnoLocation,
    ];

    /// Name of the import in the `env` module.
    pub fn import_name(self) -> &'static str {
        match self {
            DeadHook::EnlargeMemory => "enlargeMemory",
            DeadHook::GetTotalMemory => "getTotalMemory",
            DeadHook::AbortOnCannotGrowMemory => "abortOnCannotGrowMemory",
            DeadHook::SetErrNo => "___setErrNo",
            DeadHook::Abort => "_abort",
            DeadHook::ErrnoLocation => "___errno_location",
        }
    }
}

/// Everything the bridge provides to the artifact at instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLayout {
    pub module: &'static str,
    /// Size of the shared `memory` import in bytes; it cannot grow.
    pub memory_size: u32,
    pub dynamic_top_ptr: u32,
    /// Stack top (`STACKTOP`) at instantiation; later calls sync it through
    /// [`NativeLibrary::sync_stack_pointer`].
    pub stack_top: u32,
    pub stack_max: u32,
    /// Name of the error callback, `(name_ptr: i32, code: i32) -> !`.
    pub error_callback: &'static str,
    pub dead_hooks: Vec<&'static str>,
}

impl ImportLayout {
    pub fn for_memory(memory: &MemoryRegion) -> Self {
        ImportLayout {
            module: "env",
            memory_size: memory.size(),
            dynamic_top_ptr: memory.layout().dynamic_top_ptr,
            stack_top: memory.stack_save(),
            stack_max: memory.stack_max(),
            error_callback: "_mtherr",
            dead_hooks: DeadHook::ALL.iter().map(|h| h.import_name()).collect(),
        }
    }
}

/// What a native entry point can reach while it runs.
pub struct Env<'a> {
    memory: &'a mut MemoryRegion,
}

impl<'a> Env<'a> {
    pub fn new(memory: &'a mut MemoryRegion) -> Self {
        Env { memory }
    }

    pub fn memory(&self) -> &MemoryRegion {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryRegion {
        &mut *self.memory
    }

    /// The `_mtherr` import. It never returns normally: the result is the
    /// error the entry point has to fail with.
    pub fn mtherr(&self, name_ptr: i32, code: i32) -> RuntimeError {
        trap::mtherr(&*self.memory, name_ptr, code)
    }

    /// Any of the disabled imports. Memory hooks report through the region.
    pub fn dead_hook(&mut self, hook: DeadHook) -> RuntimeError {
        let memory_err = match hook {
            DeadHook::EnlargeMemory => self.memory.grow(1).err(),
            DeadHook::GetTotalMemory => self.memory.total_memory_hook().err(),
            _ => None,
        };
        if let Some(err) = memory_err {
            return err.into();
        }
        log::error!("native code called disabled import `{}`", hook.import_name());
        RuntimeError::FatalMisuse { hook: hook.import_name() }
    }
}
