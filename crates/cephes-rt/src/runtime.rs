use cephes_memory::{MemoryRegion, Scalar, ValueType};
use cephes_protos::PrototypeRecord;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::adapter::{Binding, HostArg};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::native::{Env, ImportLayout, Instantiate, NativeLibrary, Value, STACK_EXPORTS};

/// An instantiated cephes library together with its linear memory and the
/// bindings registered for it.
pub struct Runtime {
    memory: MemoryRegion,
    library: Box<dyn NativeLibrary>,
    exports: FxHashSet<String>,
    bindings: FxHashMap<String, Binding>,
    config: RuntimeConfig,
}

impl Runtime {
    /// Reads the artifact from `config.artifact` and instantiates it with
    /// `engine` against a freshly allocated memory region.
    pub fn load(config: RuntimeConfig, engine: &dyn Instantiate) -> Result<Self, RuntimeError> {
        let memory = MemoryRegion::allocate(config.memory.clone())?;
        log::debug!("loading native artifact {}", config.artifact.display());
        let artifact = std::fs::read(&config.artifact)
            .map_err(|source| RuntimeError::ArtifactRead { path: config.artifact.clone(), source })?;

        let imports = ImportLayout::for_memory(&memory);
        let library = engine.instantiate(&artifact, &imports)?;
        Ok(Self::assemble(config, memory, library))
    }

    /// Wraps an already instantiated library.
    pub fn new(config: RuntimeConfig, library: Box<dyn NativeLibrary>) -> Result<Self, RuntimeError> {
        let memory = MemoryRegion::allocate(config.memory.clone())?;
        Ok(Self::assemble(config, memory, library))
    }

    fn assemble(config: RuntimeConfig, memory: MemoryRegion, library: Box<dyn NativeLibrary>) -> Self {
        let mut exports = FxHashSet::default();
        for name in library.exports() {
            if name.starts_with(&config.export_prefix) {
                log::trace!("export `{}`", name);
                exports.insert(name);
            } else if STACK_EXPORTS.contains(&name.as_str()) {
                log::debug!("stack export `{}` follows the region's watermark", name);
            } else {
                log::warn!("ignoring export `{}` without prefix `{}`", name, config.export_prefix);
            }
        }
        log::debug!("native library exposes {} entry point(s)", exports.len());

        Runtime { memory, library, exports, bindings: FxHashMap::default(), config }
    }

    /// Binds each record to its `<prefix><name>` export. Returns how many
    /// bindings were added; a record with no matching export fails the
    /// whole registration and nothing is bound.
    pub fn register<I>(&mut self, records: I) -> Result<usize, RuntimeError>
    where
        I: IntoIterator<Item = PrototypeRecord>,
    {
        let mut pending = Vec::new();
        for record in records {
            let binding = Binding::new(record, &self.config.export_prefix);
            if !self.exports.contains(binding.export()) {
                return Err(RuntimeError::EntryPointNotFound(binding.export().to_string()));
            }
            pending.push(binding);
        }

        let count = pending.len();
        for binding in pending {
            log::debug!("bound {}", binding.record());
            self.bindings.insert(binding.name().to_string(), binding);
        }
        Ok(count)
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Prefixed exports of the library, unordered.
    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(String::as_str)
    }

    /// Calls a bound function by its unprefixed name.
    pub fn invoke(&mut self, name: &str, args: &[HostArg]) -> Result<Value, RuntimeError> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        let values = binding.marshal(args, &self.memory)?;
        log::trace!("call {}({:?})", binding.export(), values);

        let result = Self::call(&mut self.memory, self.library.as_mut(), binding.export(), &values)?;
        binding.check_return(result)
    }

    // Native frames live above the caller's watermark and are discarded when
    // the call returns, successfully or not. Host allocations are untouched.
    fn call(
        memory: &mut MemoryRegion,
        library: &mut dyn NativeLibrary,
        export: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let watermark = memory.stack_save();
        library.sync_stack_pointer(watermark);
        let result = library.invoke(export, args, &mut Env::new(memory));
        memory.stack_restore(watermark)?;
        result
    }

    /// Calls an export directly with already converted values. No arity or
    /// return checks are made.
    pub fn invoke_raw(&mut self, export: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        if !self.exports.contains(export) {
            return Err(RuntimeError::EntryPointNotFound(export.to_string()));
        }
        Self::call(&mut self.memory, self.library.as_mut(), export, args)
    }

    /// `getValue(ptr, type)`.
    pub fn get_value(&self, address: u32, ty: &str) -> Result<Scalar, RuntimeError> {
        let ty: ValueType = ty.parse()?;
        Ok(self.memory.read(address, ty)?)
    }

    pub fn write_array_to_memory(&mut self, bytes: &[u8], address: u32) -> Result<(), RuntimeError> {
        Ok(self.memory.write_array(bytes, address)?)
    }

    pub fn stack_alloc(&mut self, size: u32) -> Result<u32, RuntimeError> {
        Ok(self.memory.stack_alloc(size)?)
    }

    pub fn stack_save(&self) -> u32 {
        self.memory.stack_save()
    }

    pub fn stack_restore(&mut self, watermark: u32) -> Result<(), RuntimeError> {
        Ok(self.memory.stack_restore(watermark)?)
    }

    pub fn memory(&self) -> &MemoryRegion {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryRegion {
        &mut self.memory
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
