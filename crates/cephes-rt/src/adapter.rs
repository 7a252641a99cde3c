use cephes_memory::{to_int32, MemoryError, MemoryRegion};
use cephes_protos::{ArgSpec, CType, PrototypeRecord};

use crate::error::RuntimeError;
use crate::native::Value;

/// An argument as supplied by host code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostArg {
    Number(f64),
    Int(i32),
    /// An address inside linear memory, for pointer and array parameters.
    Address(u32),
}

impl From<f64> for HostArg {
    fn from(v: f64) -> Self {
        HostArg::Number(v)
    }
}

impl From<i32> for HostArg {
    fn from(v: i32) -> Self {
        HostArg::Int(v)
    }
}

impl From<u32> for HostArg {
    fn from(v: u32) -> Self {
        HostArg::Address(v)
    }
}

/// A prototype bound to the native export that implements it.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    record: PrototypeRecord,
    export: String,
}

impl Binding {
    pub fn new(record: PrototypeRecord, export_prefix: &str) -> Self {
        let export = format!("{}{}", export_prefix, record.function_name);
        Binding { record, export }
    }

    /// Host-facing name (prefix stripped).
    pub fn name(&self) -> &str {
        &self.record.function_name
    }

    pub fn export(&self) -> &str {
        &self.export
    }

    pub fn record(&self) -> &PrototypeRecord {
        &self.record
    }

    /// Converts host arguments to native values in declaration order.
    ///
    /// Pointer and array arguments must already point into `memory`; nothing
    /// is allocated here.
    pub fn marshal(&self, args: &[HostArg], memory: &MemoryRegion) -> Result<Vec<Value>, RuntimeError> {
        if args.len() != self.record.arity() {
            return Err(RuntimeError::ArityMismatch {
                function: self.name().to_string(),
                expected: self.record.arity(),
                found: args.len(),
            });
        }
        self.record
            .args
            .iter()
            .zip(args)
            .map(|(spec, arg)| coerce(spec, *arg, memory))
            .collect()
    }

    /// Checks the native return value against the declared return type.
    pub fn check_return(&self, value: Value) -> Result<Value, RuntimeError> {
        match (self.record.return_type, value) {
            (CType::Double, Value::Double(_)) | (CType::Int, Value::Int(_)) => Ok(value),
            (expected, found) => Err(RuntimeError::ReturnTypeMismatch {
                function: self.name().to_string(),
                expected: expected.as_str(),
                found: found.type_name(),
            }),
        }
    }
}

fn coerce(spec: &ArgSpec, arg: HostArg, memory: &MemoryRegion) -> Result<Value, RuntimeError> {
    if spec.is_indirect() {
        let address = match arg {
            HostArg::Address(a) => a,
            HostArg::Int(i) => i as u32,
            HostArg::Number(n) => to_int32(n) as u32,
        };
        if !memory.contains(address) {
            return Err(MemoryError::OutOfBounds { address, width: 1, size: memory.size() }.into());
        }
        return Ok(Value::Int(address as i32));
    }

    let value = match spec.base_type {
        CType::Int => Value::Int(match arg {
            HostArg::Int(i) => i,
            HostArg::Number(n) => to_int32(n),
            HostArg::Address(a) => a as i32,
        }),
        CType::Double => Value::Double(match arg {
            HostArg::Number(n) => n,
            HostArg::Int(i) => i as f64,
            HostArg::Address(a) => a as f64,
        }),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cephes_memory::MemoryLayout;
    use cephes_protos::parse_str;

    fn binding(line: &str) -> Binding {
        let record = parse_str(line).unwrap().remove(0);
        Binding::new(record, "_cephes_")
    }

    fn memory() -> MemoryRegion {
        MemoryRegion::allocate(MemoryLayout::default()).unwrap()
    }

    #[test]
    fn test_export_name() {
        let b = binding("double cephes_gamma(double x);");
        assert_eq!(b.name(), "gamma");
        assert_eq!(b.export(), "_cephes_gamma");
    }

    #[test]
    fn test_scalar_coercion() {
        let b = binding("double cephes_jn(int n, double x);");
        let values = b.marshal(&[HostArg::Number(2.9), HostArg::Int(3)], &memory()).unwrap();
        assert_eq!(values, vec![Value::Int(2), Value::Double(3.0)]);

        let values = b.marshal(&[HostArg::Number(-1.5), HostArg::Number(0.25)], &memory()).unwrap();
        assert_eq!(values, vec![Value::Int(-1), Value::Double(0.25)]);
    }

    #[test]
    fn test_pointer_arguments_are_addresses() {
        let b = binding("double cephes_frexp(double x, int *pw2);");
        let values = b.marshal(&[HostArg::Number(1.0), 64u32.into()], &memory()).unwrap();
        assert_eq!(values[1], Value::Int(64));
    }

    #[test]
    fn test_pointer_outside_region_is_rejected() {
        let mem = memory();
        let b = binding("double cephes_polevl(double x, double coef[], int N);");
        let err = b
            .marshal(&[HostArg::Number(1.0), HostArg::Address(mem.size()), HostArg::Int(2)], &mem)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Memory(MemoryError::OutOfBounds { .. })));
    }

    #[test]
    fn test_arity_mismatch() {
        let b = binding("double cephes_gamma(double x);");
        let err = b.marshal(&[], &memory()).unwrap_err();
        assert!(matches!(err, RuntimeError::ArityMismatch { expected: 1, found: 0, .. }));
    }

    #[test]
    fn test_check_return() {
        let b = binding("int cephes_isnan(double x);");
        assert_eq!(b.check_return(Value::Int(1)).unwrap(), Value::Int(1));
        assert!(matches!(
            b.check_return(Value::Double(1.0)),
            Err(RuntimeError::ReturnTypeMismatch { expected: "int", found: "double", .. })
        ));
    }
}
