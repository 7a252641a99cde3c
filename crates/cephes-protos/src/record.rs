use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// The two C base types that appear in cephes prototypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CType {
    Double,
    Int,
}

impl CType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CType::Double => "double",
            CType::Int => "int",
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "double" => Ok(CType::Double),
            "int" => Ok(CType::Int),
            other => Err(format!("unsupported C type `{}`", other)),
        }
    }
}

/// One declared argument of a native entry point.
///
/// `is_pointer` and `is_array` are tracked separately: array arguments are
/// filled with a bulk write, pointer arguments with a single slot write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub base_type: CType,
    pub is_pointer: bool,
    pub is_array: bool,
    pub name: String,
}

impl ArgSpec {
    /// Display form of the declared type, e.g. `double*` or `int[]`.
    pub fn full_type(&self) -> String {
        let mut full = self.base_type.as_str().to_string();
        if self.is_pointer {
            full.push('*');
        }
        if self.is_array {
            full.push_str("[]");
        }
        full
    }

    /// Whether the argument is passed as an address into linear memory.
    pub fn is_indirect(&self) -> bool {
        self.is_pointer || self.is_array
    }
}

impl Serialize for ArgSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ArgSpec", 5)?;
        state.serialize_field("type", &self.base_type)?;
        state.serialize_field("isPointer", &self.is_pointer)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("isArray", &self.is_array)?;
        state.serialize_field("fullType", &self.full_type())?;
        state.end()
    }
}

/// A parsed native function signature, ready for binding generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrototypeRecord {
    /// Source file stem the prototype was listed under (`gamma` for `cephes/gamma.c`).
    pub filename: String,
    pub return_type: CType,
    /// Function name with the `cephes_` prefix removed.
    pub function_name: String,
    /// Arguments in native call order.
    #[serde(rename = "functionArgs")]
    pub args: Vec<ArgSpec>,
}

impl PrototypeRecord {
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for PrototypeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.function_name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", arg.full_type(), arg.name)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(base_type: CType, is_pointer: bool, is_array: bool, name: &str) -> ArgSpec {
        ArgSpec { base_type, is_pointer, is_array, name: name.to_string() }
    }

    #[test]
    fn test_full_type() {
        assert_eq!(arg(CType::Double, false, false, "x").full_type(), "double");
        assert_eq!(arg(CType::Double, true, false, "y").full_type(), "double*");
        assert_eq!(arg(CType::Int, false, true, "z").full_type(), "int[]");
    }

    #[test]
    fn test_display_signature() {
        let record = PrototypeRecord {
            filename: "polevl".to_string(),
            return_type: CType::Double,
            function_name: "polevl".to_string(),
            args: vec![
                arg(CType::Double, false, false, "x"),
                arg(CType::Double, false, true, "coef"),
                arg(CType::Int, false, false, "N"),
            ],
        };
        assert_eq!(record.to_string(), "double polevl(double x, double[] coef, int N)");
        assert_eq!(record.arity(), 3);
    }

    #[test]
    fn test_ctype_from_str() {
        assert_eq!("double".parse::<CType>(), Ok(CType::Double));
        assert_eq!("int".parse::<CType>(), Ok(CType::Int));
        assert!("float".parse::<CType>().is_err());
    }
}
