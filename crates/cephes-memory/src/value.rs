use std::fmt;
use std::str::FromStr;

use crate::error::MemoryError;

/// Type tag for a typed access into linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    I1,
    #[default]
    I8,
    I16,
    I32,
    /// Only the low 32 bits are accessed.
    I64,
    Float,
    Double,
    /// Pointers are 32-bit addresses.
    Pointer,
}

impl ValueType {
    /// Number of bytes touched by an access. This is also the alignment the
    /// address is rounded down to.
    pub fn width(self) -> u32 {
        match self {
            ValueType::I1 | ValueType::I8 => 1,
            ValueType::I16 => 2,
            ValueType::I32 | ValueType::I64 | ValueType::Float | ValueType::Pointer => 4,
            ValueType::Double => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::I1 => "i1",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Pointer => "*",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.ends_with('*') {
            return Ok(ValueType::Pointer);
        }
        match s {
            "i1" => Ok(ValueType::I1),
            "i8" => Ok(ValueType::I8),
            "i16" => Ok(ValueType::I16),
            "i32" => Ok(ValueType::I32),
            "i64" => Ok(ValueType::I64),
            "float" => Ok(ValueType::Float),
            "double" => Ok(ValueType::Double),
            other => Err(MemoryError::InvalidType(other.to_string())),
        }
    }
}

/// A value read from or written to linear memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i32),
    Float(f32),
    Double(f64),
}

impl Scalar {
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::Float(v) => v as f64,
            Scalar::Double(v) => v,
        }
    }

    /// Integer view of the value; floating values go through [`to_int32`].
    pub fn as_i32(self) -> i32 {
        match self {
            Scalar::Int(v) => v,
            Scalar::Float(v) => to_int32(v as f64),
            Scalar::Double(v) => to_int32(v),
        }
    }
}

impl From<i8> for Scalar {
    fn from(v: i8) -> Self {
        Scalar::Int(v as i32)
    }
}

impl From<i16> for Scalar {
    fn from(v: i16) -> Self {
        Scalar::Int(v as i32)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(v as i32)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Double(v)
    }
}

/// Converts a host number to a 32-bit integer the way the native boundary
/// does: truncate toward zero, wrap modulo 2^32, map NaN and infinities to 0.
pub fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let wrapped = value.trunc().rem_euclid(4_294_967_296.0);
    if wrapped >= 2_147_483_648.0 {
        (wrapped - 4_294_967_296.0) as i32
    } else {
        wrapped as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_names() {
        assert_eq!("i1".parse::<ValueType>().unwrap(), ValueType::I1);
        assert_eq!("i64".parse::<ValueType>().unwrap(), ValueType::I64);
        assert_eq!("double".parse::<ValueType>().unwrap(), ValueType::Double);
        assert_eq!("double*".parse::<ValueType>().unwrap(), ValueType::Pointer);
        assert_eq!("i8**".parse::<ValueType>().unwrap(), ValueType::Pointer);
        assert_eq!(ValueType::default(), ValueType::I8);
        assert_eq!(
            "u32".parse::<ValueType>(),
            Err(MemoryError::InvalidType("u32".to_string()))
        );
    }

    #[test]
    fn test_to_int32() {
        assert_eq!(to_int32(3.99), 3);
        assert_eq!(to_int32(-3.99), -3);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(f64::INFINITY), 0);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(-1.0), -1);
    }

    #[test]
    fn test_scalar_views() {
        assert_eq!(Scalar::from(-2i8), Scalar::Int(-2));
        assert_eq!(Scalar::Double(7.9).as_i32(), 7);
        assert_eq!(Scalar::Int(5).as_f64(), 5.0);
        assert_eq!(Scalar::from(0x8000_0000u32), Scalar::Int(i32::MIN));
    }
}
