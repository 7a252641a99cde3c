use std::ops::Range;

use crate::error::MemoryError;
use crate::layout::MemoryLayout;
use crate::value::{Scalar, ValueType};

/// The linear memory shared with the native library.
///
/// A single contiguous, zero-initialized byte buffer addressed by `u32`
/// offsets. The low bytes hold the dynamic-top control word, followed by the
/// stack segment and then static data owned by the native side. The size is
/// fixed at allocation; see [`MemoryRegion::grow`].
///
/// All multi-byte values are little-endian.
#[derive(Debug)]
pub struct MemoryRegion {
    pub(crate) bytes: Vec<u8>,
    pub(crate) layout: MemoryLayout,
    pub(crate) stack_max: u32,
    pub(crate) stack_top: u32,
}

impl MemoryRegion {
    /// Allocates and initializes a region for `layout`.
    pub fn allocate(layout: MemoryLayout) -> Result<Self, MemoryError> {
        layout.validate()?;
        let size = layout.region_size()?;
        let stack_max = layout.stack_max()?;

        let mut region = MemoryRegion {
            bytes: vec![0; size as usize],
            stack_top: layout.stack_base,
            stack_max,
            layout,
        };
        region.write_i32(region.layout.dynamic_top_ptr, stack_max as i32)?;

        log::debug!(
            "allocated linear memory: {} bytes, stack [{}, {})",
            size,
            region.layout.stack_base,
            stack_max
        );
        Ok(region)
    }

    /// Region size in bytes.
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Whether `address` names a byte inside the region.
    pub fn contains(&self, address: u32) -> bool {
        (address as usize) < self.bytes.len()
    }

    /// Value of the dynamic-top control word.
    pub fn dynamic_top(&self) -> Result<u32, MemoryError> {
        Ok(self.read_i32(self.layout.dynamic_top_ptr)? as u32)
    }

    fn span(&self, address: u32, width: u32) -> Result<Range<usize>, MemoryError> {
        let start = address as usize;
        let end = start + width as usize;
        if end > self.bytes.len() {
            return Err(MemoryError::OutOfBounds { address, width, size: self.size() });
        }
        Ok(start..end)
    }

    /// Typed accesses index the region as an array of their own width, so
    /// the address is rounded down to a multiple of that width.
    fn typed_span(&self, address: u32, ty: ValueType) -> Result<Range<usize>, MemoryError> {
        let width = ty.width();
        self.span(address & !(width - 1), width)
    }

    /// Reads a typed value.
    ///
    /// `I1`/`I8`/`I16` sign-extend into [`Scalar::Int`]. `I64` reads only the
    /// low 32 bits.
    pub fn read(&self, address: u32, ty: ValueType) -> Result<Scalar, MemoryError> {
        let span = self.typed_span(address, ty)?;
        let raw = &self.bytes[span];
        let value = match ty {
            ValueType::I1 | ValueType::I8 => Scalar::Int(raw[0] as i8 as i32),
            ValueType::I16 => Scalar::Int(i16::from_le_bytes([raw[0], raw[1]]) as i32),
            ValueType::I32 | ValueType::I64 | ValueType::Pointer => {
                Scalar::Int(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            ValueType::Float => Scalar::Float(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            ValueType::Double => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                Scalar::Double(f64::from_le_bytes(buf))
            }
        };
        Ok(value)
    }

    /// Writes a typed value, coercing it to the slot type first.
    ///
    /// Integer slots narrow by wrapping; `I64` stores the low 32 bits.
    pub fn write(&mut self, address: u32, ty: ValueType, value: impl Into<Scalar>) -> Result<(), MemoryError> {
        let span = self.typed_span(address, ty)?;
        let value = value.into();
        let slot = &mut self.bytes[span];
        match ty {
            ValueType::I1 | ValueType::I8 => slot[0] = value.as_i32() as u8,
            ValueType::I16 => slot.copy_from_slice(&(value.as_i32() as i16).to_le_bytes()),
            ValueType::I32 | ValueType::I64 | ValueType::Pointer => {
                slot.copy_from_slice(&value.as_i32().to_le_bytes())
            }
            ValueType::Float => slot.copy_from_slice(&(value.as_f64() as f32).to_le_bytes()),
            ValueType::Double => slot.copy_from_slice(&value.as_f64().to_le_bytes()),
        }
        Ok(())
    }

    pub fn read_i32(&self, address: u32) -> Result<i32, MemoryError> {
        self.read(address, ValueType::I32).map(Scalar::as_i32)
    }

    pub fn read_f64(&self, address: u32) -> Result<f64, MemoryError> {
        self.read(address, ValueType::Double).map(Scalar::as_f64)
    }

    pub fn write_i32(&mut self, address: u32, value: i32) -> Result<(), MemoryError> {
        self.write(address, ValueType::I32, value)
    }

    pub fn write_f64(&mut self, address: u32, value: f64) -> Result<(), MemoryError> {
        self.write(address, ValueType::Double, value)
    }

    /// Copies `bytes` into the region starting at `address`.
    ///
    /// The whole destination range is checked before anything is written.
    /// The caller is expected to have reserved the space with
    /// [`MemoryRegion::stack_alloc`].
    pub fn write_array(&mut self, bytes: &[u8], address: u32) -> Result<(), MemoryError> {
        let width = u32::try_from(bytes.len())
            .map_err(|_| MemoryError::OutOfBounds { address, width: u32::MAX, size: self.size() })?;
        let span = self.span(address, width)?;
        self.bytes[span].copy_from_slice(bytes);
        log::trace!("wrote {} byte(s) at {}", bytes.len(), address);
        Ok(())
    }

    /// Borrows `len` raw bytes starting at `address`.
    pub fn read_bytes(&self, address: u32, len: u32) -> Result<&[u8], MemoryError> {
        let span = self.span(address, len)?;
        Ok(&self.bytes[span])
    }

    /// Reads a zero-terminated byte string.
    ///
    /// Bytes are taken as signed, so `0x00..=0x7f` map to ASCII and
    /// `0x80..=0xff` map to `U+FF80..=U+FFFF`.
    pub fn read_c_string(&self, address: u32) -> Result<String, MemoryError> {
        let tail = self.tail(address);
        match tail.iter().position(|&b| b == 0) {
            Some(len) => Ok(tail[..len].iter().map(|&b| signed_byte_char(b)).collect()),
            None => Err(MemoryError::OutOfBounds {
                address,
                width: tail.len() as u32 + 1,
                size: self.size(),
            }),
        }
    }

    /// Like [`MemoryRegion::read_c_string`], but never fails: decoding stops
    /// at the terminator or at the end of the region, whichever comes first.
    pub fn read_c_string_lossy(&self, address: u32) -> String {
        self.tail(address)
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| signed_byte_char(b))
            .collect()
    }

    fn tail(&self, address: u32) -> &[u8] {
        self.bytes.get(address as usize..).unwrap_or(&[])
    }

    /// Growing the region is not supported: its size is part of the contract
    /// with the native library. Always fails with [`MemoryError::FatalMisuse`].
    pub fn grow(&mut self, pages: u32) -> Result<u32, MemoryError> {
        log::error!("refusing to grow linear memory by {} page(s)", pages);
        Err(MemoryError::FatalMisuse("enlargeMemory"))
    }

    /// The `getTotalMemory` hook. Native code has no business asking; use
    /// [`MemoryRegion::size`] from the host side.
    pub fn total_memory_hook(&self) -> Result<u32, MemoryError> {
        log::error!("native code queried the total memory size");
        Err(MemoryError::FatalMisuse("getTotalMemory"))
    }
}

fn signed_byte_char(byte: u8) -> char {
    char::from_u32(u32::from(byte as i8 as u16)).unwrap_or(char::REPLACEMENT_CHARACTER)
}
