use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Size of one page of linear memory.
pub const PAGE_SIZE: u32 = 64 * 1024;

pub const DEFAULT_TOTAL_STACK: u32 = 1024 * 1024;
pub const DEFAULT_TOTAL_MEMORY: u32 = 2 * 1024 * 1024;
pub const DEFAULT_STACK_BASE: u32 = 16;
pub const DEFAULT_STACK_ALIGN: u32 = 16;

/// Partitioning of the linear memory region.
///
/// ```text
/// 0                  stack_base              stack_max               size
/// | control word ... | stack (grows upward) ->| static / native data |
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLayout {
    /// Requested region size in bytes, rounded up to whole pages.
    pub total_memory: u32,

    /// Bytes reserved for the stack segment.
    pub total_stack: u32,

    /// Allocation granularity.
    pub page_size: u32,

    /// First stack address; everything below is reserved.
    pub stack_base: u32,

    /// Every stack allocation is rounded up to this many bytes.
    pub stack_align: u32,

    /// Address of the control word holding the dynamic top.
    pub dynamic_top_ptr: u32,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            total_memory: DEFAULT_TOTAL_MEMORY,
            total_stack: DEFAULT_TOTAL_STACK,
            page_size: PAGE_SIZE,
            stack_base: DEFAULT_STACK_BASE,
            stack_align: DEFAULT_STACK_ALIGN,
            dynamic_top_ptr: 0,
        }
    }
}

impl MemoryLayout {
    /// First address past the stack segment.
    pub fn stack_max(&self) -> Result<u32, MemoryError> {
        self.stack_base
            .checked_add(self.total_stack)
            .ok_or_else(|| MemoryError::InvalidLayout("stack segment overflows the address space".to_string()))
    }

    /// Region size after rounding up to the page granularity.
    pub fn region_size(&self) -> Result<u32, MemoryError> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(MemoryError::InvalidLayout(format!(
                "page size {} is not a power of two",
                self.page_size
            )));
        }
        let pages = (self.total_memory as u64).div_ceil(self.page_size as u64);
        u32::try_from(pages * self.page_size as u64)
            .map_err(|_| MemoryError::InvalidLayout(format!("{} bytes exceed the 32-bit address space", self.total_memory)))
    }

    /// Checks that the segments fit together inside the region.
    pub fn validate(&self) -> Result<(), MemoryError> {
        let size = self.region_size()?;
        let stack_max = self.stack_max()?;

        if self.stack_align == 0 || !self.stack_align.is_power_of_two() {
            return Err(MemoryError::InvalidLayout(format!(
                "stack alignment {} is not a power of two",
                self.stack_align
            )));
        }
        if self.stack_base % self.stack_align != 0 {
            return Err(MemoryError::InvalidLayout(format!(
                "stack base {} is not aligned to {}",
                self.stack_base, self.stack_align
            )));
        }
        if self.dynamic_top_ptr % 4 != 0 || self.dynamic_top_ptr.saturating_add(4) > self.stack_base {
            return Err(MemoryError::InvalidLayout(format!(
                "control word at {} must be 4-byte aligned and below the stack base {}",
                self.dynamic_top_ptr, self.stack_base
            )));
        }
        if stack_max > size {
            return Err(MemoryError::InvalidLayout(format!(
                "stack ends at {} but the region holds only {} bytes",
                stack_max, size
            )));
        }
        Ok(())
    }
}
