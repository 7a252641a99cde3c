use crate::error::MemoryError;
use crate::region::MemoryRegion;

// The stack is a bump allocator over [stack_base, stack_max]. Frames are not
// tracked: callers save the watermark before allocating and restore it once
// the native call's results have been read. Nothing is cleaned up on failure.
impl MemoryRegion {
    /// First address of the stack segment.
    pub fn stack_base(&self) -> u32 {
        self.layout.stack_base
    }

    /// Upper bound of the stack segment; the watermark never exceeds it.
    pub fn stack_max(&self) -> u32 {
        self.stack_max
    }

    /// Current stack top.
    pub fn stack_save(&self) -> u32 {
        self.stack_top
    }

    /// Resets the stack top to a previously saved watermark.
    pub fn stack_restore(&mut self, watermark: u32) -> Result<(), MemoryError> {
        if watermark < self.layout.stack_base || watermark > self.stack_max {
            return Err(MemoryError::InvalidWatermark {
                watermark,
                base: self.layout.stack_base,
                max: self.stack_max,
            });
        }
        log::trace!("stack restore {} -> {}", self.stack_top, watermark);
        self.stack_top = watermark;
        Ok(())
    }

    /// Reserves `size` bytes on the stack and returns their address (the
    /// previous top). The top advances by `size` rounded up to the stack
    /// alignment. On overflow the watermark is left unchanged.
    pub fn stack_alloc(&mut self, size: u32) -> Result<u32, MemoryError> {
        let overflow = MemoryError::StackOverflow {
            requested: size,
            top: self.stack_top,
            max: self.stack_max,
        };
        let mask = self.layout.stack_align - 1;
        let new_top = self
            .stack_top
            .checked_add(size)
            .and_then(|top| top.checked_add(mask))
            .map(|top| top & !mask)
            .ok_or_else(|| overflow.clone())?;
        if new_top > self.stack_max {
            return Err(overflow);
        }

        let address = self.stack_top;
        self.stack_top = new_top;
        log::trace!("stack alloc {} byte(s) at {}, top now {}", size, address, new_top);
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::MemoryLayout;

    fn region() -> MemoryRegion {
        MemoryRegion::allocate(MemoryLayout {
            total_memory: 8192,
            total_stack: 256,
            page_size: 4096,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_alloc_returns_previous_top() {
        let mut region = region();
        assert_eq!(region.stack_save(), 16);
        assert_eq!(region.stack_alloc(8).unwrap(), 16);
        assert_eq!(region.stack_save(), 32);
        assert_eq!(region.stack_alloc(17).unwrap(), 32);
        assert_eq!(region.stack_save(), 64);
    }

    #[test]
    fn test_zero_sized_alloc_does_not_move_top() {
        let mut region = region();
        assert_eq!(region.stack_alloc(0).unwrap(), 16);
        assert_eq!(region.stack_save(), 16);
    }

    #[test]
    fn test_restore_reuses_space() {
        let mut region = region();
        let saved = region.stack_save();
        let first = region.stack_alloc(40).unwrap();
        region.stack_restore(saved).unwrap();
        assert_eq!(region.stack_save(), saved);
        let second = region.stack_alloc(40).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_frames() {
        let mut region = region();
        let outer = region.stack_save();
        region.stack_alloc(16).unwrap();
        let inner = region.stack_save();
        region.stack_alloc(32).unwrap();
        region.stack_restore(inner).unwrap();
        assert_eq!(region.stack_save(), inner);
        region.stack_restore(outer).unwrap();
        assert_eq!(region.stack_save(), outer);
    }

    #[test]
    fn test_overflow_leaves_watermark_unchanged() {
        let mut region = region();
        region.stack_alloc(200).unwrap();
        let before = region.stack_save();
        let err = region.stack_alloc(100).unwrap_err();
        assert_eq!(err, MemoryError::StackOverflow { requested: 100, top: before, max: 16 + 256 });
        assert_eq!(region.stack_save(), before);

        assert!(region.stack_alloc(u32::MAX).is_err());
        assert_eq!(region.stack_save(), before);
    }

    #[test]
    fn test_alloc_up_to_exact_limit() {
        let mut region = region();
        assert_eq!(region.stack_alloc(256).unwrap(), 16);
        assert_eq!(region.stack_save(), region.stack_max());
        assert!(region.stack_alloc(1).is_err());
    }

    #[test]
    fn test_restore_outside_stack_fails() {
        let mut region = region();
        assert!(matches!(region.stack_restore(0), Err(MemoryError::InvalidWatermark { .. })));
        assert!(region.stack_restore(region.stack_max() + 16).is_err());
        assert_eq!(region.stack_save(), 16);
    }
}
