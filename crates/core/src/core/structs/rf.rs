//! Physical register file.
//!
//! Each entry carries a valid bit that tracks whether the producing
//! instruction has announced its result. Because announcement runs before
//! issue within a cycle, a write is visible to reads in the same cycle,
//! which models the bypass from the result bus into operand read.

use crate::common::PhysReg;

/// One physical register.
#[derive(Debug, Clone, Copy, Default)]
struct RfEntry {
    value: u64,
    valid: bool,
}

/// The physical register file.
///
/// Entry 0 permanently reads as `(0, valid)`; it is never written or freed.
#[derive(Debug)]
pub struct RegFile {
    entries: Vec<RfEntry>,
}

impl RegFile {
    /// Creates a file with `total` registers, all invalid except entry 0.
    #[must_use]
    pub fn new(total: usize) -> Self {
        let mut entries = vec![RfEntry::default(); total];
        entries[0].valid = true;
        Self { entries }
    }

    /// Reads a register: `(value, valid)`.
    #[must_use]
    pub fn read(&self, rp: PhysReg) -> (u64, bool) {
        let e = self.entries[rp.0 as usize];
        (e.value, e.valid)
    }

    /// Writes a produced result and sets the valid bit.
    ///
    /// # Panics
    ///
    /// Panics when the target is register 0 or is already valid; a double
    /// write means two producers were given the same physical register.
    pub fn write(&mut self, rp: PhysReg, value: u64) {
        assert!(!rp.is_zero(), "physical register 0 is read-only");
        let e = &mut self.entries[rp.0 as usize];
        assert!(!e.valid, "double write to physical register {}", rp.0);
        e.value = value;
        e.valid = true;
    }

    /// Invalidates a register as it returns to the free pool.
    ///
    /// The register may still be invalid: a hard flush recycles
    /// destinations of instructions that never executed.
    pub fn free(&mut self, rp: PhysReg) {
        assert!(!rp.is_zero(), "physical register 0 is never freed");
        let e = &mut self.entries[rp.0 as usize];
        e.value = 0;
        e.valid = false;
    }
}
