//! Retirement register alias table.
//!
//! Maps each logical register to the physical register holding its last
//! committed value. Updated only at retirement, so it always describes a
//! precise architectural state and is the restore source for hard flushes.

use crate::common::{PhysReg, RegId};

/// The retirement-side alias table.
#[derive(Debug)]
pub struct Rrat {
    map: Vec<PhysReg>,
}

impl Rrat {
    /// Creates the table for `reg_cnt` logical registers, each mapped to
    /// physical register 0.
    #[must_use]
    pub fn new(reg_cnt: usize) -> Self {
        Self { map: vec![PhysReg::ZERO; reg_cnt] }
    }

    /// Commits a new mapping, returning the replaced physical register so
    /// the caller can recycle it.
    pub fn commit(&mut self, rl: RegId, rp: PhysReg) -> PhysReg {
        debug_assert!(rl.0 != 0, "x0 is never remapped");
        std::mem::replace(&mut self.map[rl.0 as usize], rp)
    }

    /// Current mapping of one logical register.
    #[must_use]
    pub fn get(&self, rl: RegId) -> PhysReg {
        self.map[rl.0 as usize]
    }

    /// The whole table, for restoring the speculative alias table after a
    /// hard flush.
    #[must_use]
    pub fn snapshot(&self) -> &[PhysReg] {
        &self.map
    }
}
