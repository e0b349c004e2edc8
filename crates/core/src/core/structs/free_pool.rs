//! Free physical register pool.
//!
//! Holds the ids of currently unallocated physical registers. Register 0
//! is permanently mapped to the architectural zero register and never
//! enters the pool.

use std::collections::VecDeque;

use crate::common::PhysReg;

/// FIFO pool of free physical register ids.
#[derive(Debug)]
pub struct FreeRegPool {
    free: VecDeque<PhysReg>,
    /// Occupancy bitmap for double-free detection, indexed by register id.
    in_pool: Vec<bool>,
}

impl FreeRegPool {
    /// Creates a pool holding registers `1..total`.
    #[must_use]
    pub fn new(total: usize) -> Self {
        let free: VecDeque<PhysReg> = (1..total).map(|i| PhysReg(i as u8)).collect();
        let mut in_pool = vec![true; total];
        in_pool[0] = false;
        Self { free, in_pool }
    }

    /// Takes one register from the pool; `None` when empty (allocation
    /// stalls upstream).
    pub fn alloc(&mut self) -> Option<PhysReg> {
        let rp = self.free.pop_front()?;
        self.in_pool[rp.0 as usize] = false;
        Some(rp)
    }

    /// Returns a register to the pool.
    ///
    /// # Panics
    ///
    /// Panics when freeing register 0 or a register that is already free;
    /// both indicate a bookkeeping bug upstream.
    pub fn free(&mut self, rp: PhysReg) {
        assert!(!rp.is_zero(), "physical register 0 is never pooled");
        assert!(!self.in_pool[rp.0 as usize], "double free of physical register {}", rp.0);
        self.in_pool[rp.0 as usize] = true;
        self.free.push_back(rp);
    }

    /// Number of registers currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }
}
