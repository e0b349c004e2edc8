//! Simulation statistics collection and reporting.
//!
//! Counters are plain fields bumped inline by the components that own the
//! corresponding events; nothing here is sampled or derived until a report
//! is requested.

/// Aggregated statistics for one simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    /// Total cycles simulated.
    pub cycles: u64,
    /// Instructions retired and architecturally committed.
    pub retired: u64,
    /// Instructions retired inactive (wrong speculation path).
    pub retired_inactive: u64,
    /// Speculation rollbacks performed.
    pub rollbacks: u64,
    /// Synchronous traps taken at retirement.
    pub traps: u64,
    /// Asynchronous interrupts injected.
    pub interrupts: u64,
    /// Speculation tags allocated.
    pub tags_allocated: u64,
    /// Checkpoints created.
    pub checkpoints_created: u64,
    /// Instruction cache hits.
    pub icache_hits: u64,
    /// Instruction cache misses.
    pub icache_misses: u64,
    /// Instruction cache refills that ended with a bus error.
    pub icache_refill_errors: u64,
}

impl SimStats {
    /// Creates a zeroed statistics block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retired instructions per cycle, counting committed instructions only.
    #[must_use]
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.retired as f64 / self.cycles as f64
    }

    /// Instruction cache hit rate over all lookups.
    #[must_use]
    pub fn icache_hit_rate(&self) -> f64 {
        let total = self.icache_hits + self.icache_misses;
        if total == 0 {
            return 0.0;
        }
        self.icache_hits as f64 / total as f64
    }

    /// Prints a human-readable report to stdout.
    pub fn print_report(&self) {
        println!("=== simulation statistics ===");
        println!("cycles:               {}", self.cycles);
        println!("retired:              {}", self.retired);
        println!("retired (inactive):   {}", self.retired_inactive);
        println!("ipc:                  {:.3}", self.ipc());
        println!("rollbacks:            {}", self.rollbacks);
        println!("traps:                {}", self.traps);
        println!("interrupts:           {}", self.interrupts);
        println!("tags allocated:       {}", self.tags_allocated);
        println!("checkpoints created:  {}", self.checkpoints_created);
        println!(
            "icache:               {} hits / {} misses ({:.1}% hit rate), {} refill errors",
            self.icache_hits,
            self.icache_misses,
            self.icache_hit_rate() * 100.0,
            self.icache_refill_errors
        );
    }
}
