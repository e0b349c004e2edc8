use o3sim_core::config::Config;
use o3sim_core::soc::TestMemory;
use o3sim_core::Core;

/// Memory base used by every test program.
pub const RAM_BASE: u64 = 0x1000;
/// Memory size; covers the program, the trap vector and scratch data.
pub const RAM_SIZE: usize = 0x2000;
/// Trap vector used by the test configuration.
pub const TRAP_VECTOR: u64 = 0x1800;

pub struct TestContext {
    pub core: Core,
    pub mem: TestMemory,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new(Self::config())
    }
}

impl TestContext {
    /// Low-memory configuration: program at [`RAM_BASE`], trap vector at
    /// [`TRAP_VECTOR`], small cache so flushes stay cheap.
    pub fn config() -> Config {
        let mut config = Config::default();
        config.core.start_pc = RAM_BASE;
        config.core.mtvec = TRAP_VECTOR;
        config.icache.sets = 8;
        config
    }

    pub fn new(config: Config) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let core = Core::new(&config).unwrap();
        let mem = TestMemory::new(RAM_BASE, RAM_SIZE);
        Self { core, mem }
    }

    /// Loads 32-bit encodings at `addr`.
    pub fn load_program(mut self, addr: u64, instructions: &[u32]) -> Self {
        self.mem.load_words(addr, instructions);
        self
    }

    /// Loads 16-bit parcels at `addr`; used for compressed code layouts.
    pub fn load_parcels(mut self, addr: u64, parcels: &[u16]) -> Self {
        self.mem.load_parcels(addr, parcels);
        self
    }

    /// Architectural value of `x{index}`.
    pub fn reg(&self, index: u8) -> u64 {
        self.core.reg(index)
    }

    /// Reads one CSR, panicking on unimplemented addresses.
    pub fn csr(&self, addr: u16) -> u64 {
        self.core.csr().read(addr).unwrap()
    }

    /// Runs for a fixed number of cycles.
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.core.tick(&mut self.mem);
        }
    }

    /// Runs until at least `count` instructions have committed, bounded
    /// by `max_cycles`.
    ///
    /// # Panics
    ///
    /// Panics when the bound is hit first; a stuck pipeline is a bug.
    pub fn run_until_retired(&mut self, count: u64, max_cycles: u64) {
        for _ in 0..max_cycles {
            if self.core.stats.retired >= count {
                return;
            }
            self.core.tick(&mut self.mem);
        }
        panic!(
            "retired only {} of {count} instructions in {max_cycles} cycles",
            self.core.stats.retired
        );
    }

    /// Runs until `pred` holds, bounded by `max_cycles`.
    ///
    /// # Panics
    ///
    /// Panics when the bound is hit first.
    pub fn run_until(&mut self, max_cycles: u64, pred: impl Fn(&Core) -> bool) {
        for _ in 0..max_cycles {
            if pred(&self.core) {
                return;
            }
            self.core.tick(&mut self.mem);
        }
        panic!("condition not reached in {max_cycles} cycles");
    }
}
