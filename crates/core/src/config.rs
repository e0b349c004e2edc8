//! Configuration system for the out-of-order core model.
//!
//! This module defines all configuration structures used to parameterize
//! the core. It provides:
//! 1. **Defaults:** Baseline geometry constants (register file, speculation
//!    tags, reorder buffer, caches).
//! 2. **Structures:** Hierarchical config for core geometry, frontend,
//!    instruction cache, and functional units.
//! 3. **Validation:** Structural constraints (power-of-two rings, tag and
//!    checkpoint bounds) checked once at construction.
//!
//! Configuration is supplied as JSON or via `Config::default()`.

use serde::Deserialize;
use thiserror::Error;

/// Default configuration constants for the core model.
///
/// These values define the baseline geometry when not explicitly
/// overridden in a JSON configuration.
mod defaults {
    /// Architectural register count (32; 16 selects the embedded
    /// register file of the E variants).
    pub const ISA_REG_CNT: usize = 32;

    /// Number of bits in a physical register id (64 physical registers).
    ///
    /// Must leave room for renaming: the architectural registers plus the
    /// maximum number of in-flight destinations.
    pub const PHYS_REGS_BITS: u32 = 6;

    /// Number of bits in a reorder buffer index (64 in-flight instructions).
    pub const ROB_ENTRIES_BITS: u32 = 6;

    /// Number of bits in a speculation tag (8 tags in the ring).
    pub const TAG_BITS: u32 = 3;

    /// Number of physical checkpoint storage slots.
    ///
    /// Must be greater than 2 and no larger than the tag ring.
    pub const CHECKPOINT_COUNT: usize = 6;

    /// Reservation station entry count, per station.
    pub const RS_ENTRIES: usize = 4;

    /// Number of reorder buffer entries retirement may drain per cycle.
    pub const RETIREMENT_WIDTH: usize = 2;

    /// Reset program counter (2 GiB, matching the usual RAM base).
    pub const START_PC: u64 = 0x8000_0000;

    /// Machine trap vector reset value.
    pub const MTVEC: u64 = 0x8000_1000;

    /// Fetch block size in bytes (one block is fetched per cycle).
    pub const FETCH_BLOCK_BYTES: usize = 8;

    /// Instruction cache associativity.
    pub const ICACHE_WAYS: usize = 2;

    /// Instruction cache set count.
    pub const ICACHE_SETS: usize = 64;

    /// Instruction cache line size in bytes.
    pub const ICACHE_LINE_BYTES: usize = 32;

    /// Multiplier latency in cycles.
    pub const MUL_LATENCY: u64 = 3;

    /// Divider latency in cycles.
    pub const DIV_LATENCY: u64 = 16;
}

/// Errors raised by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A geometry parameter must be a power of two.
    #[error("{name} must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: usize,
    },
    /// A geometry parameter is outside its supported range.
    #[error("{name} out of range: {reason}")]
    OutOfRange {
        /// Parameter name.
        name: &'static str,
        /// Human-readable constraint description.
        reason: &'static str,
    },
}

/// Register width of the modeled hart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Xlen {
    /// 32-bit registers.
    Rv32,
    /// 64-bit registers.
    #[default]
    Rv64,
}

impl Xlen {
    /// Register width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Rv32 => 32,
            Self::Rv64 => 64,
        }
    }

    /// Mask selecting the architecturally visible bits of a register.
    #[must_use]
    pub const fn mask(self) -> u64 {
        match self {
            Self::Rv32 => 0xFFFF_FFFF,
            Self::Rv64 => u64::MAX,
        }
    }
}

/// Enabled ISA extensions beyond RV32/64I.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExtensionsConfig {
    /// Integer multiply/divide (M).
    #[serde(default = "ExtensionsConfig::default_on")]
    pub m: bool,
    /// Compressed instructions (C).
    #[serde(default = "ExtensionsConfig::default_on")]
    pub c: bool,
    /// CSR instructions (Zicsr).
    #[serde(default = "ExtensionsConfig::default_on")]
    pub zicsr: bool,
    /// Instruction-fetch fence (Zifencei).
    #[serde(default = "ExtensionsConfig::default_on")]
    pub zifencei: bool,
}

impl ExtensionsConfig {
    const fn default_on() -> bool {
        true
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self { m: true, c: true, zicsr: true, zifencei: true }
    }
}

/// Root configuration structure for the core model.
///
/// # Examples
///
/// ```
/// use o3sim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.core.tag_bits, 3);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Core geometry (renaming, reorder buffer, speculation tags).
    #[serde(default)]
    pub core: CoreConfig,
    /// Frontend and fetch parameters.
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// Instruction cache geometry.
    #[serde(default)]
    pub icache: IcacheConfig,
    /// Functional unit latencies.
    #[serde(default)]
    pub fu: FuConfig,
}

impl Config {
    /// Parses a configuration from a JSON document. Missing fields take
    /// their defaults; the result is not yet validated.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks structural constraints on the configured geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core.tag_bits > 6 {
            return Err(ConfigError::OutOfRange { name: "tag_bits", reason: "at most 6 (tag bitmaps are 64 bits wide)" });
        }
        if !matches!(self.core.isa_reg_cnt, 16 | 32) {
            return Err(ConfigError::OutOfRange { name: "isa_reg_cnt", reason: "must be 16 or 32" });
        }
        if self.core.phys_regs_bits > 8 || self.core.phys_regs_bits < 6 {
            return Err(ConfigError::OutOfRange {
                name: "phys_regs_bits",
                reason: "must be 6..=8 (need the architectural mappings plus rename headroom)",
            });
        }
        if self.core.rob_entries_bits > 10 {
            return Err(ConfigError::OutOfRange { name: "rob_entries_bits", reason: "at most 10" });
        }
        if self.core.checkpoint_count <= 2 {
            return Err(ConfigError::OutOfRange { name: "checkpoint_count", reason: "must be greater than 2" });
        }
        if self.core.checkpoint_count > (1 << self.core.tag_bits) {
            return Err(ConfigError::OutOfRange {
                name: "checkpoint_count",
                reason: "cannot exceed the number of speculation tags",
            });
        }
        if !matches!(self.frontend.fetch_block_bytes, 4 | 8) {
            return Err(ConfigError::OutOfRange { name: "fetch_block_bytes", reason: "must be 4 or 8" });
        }
        if !self.icache.sets.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo { name: "icache.sets", value: self.icache.sets });
        }
        if !self.icache.line_bytes.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo { name: "icache.line_bytes", value: self.icache.line_bytes });
        }
        if self.icache.line_bytes < self.frontend.fetch_block_bytes {
            return Err(ConfigError::OutOfRange {
                name: "icache.line_bytes",
                reason: "must be at least one fetch block",
            });
        }
        if self.icache.ways == 0 {
            return Err(ConfigError::OutOfRange { name: "icache.ways", reason: "must be nonzero" });
        }
        if self.core.rs_entries == 0 {
            return Err(ConfigError::OutOfRange { name: "rs_entries", reason: "must be nonzero" });
        }
        if self.core.retirement_width == 0 {
            return Err(ConfigError::OutOfRange { name: "retirement_width", reason: "must be nonzero" });
        }
        Ok(())
    }
}

/// Core geometry: renaming structures, reorder buffer, speculation tags.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Register width.
    #[serde(default)]
    pub xlen: Xlen,

    /// Enabled ISA extensions.
    #[serde(default)]
    pub extensions: ExtensionsConfig,

    /// Architectural register count; 16 or 32. With 16 the decoder treats
    /// any register number of 16 or above as an illegal encoding.
    #[serde(default = "CoreConfig::default_isa_reg_cnt")]
    pub isa_reg_cnt: usize,

    /// Bits in a physical register id.
    #[serde(default = "CoreConfig::default_phys_regs_bits")]
    pub phys_regs_bits: u32,

    /// Bits in a reorder buffer index.
    #[serde(default = "CoreConfig::default_rob_entries_bits")]
    pub rob_entries_bits: u32,

    /// Bits in a speculation tag.
    #[serde(default = "CoreConfig::default_tag_bits")]
    pub tag_bits: u32,

    /// Physical checkpoint storage slots.
    #[serde(default = "CoreConfig::default_checkpoint_count")]
    pub checkpoint_count: usize,

    /// Entries per reservation station.
    #[serde(default = "CoreConfig::default_rs_entries")]
    pub rs_entries: usize,

    /// Reorder buffer entries retirement may drain per cycle.
    #[serde(default = "CoreConfig::default_retirement_width")]
    pub retirement_width: usize,

    /// Reset program counter.
    #[serde(default = "CoreConfig::default_start_pc")]
    pub start_pc: u64,

    /// Machine trap vector reset value.
    #[serde(default = "CoreConfig::default_mtvec")]
    pub mtvec: u64,
}

impl CoreConfig {
    /// Number of physical registers.
    #[must_use]
    pub const fn phys_regs(&self) -> usize {
        1 << self.phys_regs_bits
    }

    /// Number of reorder buffer entries.
    #[must_use]
    pub const fn rob_entries(&self) -> usize {
        1 << self.rob_entries_bits
    }

    /// Number of speculation tags in the ring.
    #[must_use]
    pub const fn tag_count(&self) -> usize {
        1 << self.tag_bits
    }

    fn default_isa_reg_cnt() -> usize {
        defaults::ISA_REG_CNT
    }

    fn default_phys_regs_bits() -> u32 {
        defaults::PHYS_REGS_BITS
    }

    fn default_rob_entries_bits() -> u32 {
        defaults::ROB_ENTRIES_BITS
    }

    fn default_tag_bits() -> u32 {
        defaults::TAG_BITS
    }

    fn default_checkpoint_count() -> usize {
        defaults::CHECKPOINT_COUNT
    }

    fn default_rs_entries() -> usize {
        defaults::RS_ENTRIES
    }

    fn default_retirement_width() -> usize {
        defaults::RETIREMENT_WIDTH
    }

    fn default_start_pc() -> u64 {
        defaults::START_PC
    }

    fn default_mtvec() -> u64 {
        defaults::MTVEC
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            xlen: Xlen::default(),
            extensions: ExtensionsConfig::default(),
            isa_reg_cnt: defaults::ISA_REG_CNT,
            phys_regs_bits: defaults::PHYS_REGS_BITS,
            rob_entries_bits: defaults::ROB_ENTRIES_BITS,
            tag_bits: defaults::TAG_BITS,
            checkpoint_count: defaults::CHECKPOINT_COUNT,
            rs_entries: defaults::RS_ENTRIES,
            retirement_width: defaults::RETIREMENT_WIDTH,
            start_pc: defaults::START_PC,
            mtvec: defaults::MTVEC,
        }
    }
}

/// Frontend and fetch parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// Fetch block size in bytes; one block is requested per cycle.
    #[serde(default = "FrontendConfig::default_fetch_block_bytes")]
    pub fetch_block_bytes: usize,
}

impl FrontendConfig {
    /// Number of 16-bit parcels in a fetch block.
    #[must_use]
    pub const fn parcels(&self) -> usize {
        self.fetch_block_bytes / 2
    }

    fn default_fetch_block_bytes() -> usize {
        defaults::FETCH_BLOCK_BYTES
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self { fetch_block_bytes: defaults::FETCH_BLOCK_BYTES }
    }
}

/// Instruction cache geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct IcacheConfig {
    /// Associativity (number of ways).
    #[serde(default = "IcacheConfig::default_ways")]
    pub ways: usize,

    /// Number of sets.
    #[serde(default = "IcacheConfig::default_sets")]
    pub sets: usize,

    /// Line size in bytes.
    #[serde(default = "IcacheConfig::default_line_bytes")]
    pub line_bytes: usize,
}

impl IcacheConfig {
    /// log2 of the line size.
    #[must_use]
    pub const fn offset_bits(&self) -> u32 {
        self.line_bytes.trailing_zeros()
    }

    /// log2 of the set count.
    #[must_use]
    pub const fn index_bits(&self) -> u32 {
        self.sets.trailing_zeros()
    }

    fn default_ways() -> usize {
        defaults::ICACHE_WAYS
    }

    fn default_sets() -> usize {
        defaults::ICACHE_SETS
    }

    fn default_line_bytes() -> usize {
        defaults::ICACHE_LINE_BYTES
    }
}

impl Default for IcacheConfig {
    fn default() -> Self {
        Self { ways: defaults::ICACHE_WAYS, sets: defaults::ICACHE_SETS, line_bytes: defaults::ICACHE_LINE_BYTES }
    }
}

/// Functional unit latencies.
#[derive(Debug, Clone, Deserialize)]
pub struct FuConfig {
    /// Multiplier latency in cycles.
    #[serde(default = "FuConfig::default_mul_latency")]
    pub mul_latency: u64,

    /// Divider latency in cycles.
    #[serde(default = "FuConfig::default_div_latency")]
    pub div_latency: u64,
}

impl FuConfig {
    fn default_mul_latency() -> u64 {
        defaults::MUL_LATENCY
    }

    fn default_div_latency() -> u64 {
        defaults::DIV_LATENCY
    }
}

impl Default for FuConfig {
    fn default() -> Self {
        Self { mul_latency: defaults::MUL_LATENCY, div_latency: defaults::DIV_LATENCY }
    }
}
