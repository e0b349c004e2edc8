//! Cycle-level out-of-order RISC-V core model.
//!
//! This crate models a speculative out-of-order RV32/RV64 IMC machine
//! with the following:
//! 1. **Frontend:** Block fetch through a non-blocking instruction cache,
//!    RVC expansion, predecode with static prediction, and stall control.
//! 2. **Rename:** Checkpointed register alias table with a speculation
//!    tag ring; conditional branches checkpoint, mispredictions restore.
//! 3. **Backend:** Four-stage scheduler, reservation stations, functional
//!    units, a result announcement bus, and in-order retirement.
//! 4. **Traps:** Precise exceptions through an oldest-wins exception
//!    register, and interrupt entry that drains the window first.
//! 5. **SoC:** A word-granular bus with a flat test memory behind it.

/// Instruction cache and line refiller.
pub mod cache;
/// Common types (identifiers, trap causes, bus errors).
pub mod common;
/// Hierarchical configuration with JSON deserialization.
pub mod config;
/// The core pipeline (frontend, scheduler, backend, renaming state).
pub mod core;
/// Functional units and the issue/result interfaces.
pub mod fu;
/// Instruction set support (decode, RVC, op classification, CSRs).
pub mod isa;
/// Bus trait and test memory.
pub mod soc;
/// Simulation statistics counters.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The modeled hart; construct with `Core::new` and drive with `tick`.
pub use crate::core::Core;
/// Memory channel the core fetches and loads/stores through.
pub use crate::soc::CoreBus;
