//! Instruction cache and its line refiller.

pub mod icache;
pub mod refiller;

pub use icache::{CacheResponse, ICache};
pub use refiller::{RefillBeat, Refiller};
