//! Backing storage of the out-of-order machine: alias tables, the free
//! register pool, the register file, the reorder buffer and the
//! reservation stations.

pub mod crat;
pub mod free_pool;
pub mod rat;
pub mod rf;
pub mod rob;
pub mod rs;

pub use crat::{CheckpointRat, TagOut};
pub use free_pool::FreeRegPool;
pub use rat::Rrat;
pub use rf::RegFile;
pub use rob::{Rob, RobData, RobEntry};
pub use rs::{ReservationStation, RsEntry};
