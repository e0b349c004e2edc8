//! Common types shared across the core model.

/// Architectural trap causes and bus-level errors.
pub mod trap;
/// Identifier newtypes and bit-vector helpers.
pub mod types;

pub use trap::{BusError, ExceptionCause, InterruptCause};
pub use types::{PhysReg, RegId, RobId, SpecTag, cyclic_mask};
