//! Architectural trap causes and bus errors.
//!
//! Synchronous exception causes use the machine-mode `mcause` encoding.
//! They are plain data, not `Error` types: an exception is normal
//! architectural behavior that flows through the reorder buffer and the
//! exception information register before retirement acts on it.

use thiserror::Error;

/// Synchronous exception causes, encoded as in `mcause` (interrupt bit
/// clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExceptionCause {
    /// Instruction fetch from a misaligned address.
    InstrAddrMisaligned = 0,
    /// Instruction fetch faulted on the bus.
    InstrAccessFault = 1,
    /// Undecodable or disabled-extension encoding.
    IllegalInstruction = 2,
    /// EBREAK executed.
    Breakpoint = 3,
    /// Load from a misaligned address.
    LoadAddrMisaligned = 4,
    /// Load faulted on the bus.
    LoadAccessFault = 5,
    /// Store to a misaligned address.
    StoreAddrMisaligned = 6,
    /// Store faulted on the bus.
    StoreAccessFault = 7,
    /// ECALL from machine mode.
    EcallM = 11,
}

impl ExceptionCause {
    /// The `mcause` value for this exception.
    #[must_use]
    pub const fn code(self) -> u64 {
        self as u64
    }
}

/// Asynchronous interrupt causes, encoded as in `mcause` with the interrupt
/// bit implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InterruptCause {
    /// Machine software interrupt.
    MachineSoftware = 3,
    /// Machine timer interrupt.
    MachineTimer = 7,
    /// Machine external interrupt.
    MachineExternal = 11,
}

impl InterruptCause {
    /// The `mcause` value for this interrupt, with the interrupt bit set
    /// for the given register width.
    #[must_use]
    pub const fn mcause(self, xlen: u32) -> u64 {
        (1u64 << (xlen - 1)) | self as u64
    }

    /// Bit position in `mie`/`mip`.
    #[must_use]
    pub const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }
}

/// Errors reported by bus targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// The address maps to no device or to a poisoned region.
    #[error("bus access fault at {addr:#x}")]
    AccessFault {
        /// Faulting byte address.
        addr: u64,
    },
}
