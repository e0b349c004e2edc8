//! Functional units.
//!
//! Every unit consumes [`RsEntry`] issues from its reservation station and
//! produces [`FuResult`] completions for the announcement stage. Units
//! that steer the machine (branches, jumps, the system unit) additionally
//! emit [`CtrlEvent`]s, which the core applies at the end of the cycle
//! after filtering out events raised by invalidated instructions.

pub mod alu;
pub mod jumpbranch;
pub mod lsu;
pub mod muldiv;
pub mod system;

use crate::common::{ExceptionCause, PhysReg, RobId, SpecTag};
use crate::core::structs::RsEntry;

pub use alu::Alu;
pub use jumpbranch::JumpBranchUnit;
pub use lsu::LoadStoreUnit;
pub use muldiv::MulDivUnit;
pub use system::SystemUnit;

/// Exception details attached to a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcInfo {
    /// Architectural cause code.
    pub cause: ExceptionCause,
    /// Value for mtval (faulting address or instruction bits).
    pub mtval: u64,
}

/// One completed instruction, heading for the result bus.
#[derive(Debug, Clone, Copy)]
pub struct FuResult {
    /// Reorder buffer slot to mark done.
    pub rob_id: RobId,
    /// Speculation tag the instruction executed under.
    pub tag: SpecTag,
    /// Destination physical register (0 when none).
    pub rp_dst: PhysReg,
    /// Result value, written to the register file when `rp_dst` is not 0.
    pub value: u64,
    /// Instruction address, for exception reporting.
    pub pc: u64,
    /// Set when execution raised an architectural exception.
    pub exception: Option<ExcInfo>,
}

/// Pipeline steering raised by a unit; applied by the core at end of
/// cycle, and dropped when the raising instruction's tag went inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlEvent {
    /// A branch resolved against its prediction: restore the checkpoint
    /// and redirect fetch.
    Rollback {
        /// Tag of the mispredicted branch (the rollback target).
        tag: SpecTag,
        /// Corrected fetch address.
        next_pc: u64,
    },
    /// An unsafe instruction resolved: lift the frontend stall and fetch
    /// from `pc`.
    ResumeUnsafe {
        /// Address to resume fetching from.
        pc: u64,
    },
    /// FENCE.I executed: invalidate the instruction cache.
    FlushICache,
    /// MRET executed: return from the trap handler.
    Iret,
}

/// Retirement's view of the oldest in-flight instruction, handed to
/// units that serialize side effects (stores, CSR accesses) on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precommit {
    /// Reorder buffer slot at the head.
    pub rob_id: RobId,
    /// False when the head instruction's side effects must be suppressed
    /// (invalidated path or trap flush in progress).
    pub side_fx: bool,
}

/// The issue-side surface every functional unit exposes to wakeup-select.
pub trait FuncUnit {
    /// True when the unit can accept an issue this cycle.
    fn can_issue(&self) -> bool;

    /// Starts executing one instruction.
    fn issue(&mut self, entry: RsEntry);

    /// Takes one finished result, if any. The announcement stage drains
    /// at most one result per cycle from the whole collector.
    fn take_result(&mut self) -> Option<FuResult>;

    /// Discards all in-flight work. Used by hard flushes.
    fn clear(&mut self);
}

pub(crate) fn result_of(entry: &RsEntry, value: u64) -> FuResult {
    FuResult {
        rob_id: entry.rob_id,
        tag: entry.tag,
        rp_dst: entry.rp_dst,
        value,
        pc: entry.pc,
        exception: None,
    }
}

pub(crate) fn exception_of(entry: &RsEntry, cause: ExceptionCause, mtval: u64) -> FuResult {
    FuResult {
        rob_id: entry.rob_id,
        tag: entry.tag,
        rp_dst: PhysReg::ZERO,
        value: 0,
        pc: entry.pc,
        exception: Some(ExcInfo { cause, mtval }),
    }
}
