//! Operation classification.
//!
//! Every decoded instruction is mapped to one [`OpType`]. Reservation
//! stations advertise a set of op types; the scheduler routes each
//! instruction to the first station whose set contains its type.

/// Operation classes, grouped by the functional unit that executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum OpType {
    /// Undecodable placeholder; never issued.
    #[default]
    Unknown,
    /// Integer add/subtract (including LUI as `x0 + imm`).
    Arithmetic,
    /// Set-less-than comparisons.
    Compare,
    /// Bitwise logic.
    Logic,
    /// Shifts.
    Shift,
    /// Add upper immediate to PC.
    Auipc,
    /// Direct jump and link.
    Jal,
    /// Indirect jump and link.
    Jalr,
    /// Conditional branch.
    Branch,
    /// Memory load.
    Load,
    /// Memory store.
    Store,
    /// Memory ordering fence.
    Fence,
    /// Instruction-fetch fence.
    FenceI,
    /// Environment call.
    Ecall,
    /// Breakpoint.
    Ebreak,
    /// Machine-mode trap return.
    Mret,
    /// Wait for interrupt.
    Wfi,
    /// CSR access with a register operand.
    CsrReg,
    /// CSR access with an immediate operand.
    CsrImm,
    /// Integer multiply.
    Mul,
    /// Integer divide/remainder.
    DivRem,
    /// Carrier for a frontend- or decode-detected exception.
    Exception,
}

impl OpType {
    /// Bit for building op type sets.
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// True when the op belongs to the given set.
    #[must_use]
    pub const fn is_in(self, set: u32) -> bool {
        set & self.bit() != 0
    }
}

/// Op type set accepted by the ALU station.
pub const ALU_OPS: u32 = OpType::Arithmetic.bit() | OpType::Compare.bit() | OpType::Logic.bit() | OpType::Shift.bit() | OpType::Auipc.bit();

/// Op type set accepted by the jump/branch station.
pub const JB_OPS: u32 = OpType::Jal.bit() | OpType::Jalr.bit() | OpType::Branch.bit();

/// Op type set accepted by the multiply/divide station.
pub const MULDIV_OPS: u32 = OpType::Mul.bit() | OpType::DivRem.bit();

/// Op type set accepted by the load/store station.
pub const LSU_OPS: u32 = OpType::Load.bit() | OpType::Store.bit() | OpType::Fence.bit();

/// Op type set accepted by the system station.
pub const SYSTEM_OPS: u32 = OpType::FenceI.bit()
    | OpType::Ecall.bit()
    | OpType::Ebreak.bit()
    | OpType::Mret.bit()
    | OpType::Wfi.bit()
    | OpType::CsrReg.bit()
    | OpType::CsrImm.bit()
    | OpType::Exception.bit();
