//! Predecode and prediction checking.
//!
//! Predecode looks at just enough of each (already expanded) encoding to
//! classify control flow and spot unsafe instructions. The checker then
//! decides, per instruction, whether fetch continues down the fall
//! through, redirects to a computed target, or stalls.
//!
//! There is no branch predictor in front of this: the static policy is
//! the classic one. Direct jumps and backward conditional branches are
//! taken, forward conditional branches are not, and anything whose
//! successor cannot be computed here (JALR, system instructions) stalls
//! fetch until the executing unit supplies the address.

use crate::isa::decode::{imm_b, imm_j};
use crate::isa::opcodes::{funct3, opcodes};

/// Control-flow class of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfiType {
    /// Straight-line instruction.
    None,
    /// Direct jump.
    Jal,
    /// Indirect jump.
    Jalr,
    /// Conditional branch.
    Branch,
}

/// Predecode summary of one instruction.
#[derive(Debug, Clone, Copy)]
pub struct Predecoded {
    /// Control-flow class.
    pub cfi: CfiType,
    /// Branch or jump displacement from the instruction address.
    pub offset: i64,
    /// Fetch must stall until this instruction executes.
    pub unsafe_instr: bool,
}

/// Classifies one 32-bit encoding.
#[must_use]
pub fn predecode(raw: u32) -> Predecoded {
    let opcode = raw & 0x7F;
    match opcode {
        opcodes::OP_JAL => Predecoded { cfi: CfiType::Jal, offset: imm_j(raw), unsafe_instr: false },
        opcodes::OP_JALR => Predecoded { cfi: CfiType::Jalr, offset: 0, unsafe_instr: true },
        opcodes::OP_BRANCH => {
            Predecoded { cfi: CfiType::Branch, offset: imm_b(raw), unsafe_instr: false }
        }
        opcodes::OP_SYSTEM => Predecoded { cfi: CfiType::None, offset: 0, unsafe_instr: true },
        opcodes::OP_MISC_MEM => Predecoded {
            cfi: CfiType::None,
            offset: 0,
            unsafe_instr: (raw >> 12) & 0x7 == funct3::FENCE_I,
        },
        _ => Predecoded { cfi: CfiType::None, offset: 0, unsafe_instr: false },
    }
}

/// What fetch does after one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAction {
    /// Fall through to the next instruction.
    Continue,
    /// Steer fetch to `target`; `taken` is recorded as the direction
    /// prediction for conditional branches.
    Redirect {
        /// New fetch address.
        target: u64,
        /// Direction recorded for the branch unit to check.
        taken: bool,
    },
    /// Stop fetching until the instruction executes.
    Stall,
}

/// Applies the static prediction policy to one predecoded instruction at
/// address `pc`.
#[must_use]
pub fn check(pre: &Predecoded, pc: u64) -> CheckAction {
    if pre.unsafe_instr {
        return CheckAction::Stall;
    }
    match pre.cfi {
        CfiType::Jal => {
            CheckAction::Redirect { target: pc.wrapping_add(pre.offset as u64), taken: true }
        }
        CfiType::Branch if pre.offset < 0 => {
            CheckAction::Redirect { target: pc.wrapping_add(pre.offset as u64), taken: true }
        }
        CfiType::Jalr => CheckAction::Stall,
        _ => CheckAction::Continue,
    }
}
