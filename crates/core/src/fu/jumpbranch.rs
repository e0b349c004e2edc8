//! Jump and branch unit.
//!
//! JAL only produces the link value: the prediction checker already
//! resolved its redirect in the frontend. JALR stalled the frontend at
//! fetch (indirect target), so resolving it emits a resume event with the
//! real target. Conditional branches compare the resolved direction with
//! the frontend's prediction and raise a rollback on mismatch.

use crate::common::SpecTag;
use crate::config::Xlen;
use crate::core::structs::RsEntry;
use crate::fu::{result_of, CtrlEvent, FuResult, FuncUnit};
use crate::isa::opcodes::funct3;
use crate::isa::OpType;

/// The jump/branch unit.
#[derive(Debug)]
pub struct JumpBranchUnit {
    xlen: Xlen,
    done: Option<FuResult>,
    events: Vec<(SpecTag, CtrlEvent)>,
}

impl JumpBranchUnit {
    #[must_use]
    pub fn new(xlen: Xlen) -> Self {
        Self { xlen, done: None, events: Vec::new() }
    }

    /// Drains the steering events raised since the last call.
    pub fn take_events(&mut self) -> Vec<(SpecTag, CtrlEvent)> {
        std::mem::take(&mut self.events)
    }

    fn branch_taken(entry: &RsEntry) -> bool {
        let (a, b) = (entry.s1_val, entry.s2_val);
        match u32::from(entry.funct3) {
            funct3::BEQ => a == b,
            funct3::BNE => a != b,
            funct3::BLT => (a as i64) < (b as i64),
            funct3::BGE => (a as i64) >= (b as i64),
            funct3::BLTU => a < b,
            _ => a >= b,
        }
    }
}

impl FuncUnit for JumpBranchUnit {
    fn can_issue(&self) -> bool {
        self.done.is_none()
    }

    fn issue(&mut self, entry: RsEntry) {
        match entry.op {
            OpType::Jal => {
                self.done = Some(result_of(&entry, entry.next_pc));
            }
            OpType::Jalr => {
                let target =
                    self.xlen.mask() & entry.s1_val.wrapping_add(entry.imm as u64) & !1;
                self.events.push((entry.tag, CtrlEvent::ResumeUnsafe { pc: target }));
                self.done = Some(result_of(&entry, entry.next_pc));
            }
            OpType::Branch => {
                let taken = Self::branch_taken(&entry);
                if taken != entry.pred_taken {
                    let next_pc = if taken {
                        entry.pc.wrapping_add(entry.imm as u64) & self.xlen.mask()
                    } else {
                        entry.next_pc
                    };
                    self.events.push((entry.tag, CtrlEvent::Rollback { tag: entry.tag, next_pc }));
                }
                self.done = Some(result_of(&entry, 0));
            }
            op => unreachable!("jump/branch unit issued op {op:?}"),
        }
    }

    fn take_result(&mut self) -> Option<FuResult> {
        self.done.take()
    }

    fn clear(&mut self) {
        self.done = None;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PhysReg, RobId};
    use pretty_assertions::assert_eq;

    fn entry(op: OpType, funct3: u32, s1: u64, s2: u64, imm: i64, pred_taken: bool) -> RsEntry {
        RsEntry {
            rob_id: RobId(0),
            tag: SpecTag(2),
            op,
            funct3: funct3 as u8,
            funct7: 0,
            op32: false,
            rp_dst: PhysReg(33),
            rp_s1: PhysReg::ZERO,
            rp_s2: PhysReg::ZERO,
            s1_val: s1,
            s2_val: s2,
            imm,
            pc: 0x100,
            next_pc: 0x104,
            csr: 0,
            pred_taken,
            cause: None,
        }
    }

    #[test]
    fn jal_links_without_steering() {
        let mut jb = JumpBranchUnit::new(Xlen::Rv64);
        jb.issue(entry(OpType::Jal, 0, 0, 0, 0x40, false));
        assert_eq!(jb.take_result().unwrap().value, 0x104);
        assert!(jb.take_events().is_empty());
    }

    #[test]
    fn jalr_resumes_the_stalled_frontend() {
        let mut jb = JumpBranchUnit::new(Xlen::Rv64);
        jb.issue(entry(OpType::Jalr, 0, 0x2001, 0, 4, false));
        assert_eq!(jb.take_result().unwrap().value, 0x104);
        // Target is s1 + imm with bit 0 cleared.
        assert_eq!(
            jb.take_events(),
            vec![(SpecTag(2), CtrlEvent::ResumeUnsafe { pc: 0x2004 })]
        );
    }

    #[test]
    fn correctly_predicted_branch_is_quiet() {
        let mut jb = JumpBranchUnit::new(Xlen::Rv64);
        jb.issue(entry(OpType::Branch, funct3::BEQ, 5, 5, 0x40, true));
        assert!(jb.take_result().unwrap().exception.is_none());
        assert!(jb.take_events().is_empty());
    }

    #[test]
    fn mispredicted_branch_rolls_back_to_its_own_tag() {
        let mut jb = JumpBranchUnit::new(Xlen::Rv64);
        // Predicted taken, resolves not-taken: corrected pc is the
        // fall-through.
        jb.issue(entry(OpType::Branch, funct3::BNE, 5, 5, 0x40, true));
        assert_eq!(
            jb.take_events(),
            vec![(SpecTag(2), CtrlEvent::Rollback { tag: SpecTag(2), next_pc: 0x104 })]
        );

        // Predicted not-taken, resolves taken: corrected pc is the target.
        let mut jb = JumpBranchUnit::new(Xlen::Rv64);
        jb.issue(entry(OpType::Branch, funct3::BLT, 1, 5, 0x40, false));
        assert_eq!(
            jb.take_events(),
            vec![(SpecTag(2), CtrlEvent::Rollback { tag: SpecTag(2), next_pc: 0x140 })]
        );
    }
}
