//! Arithmetic-logic unit.
//!
//! Single-cycle: arithmetic, comparisons, logic ops, shifts and AUIPC.
//! Results wait in a one-deep output slot for the announcement stage.

use crate::config::Xlen;
use crate::core::structs::RsEntry;
use crate::fu::{result_of, FuResult, FuncUnit};
use crate::isa::opcodes::{funct3, funct7};
use crate::isa::OpType;

/// The ALU.
#[derive(Debug)]
pub struct Alu {
    xlen: Xlen,
    done: Option<FuResult>,
}

/// Second operand: register forms decode with a zero immediate, and
/// immediate forms capture x0 (zero) as the register source, so the two
/// never overlap.
fn operand2(entry: &RsEntry) -> u64 {
    entry.s2_val | entry.imm as u64
}

fn sext32(v: u64) -> u64 {
    v as u32 as i32 as i64 as u64
}

impl Alu {
    #[must_use]
    pub fn new(xlen: Xlen) -> Self {
        Self { xlen, done: None }
    }

    fn compute(&self, entry: &RsEntry) -> u64 {
        let narrow = entry.op32 || self.xlen == Xlen::Rv32;
        let a = entry.s1_val;
        let b = operand2(entry);

        let wide = match entry.op {
            OpType::Arithmetic => {
                if u32::from(entry.funct7) == funct7::SUB {
                    a.wrapping_sub(b)
                } else {
                    a.wrapping_add(b)
                }
            }
            OpType::Compare => {
                let lt = if u32::from(entry.funct3) == funct3::SLT {
                    (a as i64) < (b as i64)
                } else {
                    a < b
                };
                u64::from(lt)
            }
            OpType::Logic => match u32::from(entry.funct3) {
                funct3::XOR => a ^ b,
                funct3::OR => a | b,
                _ => a & b,
            },
            OpType::Shift => {
                let shamt = (b & if narrow { 0x1F } else { 0x3F }) as u32;
                match (u32::from(entry.funct3), u32::from(entry.funct7) == funct7::SRA) {
                    (funct3::SLL, _) => a.wrapping_shl(shamt),
                    (_, false) if narrow => u64::from((a as u32) >> shamt),
                    (_, false) => a >> shamt,
                    (_, true) if narrow => ((a as u32 as i32) >> shamt) as i64 as u64,
                    (_, true) => ((a as i64) >> shamt) as u64,
                }
            }
            OpType::Auipc => entry.pc.wrapping_add(entry.imm as u64),
            op => unreachable!("ALU issued op {op:?}"),
        };
        if narrow {
            sext32(wide)
        } else {
            wide
        }
    }
}

impl FuncUnit for Alu {
    fn can_issue(&self) -> bool {
        self.done.is_none()
    }

    fn issue(&mut self, entry: RsEntry) {
        let value = self.compute(&entry);
        self.done = Some(result_of(&entry, value));
    }

    fn take_result(&mut self) -> Option<FuResult> {
        self.done.take()
    }

    fn clear(&mut self) {
        self.done = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PhysReg, RobId, SpecTag};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn entry(op: OpType, funct3: u32, funct7: u32, s1: u64, s2: u64, imm: i64) -> RsEntry {
        RsEntry {
            rob_id: RobId(0),
            tag: SpecTag(0),
            op,
            funct3: funct3 as u8,
            funct7: funct7 as u8,
            op32: false,
            rp_dst: PhysReg(33),
            rp_s1: PhysReg::ZERO,
            rp_s2: PhysReg::ZERO,
            s1_val: s1,
            s2_val: s2,
            imm,
            pc: 0x1000,
            next_pc: 0x1004,
            csr: 0,
            pred_taken: false,
            cause: None,
        }
    }

    fn run(e: RsEntry) -> u64 {
        let mut alu = Alu::new(Xlen::Rv64);
        alu.issue(e);
        alu.take_result().unwrap().value
    }

    #[rstest]
    #[case(entry(OpType::Arithmetic, funct3::ADD_SUB, 0, 5, 0, 7), 12)]
    #[case(entry(OpType::Arithmetic, funct3::ADD_SUB, funct7::SUB, 5, 7, 0), -2i64 as u64)]
    #[case(entry(OpType::Compare, funct3::SLT, 0, -1i64 as u64, 1, 0), 1)]
    #[case(entry(OpType::Compare, funct3::SLTU, 0, -1i64 as u64, 1, 0), 0)]
    #[case(entry(OpType::Logic, funct3::XOR, 0, 0xF0, 0x0F, 0), 0xFF)]
    #[case(entry(OpType::Shift, funct3::SLL, 0, 1, 0, 40), 1 << 40)]
    #[case(entry(OpType::Shift, funct3::SRL_SRA, funct7::SRA, -8i64 as u64, 0, 1), -4i64 as u64)]
    #[case(entry(OpType::Auipc, 0, 0, 0, 0, 0x1000), 0x2000)]
    fn computes(#[case] e: RsEntry, #[case] expected: u64) {
        assert_eq!(run(e), expected);
    }

    #[test]
    fn w_forms_truncate_and_sign_extend() {
        let mut e = entry(OpType::Arithmetic, funct3::ADD_SUB, 0, 0x7FFF_FFFF, 0, 1);
        e.op32 = true;
        assert_eq!(run(e), 0xFFFF_FFFF_8000_0000);
    }

    #[test]
    fn output_slot_backpressures_issue() {
        let mut alu = Alu::new(Xlen::Rv64);
        assert!(alu.can_issue());
        alu.issue(entry(OpType::Arithmetic, funct3::ADD_SUB, 0, 1, 0, 1));
        assert!(!alu.can_issue());
        assert_eq!(alu.take_result().unwrap().value, 2);
        assert!(alu.can_issue());
    }
}
