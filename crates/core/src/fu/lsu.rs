//! Load/store unit.
//!
//! Loads execute speculatively one cycle after issue. Stores are held
//! until retirement's precommit points at them, so memory becomes visible
//! strictly in program order; a store whose precommit arrives with side
//! effects suppressed (wrong path, trap flush) completes without touching
//! the bus. FENCE is a no-op in this single-hart memory model and
//! completes immediately.

use crate::common::ExceptionCause;
use crate::config::Xlen;
use crate::core::structs::RsEntry;
use crate::fu::{exception_of, result_of, FuResult, FuncUnit, Precommit};
use crate::isa::opcodes::funct3;
use crate::isa::OpType;
use crate::soc::CoreBus;

#[derive(Debug)]
enum LsuState {
    Idle,
    /// Issued, executes next tick.
    Pending(RsEntry),
    /// A store waiting for retirement to reach it.
    WaitCommit(RsEntry),
}

/// The load/store unit.
#[derive(Debug)]
pub struct LoadStoreUnit {
    xlen: Xlen,
    state: LsuState,
    done: Option<FuResult>,
}

impl LoadStoreUnit {
    #[must_use]
    pub fn new(xlen: Xlen) -> Self {
        Self { xlen, state: LsuState::Idle, done: None }
    }

    fn effective_addr(&self, entry: &RsEntry) -> u64 {
        entry.s1_val.wrapping_add(entry.imm as u64) & self.xlen.mask()
    }

    /// Access size in bytes.
    fn size(entry: &RsEntry) -> u64 {
        1 << (entry.funct3 & 0x3)
    }

    fn load(&self, entry: &RsEntry, bus: &mut dyn CoreBus) -> FuResult {
        let addr = self.effective_addr(entry);
        let size = Self::size(entry);
        if addr % size != 0 {
            return exception_of(entry, ExceptionCause::LoadAddrMisaligned, addr);
        }
        let word = match bus.read(addr >> 3) {
            Ok(w) => w,
            Err(_) => return exception_of(entry, ExceptionCause::LoadAccessFault, addr),
        };
        let shift = (addr & 0x7) * 8;
        let raw = word >> shift;
        let value = match u32::from(entry.funct3) {
            funct3::LB => raw as u8 as i8 as i64 as u64,
            funct3::LH => raw as u16 as i16 as i64 as u64,
            funct3::LW => raw as u32 as i32 as i64 as u64,
            funct3::LBU => u64::from(raw as u8),
            funct3::LHU => u64::from(raw as u16),
            funct3::LWU => u64::from(raw as u32),
            _ => raw,
        };
        result_of(entry, value)
    }

    fn store(&self, entry: &RsEntry, bus: &mut dyn CoreBus) -> FuResult {
        let addr = self.effective_addr(entry);
        let size = Self::size(entry);
        let shift = (addr & 0x7) * 8;
        let sel = (((1u16 << size) - 1) << (addr & 0x7)) as u8;
        match bus.write(addr >> 3, entry.s2_val << shift, sel) {
            Ok(()) => result_of(entry, 0),
            Err(_) => exception_of(entry, ExceptionCause::StoreAccessFault, addr),
        }
    }

    /// Executes the pending access; `precommit` is retirement's current
    /// head view, consumed by waiting stores.
    pub fn tick(&mut self, bus: &mut dyn CoreBus, precommit: Option<Precommit>) {
        if self.done.is_some() {
            return;
        }
        match std::mem::replace(&mut self.state, LsuState::Idle) {
            LsuState::Idle => {}
            LsuState::Pending(entry) => match entry.op {
                OpType::Load => self.done = Some(self.load(&entry, bus)),
                OpType::Fence => self.done = Some(result_of(&entry, 0)),
                OpType::Store => {
                    let addr = self.effective_addr(&entry);
                    if addr % Self::size(&entry) != 0 {
                        self.done =
                            Some(exception_of(&entry, ExceptionCause::StoreAddrMisaligned, addr));
                    } else {
                        self.state = LsuState::WaitCommit(entry);
                    }
                }
                op => unreachable!("load/store unit issued op {op:?}"),
            },
            LsuState::WaitCommit(entry) => {
                match precommit {
                    Some(p) if p.rob_id == entry.rob_id => {
                        self.done = Some(if p.side_fx {
                            self.store(&entry, bus)
                        } else {
                            // Suppressed store: completes without a bus write.
                            result_of(&entry, 0)
                        });
                    }
                    _ => self.state = LsuState::WaitCommit(entry),
                }
            }
        }
    }
}

impl FuncUnit for LoadStoreUnit {
    fn can_issue(&self) -> bool {
        matches!(self.state, LsuState::Idle) && self.done.is_none()
    }

    fn issue(&mut self, entry: RsEntry) {
        self.state = LsuState::Pending(entry);
    }

    fn take_result(&mut self) -> Option<FuResult> {
        self.done.take()
    }

    fn clear(&mut self) {
        self.state = LsuState::Idle;
        self.done = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PhysReg, RobId, SpecTag};
    use crate::soc::TestMemory;
    use pretty_assertions::assert_eq;

    fn entry(op: OpType, funct3: u32, s1: u64, s2: u64, imm: i64) -> RsEntry {
        RsEntry {
            rob_id: RobId(3),
            tag: SpecTag(0),
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
            pred_taken: false,
            cause: None,
        }
    }

    fn mem() -> TestMemory {
        let mut m = TestMemory::new(0x1000, 0x100);
        m.write(0x1008 / 8, 0x8899_AABB_CCDD_EEFF, 0xFF).unwrap();
        m
    }

    #[test]
    fn loads_extract_and_extend_lanes() {
        let mut m = mem();
        let mut lsu = LoadStoreUnit::new(Xlen::Rv64);
        lsu.issue(entry(OpType::Load, funct3::LB, 0x1008, 0, 1));
        lsu.tick(&mut m, None);
        assert_eq!(lsu.take_result().unwrap().value, 0xFFFF_FFFF_FFFF_FFEE);

        lsu.issue(entry(OpType::Load, funct3::LHU, 0x1008, 0, 4));
        lsu.tick(&mut m, None);
        assert_eq!(lsu.take_result().unwrap().value, 0xAABB);
    }

    #[test]
    fn store_waits_for_precommit() {
        let mut m = mem();
        let mut lsu = LoadStoreUnit::new(Xlen::Rv64);
        lsu.issue(entry(OpType::Store, funct3::SW, 0x1010, 0xDEAD_BEEF, 0));
        lsu.tick(&mut m, None);
        assert!(lsu.take_result().is_none());
        // Head is someone else: keep waiting.
        lsu.tick(&mut m, Some(Precommit { rob_id: RobId(1), side_fx: true }));
        assert!(lsu.take_result().is_none());
        assert_eq!(m.read(0x1010 / 8).unwrap(), 0);

        lsu.tick(&mut m, Some(Precommit { rob_id: RobId(3), side_fx: true }));
        assert!(lsu.take_result().unwrap().exception.is_none());
        assert_eq!(m.read(0x1010 / 8).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn suppressed_store_skips_the_bus() {
        let mut m = mem();
        let mut lsu = LoadStoreUnit::new(Xlen::Rv64);
        lsu.issue(entry(OpType::Store, funct3::SD, 0x1010, 42, 0));
        lsu.tick(&mut m, None);
        lsu.tick(&mut m, Some(Precommit { rob_id: RobId(3), side_fx: false }));
        assert!(lsu.take_result().unwrap().exception.is_none());
        assert_eq!(m.read(0x1010 / 8).unwrap(), 0);
    }

    #[test]
    fn misaligned_and_faulting_accesses_raise() {
        let mut m = mem();
        let mut lsu = LoadStoreUnit::new(Xlen::Rv64);
        lsu.issue(entry(OpType::Load, funct3::LW, 0x1002, 0, 0));
        lsu.tick(&mut m, None);
        let r = lsu.take_result().unwrap();
        assert_eq!(r.exception.unwrap().cause, ExceptionCause::LoadAddrMisaligned);
        assert_eq!(r.exception.unwrap().mtval, 0x1002);

        lsu.issue(entry(OpType::Load, funct3::LD, 0x8000, 0, 0));
        lsu.tick(&mut m, None);
        let r = lsu.take_result().unwrap();
        assert_eq!(r.exception.unwrap().cause, ExceptionCause::LoadAccessFault);
    }
}
