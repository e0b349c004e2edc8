//! Retirement.
//!
//! Drains the reorder buffer head in program order, up to the configured
//! width per cycle. An entry only leaves the buffer once its result has
//! been announced, which guarantees no stale completion can arrive for a
//! recycled slot.
//!
//! Three outcomes per entry:
//! 1. **Commit:** active path, no exception. The destination mapping
//!    enters the retirement alias table and the previous mapping is
//!    recycled.
//! 2. **Inactive retire:** the instruction was invalidated by a rollback.
//!    Its freshly allocated destination register is recycled and nothing
//!    architectural happens; in particular it never traps.
//! 3. **Trap entry:** active path with a reported exception. The faulting
//!    instruction does not commit; the machine flushes everything younger
//!    and enters the handler once the pipeline has drained.

use tracing::{debug, trace};

use crate::common::ExceptionCause;
use crate::core::backend::exception::ExceptionRegister;
use crate::core::structs::{CheckpointRat, FreeRegPool, RegFile, Rob, RobData, Rrat};
use crate::fu::Precommit;
use crate::isa::csr::CsrFile;
use crate::stats::SimStats;

/// Retirement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireFsm {
    /// Draining completed instructions normally.
    Normal,
    /// A trap was taken: discarding everything younger than the faulting
    /// instruction as it completes.
    TrapFlush,
    /// Reorder buffer empty; waiting for the rest of the pipeline to
    /// drain before entering the handler.
    TrapResume,
}

#[derive(Debug, Clone, Copy)]
struct TrapInfo {
    cause: ExceptionCause,
    epc: u64,
    mtval: u64,
}

/// The retirement stage.
#[derive(Debug)]
pub struct Retirement {
    width: usize,
    fsm: RetireFsm,
    /// Cleared by the interrupt coordinator to freeze the head.
    allow: bool,
    trap: Option<TrapInfo>,
    drained: usize,
}

impl Retirement {
    /// Creates the stage draining up to `width` entries per cycle.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self { width, fsm: RetireFsm::Normal, allow: true, trap: None, drained: 0 }
    }

    /// Current state.
    #[must_use]
    pub fn fsm(&self) -> RetireFsm {
        self.fsm
    }

    /// True outside of a trap entry sequence.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.fsm == RetireFsm::Normal
    }

    /// Freezes or releases the reorder buffer head.
    pub fn set_allow(&mut self, allow: bool) {
        self.allow = allow;
    }

    /// Entries drained from the reorder buffer on the last tick, counting
    /// commits, inactive retires, and trap-flush discards alike.
    #[must_use]
    pub fn drained_this_cycle(&self) -> usize {
        self.drained
    }

    /// The head view handed to units that serialize side effects on
    /// commit. `side_fx` is false when the head instruction must complete
    /// without touching architectural state.
    #[must_use]
    pub fn precommit(&self, rob: &Rob, crat: &CheckpointRat) -> Option<Precommit> {
        let (id, e) = rob.peek(0)?;
        Some(Precommit {
            rob_id: id,
            side_fx: self.allow && self.is_normal() && crat.is_active(e.data.tag),
        })
    }

    /// Runs one retirement cycle. `core_empty` tells the resume state that
    /// no instruction remains anywhere in the pipeline. Returns the
    /// handler address when a trap entry completes; the caller redirects
    /// fetch there.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        rob: &mut Rob,
        rrat: &mut Rrat,
        pool: &mut FreeRegPool,
        rf: &mut RegFile,
        crat: &mut CheckpointRat,
        ecr: &mut ExceptionRegister,
        csr: &mut CsrFile,
        core_empty: bool,
        stats: &mut SimStats,
    ) -> Option<u64> {
        self.drained = 0;
        match self.fsm {
            RetireFsm::Normal => self.drain_normal(rob, rrat, pool, rf, crat, ecr, stats),
            RetireFsm::TrapFlush => self.drain_flush(rob, pool, rf, crat),
            RetireFsm::TrapResume => {
                return self.resume(rrat, crat, ecr, csr, core_empty);
            }
        }
        None
    }

    fn drain_normal(
        &mut self,
        rob: &mut Rob,
        rrat: &mut Rrat,
        pool: &mut FreeRegPool,
        rf: &mut RegFile,
        crat: &mut CheckpointRat,
        ecr: &mut ExceptionRegister,
        stats: &mut SimStats,
    ) {
        for _ in 0..self.width {
            if !self.allow {
                break;
            }
            let Some((id, entry)) = rob.peek(0) else { break };
            if !entry.done {
                break;
            }
            let entry = *entry;
            let active = crat.is_active(entry.data.tag);

            if active && entry.exception {
                let pending = ecr.get().expect("exception at head with empty register");
                assert!(pending.rob_id == id, "held exception is not the head");
                self.trap = Some(TrapInfo {
                    cause: pending.cause,
                    epc: entry.data.pc,
                    mtval: pending.mtval,
                });
                // The faulting instruction is discarded, not committed.
                let _ = rob.retire();
                self.drained += 1;
                release_dst(&entry.data, pool, rf);
                if entry.data.tag_increment {
                    crat.free_tag();
                }
                stats.traps += 1;
                debug!(cause = ?pending.cause, epc = entry.data.pc, "trap taken at head");
                self.fsm = RetireFsm::TrapFlush;
                break;
            }

            let _ = rob.retire();
            self.drained += 1;
            if active {
                if entry.data.rl_dst.0 != 0 {
                    let old = rrat.commit(entry.data.rl_dst, entry.data.rp_dst);
                    // The reset mapping to register 0 is never recycled.
                    if !old.is_zero() {
                        pool.free(old);
                        rf.free(old);
                    }
                }
                trace!(pc = entry.data.pc, "retired");
                stats.retired += 1;
            } else {
                release_dst(&entry.data, pool, rf);
                // An invalidated instruction takes its stale report with it.
                if ecr.get().is_some_and(|p| p.rob_id == id) {
                    ecr.clear();
                }
                stats.retired_inactive += 1;
            }
            if entry.data.tag_increment {
                crat.free_tag();
            }
        }
    }

    fn drain_flush(
        &mut self,
        rob: &mut Rob,
        pool: &mut FreeRegPool,
        rf: &mut RegFile,
        crat: &mut CheckpointRat,
    ) {
        for _ in 0..self.width {
            let Some((_, entry)) = rob.peek(0) else { break };
            // Wait for the announcement; popping early would let a stale
            // completion land in a recycled slot.
            if !entry.done {
                break;
            }
            let entry = *entry;
            let _ = rob.retire();
            self.drained += 1;
            release_dst(&entry.data, pool, rf);
            if entry.data.tag_increment {
                crat.free_tag();
            }
        }
        if rob.is_empty() {
            self.fsm = RetireFsm::TrapResume;
        }
    }

    fn resume(
        &mut self,
        rrat: &Rrat,
        crat: &mut CheckpointRat,
        ecr: &mut ExceptionRegister,
        csr: &mut CsrFile,
        core_empty: bool,
    ) -> Option<u64> {
        if !core_empty {
            return None;
        }
        let trap = self.trap.take().expect("trap resume without trap info");
        let handler = csr.trap_enter(trap.cause.code(), trap.epc, trap.mtval);
        debug!(handler, "pipeline drained, entering handler");
        crat.flush_restore(rrat.snapshot());
        ecr.clear();
        self.fsm = RetireFsm::Normal;
        Some(handler)
    }
}

fn release_dst(data: &RobData, pool: &mut FreeRegPool, rf: &mut RegFile) {
    if !data.rp_dst.is_zero() {
        pool.free(data.rp_dst);
        rf.free(data.rp_dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PhysReg, RegId, SpecTag};
    use crate::config::{ExtensionsConfig, Xlen};
    use crate::core::backend::exception::PendingException;
    use crate::isa::csr::addr;
    use pretty_assertions::assert_eq;

    struct Rig {
        rob: Rob,
        rrat: Rrat,
        pool: FreeRegPool,
        rf: RegFile,
        crat: CheckpointRat,
        ecr: ExceptionRegister,
        csr: CsrFile,
        stats: SimStats,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                rob: Rob::new(16),
                rrat: Rrat::new(32),
                pool: FreeRegPool::new(64),
                rf: RegFile::new(64),
                crat: CheckpointRat::new(8, 6, 32),
                ecr: ExceptionRegister::new(),
                csr: CsrFile::new(Xlen::Rv64, &ExtensionsConfig::default(), 0x8000_1000),
                stats: SimStats::new(),
            }
        }

        fn put(&mut self, rl: u8, pc: u64, tag: SpecTag) -> crate::common::RobId {
            let rp = if rl == 0 { PhysReg::ZERO } else { self.pool.alloc().unwrap() };
            let id = self.rob.put(RobData {
                rl_dst: RegId(rl),
                rp_dst: rp,
                pc,
                tag,
                tag_increment: false,
            });
            id
        }

        fn tick(&mut self, retire: &mut Retirement, core_empty: bool) -> Option<u64> {
            retire.tick(
                &mut self.rob,
                &mut self.rrat,
                &mut self.pool,
                &mut self.rf,
                &mut self.crat,
                &mut self.ecr,
                &mut self.csr,
                core_empty,
                &mut self.stats,
            )
        }
    }

    #[test]
    fn commits_in_order_up_to_width() {
        let mut rig = Rig::new();
        let mut retire = Retirement::new(2);
        for pc in [0x100u64, 0x104, 0x108] {
            let id = rig.put(5, pc, SpecTag(0));
            rig.rob.mark_done(id, false);
        }
        assert!(rig.tick(&mut retire, false).is_none());
        assert_eq!(retire.drained_this_cycle(), 2);
        assert_eq!(rig.stats.retired, 2);
        let _ = rig.tick(&mut retire, false);
        assert_eq!(rig.stats.retired, 3);
        assert!(rig.rob.is_empty());
        // x5 points at the last committed destination.
        assert_eq!(rig.rrat.get(RegId(5)), PhysReg(3));
    }

    #[test]
    fn commit_recycles_the_previous_mapping() {
        let mut rig = Rig::new();
        let mut retire = Retirement::new(1);
        let a = rig.put(7, 0x100, SpecTag(0));
        let b = rig.put(7, 0x104, SpecTag(0));
        rig.rf.write(PhysReg(1), 11);
        rig.rf.write(PhysReg(2), 22);
        rig.rob.mark_done(a, false);
        rig.rob.mark_done(b, false);

        let before = rig.pool.available();
        let _ = rig.tick(&mut retire, false);
        // First commit replaced the reset mapping; nothing recycled.
        assert_eq!(rig.pool.available(), before);
        let _ = rig.tick(&mut retire, false);
        assert_eq!(rig.pool.available(), before + 1);
        assert_eq!(rig.rf.read(PhysReg(1)), (0, false));
    }

    #[test]
    fn head_must_be_done() {
        let mut rig = Rig::new();
        let mut retire = Retirement::new(2);
        let _a = rig.put(5, 0x100, SpecTag(0));
        let b = rig.put(6, 0x104, SpecTag(0));
        rig.rob.mark_done(b, false);
        let _ = rig.tick(&mut retire, false);
        assert_eq!(retire.drained_this_cycle(), 0);
        assert_eq!(rig.rob.len(), 2);
    }

    #[test]
    fn inactive_entries_retire_without_committing() {
        let mut rig = Rig::new();
        let mut retire = Retirement::new(2);
        // Tag 3 was never activated, standing in for an invalidated path.
        let id = rig.put(5, 0x100, SpecTag(3));
        rig.rob.mark_done(id, true);
        rig.ecr.report(
            &rig.rob,
            PendingException {
                cause: ExceptionCause::LoadAccessFault,
                rob_id: id,
                pc: 0x100,
                mtval: 0x2000,
            },
        );

        let before = rig.pool.available();
        let _ = rig.tick(&mut retire, false);
        assert_eq!(rig.stats.retired_inactive, 1);
        assert_eq!(rig.stats.traps, 0);
        assert!(retire.is_normal());
        assert_eq!(rig.rrat.get(RegId(5)), PhysReg::ZERO);
        assert_eq!(rig.pool.available(), before + 1);
        // The stale report left with its instruction.
        assert!(!rig.ecr.is_valid());
    }

    #[test]
    fn trap_flushes_then_enters_the_handler() {
        let mut rig = Rig::new();
        let mut retire = Retirement::new(2);
        let faulting = rig.put(5, 0x100, SpecTag(0));
        let younger = rig.put(6, 0x104, SpecTag(0));
        rig.rob.mark_done(faulting, true);
        rig.ecr.report(
            &rig.rob,
            PendingException {
                cause: ExceptionCause::LoadAccessFault,
                rob_id: faulting,
                pc: 0x100,
                mtval: 0x2000,
            },
        );

        let _ = rig.tick(&mut retire, false);
        assert_eq!(retire.fsm(), RetireFsm::TrapFlush);
        assert_eq!(rig.stats.traps, 1);
        assert_eq!(rig.stats.retired, 0);
        // x5 never committed.
        assert_eq!(rig.rrat.get(RegId(5)), PhysReg::ZERO);

        // The younger entry leaves only once announced.
        let _ = rig.tick(&mut retire, false);
        assert_eq!(retire.fsm(), RetireFsm::TrapFlush);
        rig.rob.mark_done(younger, false);
        let _ = rig.tick(&mut retire, false);
        assert_eq!(retire.fsm(), RetireFsm::TrapResume);

        // Resume waits for the pipeline to drain.
        assert!(rig.tick(&mut retire, false).is_none());
        let handler = rig.tick(&mut retire, true).unwrap();
        assert_eq!(handler, 0x8000_1000);
        assert!(retire.is_normal());
        assert!(!rig.ecr.is_valid());
        assert_eq!(rig.csr.read(addr::MEPC).unwrap(), 0x100);
        assert_eq!(rig.csr.read(addr::MCAUSE).unwrap(), ExceptionCause::LoadAccessFault.code());
        assert_eq!(rig.csr.read(addr::MTVAL).unwrap(), 0x2000);
    }

    #[test]
    fn frozen_head_does_not_drain() {
        let mut rig = Rig::new();
        let mut retire = Retirement::new(2);
        let id = rig.put(5, 0x100, SpecTag(0));
        rig.rob.mark_done(id, false);
        retire.set_allow(false);
        let _ = rig.tick(&mut retire, false);
        assert_eq!(retire.drained_this_cycle(), 0);
        let view = retire.precommit(&rig.rob, &rig.crat).unwrap();
        assert!(!view.side_fx);
    }
}
