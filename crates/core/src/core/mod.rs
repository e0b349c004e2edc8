//! The out-of-order core model.
//!
//! [`Core`] owns every pipeline structure and advances the whole machine
//! one cycle per [`Core::tick`]. The stage order within a tick runs the
//! pipeline back to front, so each stage sees the state its downstream
//! neighbor exposed at the end of the previous cycle:
//!
//! 1. retirement, then the interrupt coordinator
//! 2. result announcement and the functional units
//! 3. wakeup-select and the four scheduler stages
//! 4. decode, fetch, and the instruction cache
//! 5. control events (rollbacks, resumes, fences), then the alias table
//!
//! Control events raised by the units are buffered during the cycle and
//! applied at the end, after dropping any raised under a tag that went
//! inactive in the meantime.

pub mod backend;
pub mod frontend;
pub mod scheduler;
pub mod structs;

use crate::cache::ICache;
use crate::common::{InterruptCause, RegId};
use crate::config::{Config, ConfigError};
use crate::core::backend::{
    Announcer, ExceptionRegister, IntAction, InterruptCoordinator, Retirement,
};
use crate::core::frontend::FetchUnit;
use crate::core::scheduler::{wakeup, DecodedOp, Scheduler};
use crate::core::structs::{
    CheckpointRat, FreeRegPool, RegFile, ReservationStation, Rob, Rrat,
};
use crate::fu::{
    Alu, CtrlEvent, FuncUnit, JumpBranchUnit, LoadStoreUnit, MulDivUnit, SystemUnit,
};
use crate::isa::csr::CsrFile;
use crate::isa::optype::{ALU_OPS, JB_OPS, LSU_OPS, MULDIV_OPS, SYSTEM_OPS};
use crate::isa::{DecodedInstr, InstrDecoder};
use crate::soc::CoreBus;
use crate::stats::SimStats;

/// One modeled hart.
pub struct Core {
    decoder: InstrDecoder,

    fetch: FetchUnit,
    icache: ICache,
    scheduler: Scheduler,
    stations: Vec<ReservationStation>,

    alu: Alu,
    jb: JumpBranchUnit,
    muldiv: MulDivUnit,
    lsu: LoadStoreUnit,
    system: SystemUnit,

    announcer: Announcer,
    retirement: Retirement,
    coordinator: InterruptCoordinator,

    crat: CheckpointRat,
    rrat: Rrat,
    pool: FreeRegPool,
    rf: RegFile,
    rob: Rob,
    ecr: ExceptionRegister,
    csr: CsrFile,

    /// Cycle, retirement and cache counters.
    pub stats: SimStats,
}

impl Core {
    /// Builds a core from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated geometry constraint.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let c = &config.core;
        let rs = c.rs_entries;
        Ok(Self {
            decoder: InstrDecoder::new(c.xlen, c.extensions, c.isa_reg_cnt),
            fetch: FetchUnit::new(
                c.start_pc,
                config.frontend.fetch_block_bytes,
                c.extensions.c,
                c.xlen,
            ),
            icache: ICache::new(&config.icache, config.frontend.fetch_block_bytes),
            scheduler: Scheduler::new(),
            stations: vec![
                ReservationStation::new(ALU_OPS, rs),
                ReservationStation::new(JB_OPS, rs),
                ReservationStation::new(MULDIV_OPS, rs),
                ReservationStation::new(LSU_OPS, rs),
                ReservationStation::new(SYSTEM_OPS, rs),
            ],
            alu: Alu::new(c.xlen),
            jb: JumpBranchUnit::new(c.xlen),
            muldiv: MulDivUnit::new(
                c.xlen,
                config.fu.mul_latency as u32,
                config.fu.div_latency as u32,
            ),
            lsu: LoadStoreUnit::new(c.xlen),
            system: SystemUnit::new(),
            announcer: Announcer::new(),
            retirement: Retirement::new(c.retirement_width),
            coordinator: InterruptCoordinator::new(c.xlen, c.retirement_width),
            crat: CheckpointRat::new(c.tag_count(), c.checkpoint_count, c.isa_reg_cnt),
            rrat: Rrat::new(c.isa_reg_cnt),
            pool: FreeRegPool::new(c.phys_regs()),
            rf: RegFile::new(c.phys_regs()),
            rob: Rob::new(c.rob_entries()),
            ecr: ExceptionRegister::new(),
            csr: CsrFile::new(c.xlen, &c.extensions, c.mtvec),
            stats: SimStats::new(),
        })
    }

    /// Architectural value of register `x{index}`, read through the
    /// committed alias table.
    #[must_use]
    pub fn reg(&self, index: u8) -> u64 {
        let rp = self.rrat.get(RegId(index));
        self.rf.read(rp).0
    }

    /// Read access to the control and status registers.
    #[must_use]
    pub fn csr(&self) -> &CsrFile {
        &self.csr
    }

    /// Marks an interrupt source pending.
    pub fn raise_interrupt(&mut self, cause: InterruptCause) {
        self.csr.set_pending(cause.bit(), true);
    }

    /// Clears an interrupt source.
    pub fn clear_interrupt(&mut self, cause: InterruptCause) {
        self.csr.set_pending(cause.bit(), false);
    }

    /// True when no instruction is anywhere in the pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rob.is_empty() && self.scheduler.is_empty() && self.fetch.queue_is_empty()
    }

    fn exception_stalled(&self) -> bool {
        self.ecr.is_valid() || !self.retirement.is_normal()
    }

    /// Advances the machine by one cycle.
    pub fn tick(&mut self, bus: &mut dyn CoreBus) {
        let core_empty = self.is_empty();

        // Retirement: commits, trap entry sequencing.
        if let Some(handler) = self.retirement.tick(
            &mut self.rob,
            &mut self.rrat,
            &mut self.pool,
            &mut self.rf,
            &mut self.crat,
            &mut self.ecr,
            &mut self.csr,
            core_empty,
            &mut self.stats,
        ) {
            self.fetch.resume_from_flush(handler);
        }

        // Interrupt coordinator.
        let fetch_pc = self.scheduler.front_pc().unwrap_or_else(|| self.fetch.resume_pc());
        match self.coordinator.tick(
            &mut self.csr,
            &mut self.rob,
            &mut self.crat,
            &self.rrat,
            &mut self.pool,
            &mut self.rf,
            &mut self.retirement,
            &mut self.ecr,
            fetch_pc,
            &mut self.stats,
        ) {
            Some(IntAction::ClearPipeline) => {
                self.scheduler.clear();
                for rs in &mut self.stations {
                    rs.clear();
                }
                self.alu.clear();
                self.jb.clear();
                self.muldiv.clear();
                self.lsu.clear();
                self.system.clear();
                self.fetch.halt();
            }
            Some(IntAction::JumpTo(handler)) => self.fetch.resume_from_flush(handler),
            None => {}
        }

        // Result announcement, one per cycle across all units.
        {
            let mut units: [&mut dyn FuncUnit; 5] = [
                &mut self.alu,
                &mut self.jb,
                &mut self.muldiv,
                &mut self.lsu,
                &mut self.system,
            ];
            self.announcer.tick(
                &mut units,
                &mut self.rob,
                &mut self.rf,
                &mut self.stations,
                &self.crat,
                &mut self.ecr,
            );
        }

        // Units that serialize side effects see the current head.
        let precommit = self.retirement.precommit(&self.rob, &self.crat);
        self.lsu.tick(bus, precommit);
        self.system.tick(&mut self.csr, precommit);
        self.muldiv.tick();

        // Wakeup-select, station i feeding unit i.
        {
            let mut units: [&mut dyn FuncUnit; 5] = [
                &mut self.alu,
                &mut self.jb,
                &mut self.muldiv,
                &mut self.lsu,
                &mut self.system,
            ];
            wakeup::issue_ready(&mut self.stations, &mut units);
        }

        self.scheduler.tick(
            &mut self.crat,
            &mut self.pool,
            &mut self.rob,
            &self.rf,
            &mut self.stations,
            &mut self.stats,
        );

        // Decode: one instruction per cycle into the scheduler.
        if self.scheduler.can_push() {
            if let Some(f) = self.fetch.pop() {
                let instr = f
                    .cause
                    .map_or_else(|| self.decoder.decode(f.raw), DecodedInstr::exception);
                self.scheduler.push(DecodedOp {
                    instr,
                    pc: f.pc,
                    next_pc: f.next_pc,
                    pred_taken: f.pred_taken,
                    rollback_tag: f.rollback_tag,
                });
            }
        }

        let exception_stalled = self.exception_stalled();
        self.fetch.tick(&mut self.icache, exception_stalled);
        self.icache.tick(bus, &mut self.stats);

        self.apply_ctrl_events();
        self.crat.tick();
        self.stats.cycles += 1;
    }

    /// Applies the cycle's buffered steering events. Rollbacks go first:
    /// a rollback may invalidate the instruction behind a same-cycle
    /// resume, and the active-tag filter must see that.
    fn apply_ctrl_events(&mut self) {
        let mut events = self.jb.take_events();
        events.extend(self.system.take_events());

        for &(tag, ev) in &events {
            if let CtrlEvent::Rollback { tag: target, next_pc } = ev {
                if !self.crat.is_active(tag) {
                    continue;
                }
                // A trap entry in progress discards the whole window; the
                // restore at its end supersedes any checkpoint rollback.
                if !self.retirement.is_normal() {
                    continue;
                }
                self.crat.rollback(target);
                self.fetch.redirect_rollback(next_pc, target);
                self.stats.rollbacks += 1;
            }
        }

        for (tag, ev) in events {
            if !self.crat.is_active(tag) {
                continue;
            }
            match ev {
                CtrlEvent::Rollback { .. } => {}
                CtrlEvent::ResumeUnsafe { pc } => {
                    let stalled = self.exception_stalled();
                    self.fetch.resume_unsafe(pc, stalled);
                }
                CtrlEvent::FlushICache => self.icache.flush(),
                CtrlEvent::Iret => self.coordinator.note_iret(),
            }
        }
    }
}
