//! Interrupt coordinator.
//!
//! Asynchronous interrupts are taken between instructions, not inside
//! them. On a trigger the coordinator snapshots how many instructions are
//! already in flight and lets retirement commit exactly those; everything
//! fetched after the trigger is then discarded wholesale, the speculative
//! alias table is restored from the committed one, and fetch jumps to the
//! handler. `mepc` is the address of the first discarded instruction, so
//! MRET resumes precisely where the interrupt cut in.

use tracing::debug;

use crate::common::InterruptCause;
use crate::config::Xlen;
use crate::core::backend::exception::ExceptionRegister;
use crate::core::backend::retire::Retirement;
use crate::core::structs::{CheckpointRat, FreeRegPool, RegFile, Rob, Rrat};
use crate::isa::csr::CsrFile;
use crate::stats::SimStats;

/// Pipeline-wide actions the coordinator asks the core to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntAction {
    /// Discard the scheduler, reservation stations, and functional units,
    /// and flush and stall fetch.
    ClearPipeline,
    /// Redirect fetch to the handler and resume.
    JumpTo(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntState {
    Idle,
    /// Letting the instructions that preceded the trigger retire.
    WaitQuiesce { remaining: usize },
    Clear,
    FlushRob,
    JumpIsr,
    WaitForMret,
}

/// The interrupt entry state machine.
#[derive(Debug)]
pub struct InterruptCoordinator {
    xlen: Xlen,
    /// Reorder buffer entries discarded per flush cycle.
    width: usize,
    state: IntState,
    cause: Option<InterruptCause>,
    mepc: u64,
}

impl InterruptCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new(xlen: Xlen, width: usize) -> Self {
        Self { xlen, width, state: IntState::Idle, cause: None, mepc: 0 }
    }

    /// True while an interrupt entry is in progress or its handler runs.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state != IntState::Idle
    }

    /// Called when MRET retires; re-arms the coordinator.
    pub fn note_iret(&mut self) {
        if self.state == IntState::WaitForMret {
            self.state = IntState::Idle;
            self.cause = None;
        }
    }

    /// Advances the state machine by one cycle. `fetch_pc` is the address
    /// the frontend would fetch next, used for `mepc` when the trigger
    /// found an empty reorder buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        csr: &mut CsrFile,
        rob: &mut Rob,
        crat: &mut CheckpointRat,
        rrat: &Rrat,
        pool: &mut FreeRegPool,
        rf: &mut RegFile,
        retirement: &mut Retirement,
        ecr: &mut ExceptionRegister,
        fetch_pc: u64,
        stats: &mut SimStats,
    ) -> Option<IntAction> {
        match self.state {
            IntState::Idle => {
                if csr.interrupts_enabled() {
                    if let Some(cause) = highest_pending(csr) {
                        debug!(?cause, in_flight = rob.len(), "interrupt accepted");
                        self.cause = Some(cause);
                        self.state = IntState::WaitQuiesce { remaining: rob.len() };
                    }
                }
                None
            }
            IntState::WaitQuiesce { remaining } => {
                let remaining = remaining.saturating_sub(retirement.drained_this_cycle());
                let cause = self.cause.expect("quiescing without a cause");
                if remaining == 0 && retirement.is_normal() && !ecr.is_valid() {
                    // Re-check the source: it may have been cleared while
                    // the pipeline drained.
                    if csr.interrupts_enabled() && csr.pending_enabled() & cause.bit() != 0 {
                        self.state = IntState::Clear;
                    } else {
                        self.state = IntState::Idle;
                        self.cause = None;
                    }
                } else {
                    self.state = IntState::WaitQuiesce { remaining };
                }
                None
            }
            IntState::Clear => {
                retirement.set_allow(false);
                self.mepc = rob.peek(0).map_or(fetch_pc, |(_, e)| e.data.pc);
                crat.flush_restore(rrat.snapshot());
                // A post-trigger exception report is dead: its instruction
                // re-executes after MRET and will fault again.
                ecr.clear();
                self.state = IntState::FlushRob;
                Some(IntAction::ClearPipeline)
            }
            IntState::FlushRob => {
                for _ in 0..self.width {
                    let Some(entry) = rob.force_pop() else { break };
                    if !entry.data.rp_dst.is_zero() {
                        pool.free(entry.data.rp_dst);
                        rf.free(entry.data.rp_dst);
                    }
                    if entry.data.tag_increment {
                        crat.free_tag();
                    }
                }
                if rob.is_empty() {
                    self.state = IntState::JumpIsr;
                }
                None
            }
            IntState::JumpIsr => {
                let cause = self.cause.expect("jumping without a cause");
                let handler = csr.trap_enter(cause.mcause(self.xlen.bits()), self.mepc, 0);
                debug!(?cause, mepc = self.mepc, handler, "entering interrupt handler");
                retirement.set_allow(true);
                stats.interrupts += 1;
                self.state = IntState::WaitForMret;
                Some(IntAction::JumpTo(handler))
            }
            IntState::WaitForMret => None,
        }
    }
}

/// Highest-priority pending and enabled interrupt: external, then
/// software, then timer.
fn highest_pending(csr: &CsrFile) -> Option<InterruptCause> {
    let pending = csr.pending_enabled();
    [InterruptCause::MachineExternal, InterruptCause::MachineSoftware, InterruptCause::MachineTimer]
        .into_iter()
        .find(|cause| pending & cause.bit() != 0)
}
