//! Scheduler pipeline.
//!
//! Four one-cycle stages connected by two-deep FIFOs:
//!
//! 1. **reg-alloc**: allocate the destination physical register and the
//!    reorder buffer slot.
//! 2. **rename**: assign the speculation tag, then rename through the
//!    checkpointed alias table. Conditional branches request a checkpoint
//!    here; tag and rename fire together or not at all.
//! 3. **rs-select**: reserve a slot in the first station that accepts the
//!    op type and has room.
//! 4. **rs-insert**: read the register file for both sources and fill the
//!    reserved slot. Valid sources are captured as values; pending ones
//!    keep their physical tag and wait for the result broadcast.
//!
//! Stages run youngest-FIFO-first within a cycle so backpressure
//! propagates naturally: a stall in rs-select backs up through the FIFOs
//! into the decode queue.

pub mod wakeup;

use std::collections::VecDeque;

use crate::common::{PhysReg, RobId, SpecTag};
use crate::core::structs::{
    CheckpointRat, FreeRegPool, RegFile, ReservationStation, Rob, RobData, RsEntry,
};
use crate::isa::{DecodedInstr, OpType};
use crate::stats::SimStats;

/// Inter-stage FIFO depth.
const FIFO_DEPTH: usize = 2;

/// A decoded instruction entering the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct DecodedOp {
    /// Decoded fields.
    pub instr: DecodedInstr,
    /// Instruction address.
    pub pc: u64,
    /// Fall-through address.
    pub next_pc: u64,
    /// The frontend predicted this instruction taken.
    pub pred_taken: bool,
    /// Set on the first instruction fetched after a rollback redirect;
    /// carries the tag the machine rolled back to.
    pub rollback_tag: Option<SpecTag>,
}

#[derive(Debug, Clone, Copy)]
struct AllocatedOp {
    op: DecodedOp,
    rp_dst: PhysReg,
    rob_id: RobId,
}

#[derive(Debug, Clone, Copy)]
struct RenamedOp {
    op: AllocatedOp,
    tag: SpecTag,
    rp_s1: PhysReg,
    rp_s2: PhysReg,
}

#[derive(Debug, Clone, Copy)]
struct SelectedOp {
    op: RenamedOp,
    station: usize,
    slot: usize,
}

#[derive(Debug)]
struct StageFifo<T> {
    q: VecDeque<T>,
}

impl<T: Copy> StageFifo<T> {
    fn new() -> Self {
        Self { q: VecDeque::with_capacity(FIFO_DEPTH) }
    }

    fn is_full(&self) -> bool {
        self.q.len() == FIFO_DEPTH
    }

    fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    fn front(&self) -> Option<T> {
        self.q.front().copied()
    }

    fn push(&mut self, v: T) {
        debug_assert!(!self.is_full());
        self.q.push_back(v);
    }

    fn pop(&mut self) -> Option<T> {
        self.q.pop_front()
    }

    fn clear(&mut self) {
        self.q.clear();
    }
}

/// The four-stage scheduler.
#[derive(Debug)]
pub struct Scheduler {
    input: StageFifo<DecodedOp>,
    allocated: StageFifo<AllocatedOp>,
    renamed: StageFifo<RenamedOp>,
    selected: StageFifo<SelectedOp>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: StageFifo::new(),
            allocated: StageFifo::new(),
            renamed: StageFifo::new(),
            selected: StageFifo::new(),
        }
    }

    /// True when the decode queue may push this cycle.
    #[must_use]
    pub fn can_push(&self) -> bool {
        !self.input.is_full()
    }

    /// Accepts one decoded instruction from the decode queue.
    ///
    /// # Panics
    ///
    /// Panics (in debug builds) when pushed while [`Self::can_push`] is
    /// false.
    pub fn push(&mut self, op: DecodedOp) {
        self.input.push(op);
    }

    /// Address of the oldest instruction still waiting for its reorder
    /// buffer slot. Everything past reg-alloc is visible through the
    /// reorder buffer instead.
    #[must_use]
    pub fn front_pc(&self) -> Option<u64> {
        self.input.front().map(|op| op.pc)
    }

    /// True when no instruction sits in any scheduler FIFO.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
            && self.allocated.is_empty()
            && self.renamed.is_empty()
            && self.selected.is_empty()
    }

    /// Discards every buffered instruction. Only the interrupt
    /// coordinator's hard flush may call this: resources held by the
    /// dropped instructions (ROB slots, destination registers) are
    /// reclaimed by its ROB drain, and station reservations by the
    /// station clear.
    pub fn clear(&mut self) {
        self.input.clear();
        self.allocated.clear();
        self.renamed.clear();
        self.selected.clear();
    }

    /// Runs all four stages for one cycle, youngest first.
    pub fn tick(
        &mut self,
        crat: &mut CheckpointRat,
        pool: &mut FreeRegPool,
        rob: &mut Rob,
        rf: &RegFile,
        stations: &mut [ReservationStation],
        stats: &mut SimStats,
    ) {
        self.stage_rs_insert(rf, stations);
        self.stage_rs_select(stations);
        self.stage_rename(crat, rob, stats);
        self.stage_reg_alloc(pool, rob);
    }

    fn stage_reg_alloc(&mut self, pool: &mut FreeRegPool, rob: &mut Rob) {
        if self.allocated.is_full() {
            return;
        }
        let Some(front) = self.input.front() else { return };
        if rob.free_slots() == 0 {
            return;
        }
        let rp_dst = if front.instr.rl_dst.0 != 0 {
            let Some(rp) = pool.alloc() else { return };
            rp
        } else {
            PhysReg::ZERO
        };
        let Some(op) = self.input.pop() else { return };
        let rob_id = rob.put(RobData {
            rl_dst: op.instr.rl_dst,
            rp_dst,
            pc: op.pc,
            ..RobData::default()
        });
        self.allocated.push(AllocatedOp { op, rp_dst, rob_id });
    }

    fn stage_rename(&mut self, crat: &mut CheckpointRat, rob: &mut Rob, stats: &mut SimStats) {
        if self.renamed.is_full() {
            return;
        }
        let Some(front) = self.allocated.front() else { return };

        let wants_checkpoint = front.op.instr.op == OpType::Branch;
        if wants_checkpoint && !crat.checkpoint_available() {
            return;
        }
        let Some(tag_out) = crat.tag(front.op.rollback_tag, wants_checkpoint) else { return };
        // Checkpoint room was verified above; rename cannot block now.
        let Some((rp_s1, rp_s2)) = crat.rename(
            front.rp_dst,
            front.op.instr.rl_dst,
            front.op.instr.rl_s1,
            front.op.instr.rl_s2,
            tag_out.tag,
            tag_out.commit_checkpoint,
        ) else {
            return;
        };
        rob.note_tag(front.rob_id, tag_out.tag, tag_out.tag_increment);
        if tag_out.tag_increment {
            stats.tags_allocated += 1;
        }
        if tag_out.commit_checkpoint {
            stats.checkpoints_created += 1;
        }
        let Some(op) = self.allocated.pop() else { return };
        self.renamed.push(RenamedOp { op, tag: tag_out.tag, rp_s1, rp_s2 });
    }

    fn stage_rs_select(&mut self, stations: &mut [ReservationStation]) {
        if self.selected.is_full() {
            return;
        }
        let Some(front) = self.renamed.front() else { return };
        let op_type = front.op.op.instr.op;
        for (station, rs) in stations.iter_mut().enumerate() {
            if !rs.accepts(op_type) {
                continue;
            }
            if let Some(slot) = rs.select() {
                let Some(op) = self.renamed.pop() else { return };
                self.selected.push(SelectedOp { op, station, slot });
                return;
            }
        }
        // No station accepts this op type with a free slot: structural
        // stall until one drains.
    }

    fn stage_rs_insert(&mut self, rf: &RegFile, stations: &mut [ReservationStation]) {
        let Some(sel) = self.selected.pop() else { return };
        let r = sel.op;
        let instr = r.op.op.instr;

        let (s1_val, s1_ok) = rf.read(r.rp_s1);
        let (s2_val, s2_ok) = rf.read(r.rp_s2);

        stations[sel.station].insert(
            sel.slot,
            RsEntry {
                rob_id: r.op.rob_id,
                tag: r.tag,
                op: instr.op,
                funct3: instr.funct3,
                funct7: instr.funct7,
                op32: instr.op32,
                rp_dst: r.op.rp_dst,
                rp_s1: if s1_ok { PhysReg::ZERO } else { r.rp_s1 },
                rp_s2: if s2_ok { PhysReg::ZERO } else { r.rp_s2 },
                s1_val: if s1_ok { s1_val } else { 0 },
                s2_val: if s2_ok { s2_val } else { 0 },
                imm: instr.imm,
                pc: r.op.op.pc,
                next_pc: r.op.op.next_pc,
                csr: instr.csr,
                pred_taken: r.op.op.pred_taken,
                cause: instr.cause,
            },
        );
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
