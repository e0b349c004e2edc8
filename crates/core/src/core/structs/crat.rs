//! Checkpointed register alias table.
//!
//! The speculative alias table (FRAT) together with the speculation tag
//! machinery that makes rollbacks cheap:
//!
//! 1. Tags live in a ring. Instructions between two checkpoints share one
//!    tag; a checkpointing instruction is the last one on its tag, and the
//!    instruction after it opens the next tag.
//! 2. A checkpoint is a full FRAT snapshot taken right after the
//!    checkpointing instruction renames, so the snapshot includes its own
//!    destination write (a JALR writes `rd` before the target resolves).
//! 3. Rollback invalidates the tag-ring suffix younger than the target,
//!    rewinds the checkpoint ring, and restores the FRAT from storage over
//!    two cycles. Invalidated tags stay allocated so in-flight wrong-path
//!    instructions can still be identified until they drain.
//! 4. While the restore is in flight the FRAT is locked; wrong-path
//!    instructions still read it (their results are discarded) but only
//!    the first corrected-path instruction may write again.
//!
//! Tags are freed in program order from retirement; freeing releases the
//! physical checkpoint slot of the freed tag, if it still holds one.

use tracing::{debug, trace};

use crate::common::{cyclic_mask, PhysReg, RegId, SpecTag};

/// Tag decision for one instruction entering rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOut {
    /// Speculation tag assigned to the instruction.
    pub tag: SpecTag,
    /// The instruction is the first one carrying this tag.
    pub tag_increment: bool,
    /// Rename must snapshot the FRAT for this instruction.
    pub commit_checkpoint: bool,
}

/// FRAT restore progress after a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Restore {
    Idle,
    /// Counting down the storage read; the FRAT still holds wrong-path state.
    Pending { checkpoint: usize, cycles_left: u8 },
    /// The FRAT holds the checkpoint; waiting for the corrected path.
    Done,
}

/// Speculative alias table with tagged checkpoints.
#[derive(Debug)]
pub struct CheckpointRat {
    frat: Vec<PhysReg>,
    /// Checkpoint FRAT snapshots, indexed by checkpoint slot.
    storage: Vec<Vec<PhysReg>>,
    /// Checkpoint slot assigned to each tag.
    tag_map: Vec<usize>,

    tag_count: u8,
    checkpoint_count: usize,

    /// Tag ring; `tags_head` is the next tag to hand out.
    tags_head: u8,
    tags_tail: u8,
    /// Checkpoint ring; one slot is kept empty to disambiguate full/empty.
    checkpoints_head: usize,
    checkpoints_tail: usize,

    /// Tags on the current (believed-correct) speculation path.
    active_tags: u64,
    /// Tags whose checkpoint slot is still allocated.
    checkpointed_tags: u64,

    last_issued_tag: SpecTag,
    /// The next tagged instruction opens a fresh tag.
    next_tag_increment: bool,

    /// A rollback is draining wrong-path instructions out of the scheduler.
    flushing: bool,
    rollback_target_tag: SpecTag,

    /// FRAT writes are held off until the corrected path arrives.
    frat_lock: bool,
    frat_unlock_tag: SpecTag,

    /// Checkpoint slot whose snapshot is written at the end of this cycle.
    pending_copy: Option<usize>,
    restore: Restore,
}

impl CheckpointRat {
    /// Creates the table with `tag_count` tags, `checkpoint_count`
    /// physical checkpoint slots, and `reg_cnt` logical registers per
    /// snapshot. Tag 0 starts active and issued.
    ///
    /// # Panics
    ///
    /// Panics on parameter combinations the freeing scheme cannot support.
    #[must_use]
    pub fn new(tag_count: usize, checkpoint_count: usize, reg_cnt: usize) -> Self {
        assert!(tag_count.is_power_of_two() && tag_count <= 64);
        // A single checkpoint cannot work: the tail slot is freed only when
        // the tag after it retires.
        assert!(checkpoint_count > 2);
        assert!(tag_count >= checkpoint_count);
        Self {
            frat: vec![PhysReg::ZERO; reg_cnt],
            storage: vec![vec![PhysReg::ZERO; reg_cnt]; checkpoint_count],
            tag_map: vec![0; tag_count],
            tag_count: tag_count as u8,
            checkpoint_count,
            tags_head: 1,
            tags_tail: 0,
            checkpoints_head: 0,
            checkpoints_tail: 0,
            active_tags: 1,
            checkpointed_tags: 0,
            last_issued_tag: SpecTag(0),
            next_tag_increment: false,
            flushing: false,
            rollback_target_tag: SpecTag(0),
            frat_lock: false,
            frat_unlock_tag: SpecTag(0),
            pending_copy: None,
            restore: Restore::Idle,
        }
    }

    fn allocate_tag(&mut self, active: bool) -> Option<SpecTag> {
        let next = (self.tags_head + 1) % self.tag_count;
        if next == self.tags_tail {
            return None;
        }
        let tag = SpecTag(self.tags_head);
        self.tags_head = next;
        if active {
            self.active_tags |= 1 << tag.0;
        }
        trace!(tag = tag.0, active, "allocated speculation tag");
        Some(tag)
    }

    /// Assigns a speculation tag to one instruction.
    ///
    /// `rollback_tag` is the marker the frontend attaches to the first
    /// instruction fetched after a rollback redirect. `commit_checkpoint`
    /// is set for instructions that need a recovery point.
    ///
    /// Returns `None` when the instruction must stall: the tag ring is
    /// full, or the corrected path arrived before the FRAT restore
    /// finished.
    pub fn tag(&mut self, rollback_tag: Option<SpecTag>, commit_checkpoint: bool) -> Option<TagOut> {
        if !self.flushing {
            let tag_increment = self.next_tag_increment;
            let tag =
                if tag_increment { self.allocate_tag(true)? } else { self.last_issued_tag };
            self.last_issued_tag = tag;
            // The checkpointing instruction is the last one with the
            // current tag; the next instruction opens a new one.
            self.next_tag_increment = commit_checkpoint;
            return Some(TagOut { tag, tag_increment, commit_checkpoint });
        }

        if rollback_tag == Some(self.rollback_target_tag) {
            // First instruction on the corrected path. It may only rename
            // against the restored FRAT.
            if self.restore != Restore::Done {
                return None;
            }
            let tag = self.allocate_tag(true)?;
            self.frat_unlock_tag = tag;
            self.flushing = false;
            self.restore = Restore::Idle;
            self.last_issued_tag = tag;
            self.next_tag_increment = commit_checkpoint;
            Some(TagOut { tag, tag_increment: true, commit_checkpoint })
        } else {
            // Wrong-path leftover draining out of the frontend. It gets an
            // inactive tag so downstream stages can identify and discard
            // it, and never checkpoints.
            let tag_increment = self.next_tag_increment;
            let tag =
                if tag_increment { self.allocate_tag(false)? } else { self.last_issued_tag };
            self.last_issued_tag = tag;
            self.next_tag_increment = false;
            Some(TagOut { tag, tag_increment, commit_checkpoint: false })
        }
    }

    /// Renames one instruction: reads the source mappings, installs the
    /// destination mapping, and snapshots the FRAT when the tag stage
    /// requested a checkpoint.
    ///
    /// Returns `None` when the checkpoint ring is full; the caller stalls
    /// and retries, nothing is mutated. Instructions whose tag does not
    /// unlock a locked FRAT still read source mappings (wrong-path
    /// results are discarded anyway) but write nothing.
    pub fn rename(
        &mut self,
        rp_dst: PhysReg,
        rl_dst: RegId,
        rl_s1: RegId,
        rl_s2: RegId,
        tag: SpecTag,
        commit_checkpoint: bool,
    ) -> Option<(PhysReg, PhysReg)> {
        let tag_valid = !self.frat_lock || tag == self.frat_unlock_tag;

        if commit_checkpoint && tag_valid {
            let next = (self.checkpoints_head + 1) % self.checkpoint_count;
            if next == self.checkpoints_tail {
                return None;
            }
            let checkpoint = self.checkpoints_head;
            self.checkpoints_head = next;
            self.checkpointed_tags |= 1 << tag.0;
            self.tag_map[tag.0 as usize] = checkpoint;
            // The snapshot must include this instruction's own destination
            // write, so storage is filled at the end of the cycle.
            self.pending_copy = Some(checkpoint);
            debug!(tag = tag.0, slot = checkpoint, "checkpoint created");
        }

        let rp_s1 = self.frat[rl_s1.0 as usize];
        let rp_s2 = self.frat[rl_s2.0 as usize];

        if tag_valid {
            self.frat_lock = false;
            if rl_dst.0 != 0 {
                self.frat[rl_dst.0 as usize] = rp_dst;
            }
        }
        Some((rp_s1, rp_s2))
    }

    /// Rolls speculative state back to `tag`.
    ///
    /// Invalidates every younger tag, rewinds the checkpoint ring to the
    /// target's slot, locks the FRAT, and starts the two-cycle restore.
    ///
    /// # Panics
    ///
    /// Panics when the target tag is not active and checkpointed.
    pub fn rollback(&mut self, tag: SpecTag) {
        let bit = 1u64 << tag.0;
        assert!(
            self.active_tags & self.checkpointed_tags & bit != 0,
            "rollback to illegal tag {}",
            tag.0
        );

        // Invalidate the suffix of younger tags, without freeing them:
        // wrong-path instructions in flight still carry them.
        let after = (tag.0 + 1) % self.tag_count;
        let upper = (self.tags_tail + self.tag_count - 1) % self.tag_count;
        if after != upper && after != self.tags_tail {
            self.active_tags &= !cyclic_mask(u32::from(self.tag_count), after, upper);
        }

        // Drop the target's checkpoint and everything allocated after it.
        let checkpoint = self.tag_map[tag.0 as usize];
        self.checkpoints_head = checkpoint;
        self.checkpointed_tags &= !bit;
        debug!(target = tag.0, slot = checkpoint, "rollback to checkpoint");

        self.rollback_target_tag = tag;
        self.flushing = true;
        self.frat_lock = true;
        self.frat_unlock_tag = tag;
        self.restore = Restore::Pending { checkpoint, cycles_left: 2 };
    }

    /// Frees the oldest tag. Called by retirement when the first
    /// instruction of the *next* tag retires, so the freed tag is no
    /// longer referenced anywhere in the machine.
    ///
    /// # Panics
    ///
    /// Panics on underflow: the current tag is never freed.
    pub fn free_tag(&mut self) {
        let freed = self.tags_tail;
        let bit = 1u64 << freed;

        // An invalidated tag keeps its checkpointed bit, but its slot was
        // already reclaimed by the rollback's head rewind.
        let had_checkpoint = self.checkpointed_tags & self.active_tags & bit != 0;
        self.active_tags &= !bit;
        self.checkpointed_tags &= !bit;
        self.tags_tail = (freed + 1) % self.tag_count;
        if had_checkpoint {
            self.checkpoints_tail = (self.checkpoints_tail + 1) % self.checkpoint_count;
        }
        assert!(self.tags_tail != self.tags_head, "tag free underflow");
        trace!(tag = freed, had_checkpoint, "freed speculation tag");
    }

    /// True when a checkpoint slot can be allocated. The rename stage
    /// checks this before tagging a checkpointing instruction so that tag
    /// and rename fire together or not at all.
    #[must_use]
    pub fn checkpoint_available(&self) -> bool {
        (self.checkpoints_head + 1) % self.checkpoint_count != self.checkpoints_tail
    }

    /// True when `tag` is on the believed-correct path.
    #[must_use]
    pub fn is_active(&self, tag: SpecTag) -> bool {
        self.active_tags & (1 << tag.0) != 0
    }

    /// True while a rollback is draining the scheduler.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Restores the FRAT from a committed alias table after a hard flush
    /// and resets all speculation machinery.
    ///
    /// The next tagged instruction opens a fresh tag: an interrupted
    /// rollback may have left `last_issued_tag` pointing at an invalidated
    /// one.
    pub fn flush_restore(&mut self, committed: &[PhysReg]) {
        debug!("alias table restored from committed state");
        self.frat.copy_from_slice(committed);
        self.flushing = false;
        self.frat_lock = false;
        self.restore = Restore::Idle;
        self.pending_copy = None;
        self.next_tag_increment = true;
    }

    /// End-of-cycle update: writes the pending checkpoint snapshot and
    /// advances the restore countdown.
    pub fn tick(&mut self) {
        if let Some(checkpoint) = self.pending_copy.take() {
            self.storage[checkpoint].copy_from_slice(&self.frat);
        }
        if let Restore::Pending { checkpoint, cycles_left } = &mut self.restore {
            *cycles_left -= 1;
            if *cycles_left == 0 {
                let checkpoint = *checkpoint;
                self.restore = Restore::Done;
                self.frat.copy_from_slice(&self.storage[checkpoint]);
                trace!(slot = checkpoint, "checkpoint restore complete");
            }
        }
    }
}
