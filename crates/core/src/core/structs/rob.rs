//! Reorder buffer.
//!
//! A ring of in-flight instructions in program order. Slots are allocated
//! at register allocation, marked done (in any order) by result
//! announcement, and drained in order by retirement. The speculation tag
//! and tag-boundary flag are back-filled by the rename stage once the tag
//! substage has run.

use crate::common::{PhysReg, RegId, RobId, SpecTag};

/// Payload recorded at allocation and consumed at retirement.
#[derive(Debug, Clone, Copy, Default)]
pub struct RobData {
    /// Destination logical register (x0 when none).
    pub rl_dst: RegId,
    /// Newly allocated destination physical register.
    pub rp_dst: PhysReg,
    /// Instruction address, for trap reporting.
    pub pc: u64,
    /// Speculation tag, back-filled by rename.
    pub tag: SpecTag,
    /// True when this instruction opened a new tag; retirement frees the
    /// oldest ring tag when the boundary drains.
    pub tag_increment: bool,
}

/// One reorder buffer slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct RobEntry {
    /// Allocation payload.
    pub data: RobData,
    /// Result has been announced.
    pub done: bool,
    /// Completion reported an exception.
    pub exception: bool,
}

/// The reorder buffer ring.
#[derive(Debug)]
pub struct Rob {
    entries: Vec<RobEntry>,
    start: usize,
    end: usize,
    count: usize,
}

impl Rob {
    /// Creates an empty buffer with `capacity` slots (a power of two).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two());
        Self { entries: vec![RobEntry::default(); capacity], start: 0, end: 0, count: 0 }
    }

    /// True when no instructions are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of in-flight instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Number of unallocated slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.entries.len() - self.count
    }

    /// Index of the oldest in-flight instruction.
    #[must_use]
    pub fn start_id(&self) -> RobId {
        RobId(self.start as u16)
    }

    /// Distance of `id` from the ring start; smaller means older.
    #[must_use]
    pub fn age(&self, id: RobId) -> usize {
        (id.0 as usize).wrapping_sub(self.start) & (self.entries.len() - 1)
    }

    /// Allocates the next slot in program order.
    ///
    /// # Panics
    ///
    /// Panics when full; the scheduler must check [`Self::free_slots`].
    pub fn put(&mut self, data: RobData) -> RobId {
        assert!(self.count < self.entries.len(), "reorder buffer overflow");
        let id = self.end;
        self.entries[id] = RobEntry { data, done: false, exception: false };
        self.end = (self.end + 1) & (self.entries.len() - 1);
        self.count += 1;
        RobId(id as u16)
    }

    /// Back-fills the speculation tag assigned after allocation.
    pub fn note_tag(&mut self, id: RobId, tag: SpecTag, tag_increment: bool) {
        let e = &mut self.entries[id.0 as usize];
        e.data.tag = tag;
        e.data.tag_increment = tag_increment;
    }

    /// Marks a slot complete.
    ///
    /// # Panics
    ///
    /// Panics when the slot is already done: one instruction must produce
    /// exactly one completion.
    pub fn mark_done(&mut self, id: RobId, exception: bool) {
        let e = &mut self.entries[id.0 as usize];
        assert!(!e.done, "reorder buffer slot {} marked done twice", id.0);
        e.done = true;
        e.exception = exception;
    }

    /// Looks at the `n`-th oldest entry without consuming it.
    #[must_use]
    pub fn peek(&self, n: usize) -> Option<(RobId, &RobEntry)> {
        if n >= self.count {
            return None;
        }
        let idx = (self.start + n) & (self.entries.len() - 1);
        Some((RobId(idx as u16), &self.entries[idx]))
    }

    /// Drains the oldest entry.
    ///
    /// # Panics
    ///
    /// Panics when empty or when the head is not done; retirement must
    /// check via [`Self::peek`] first.
    pub fn retire(&mut self) -> RobEntry {
        assert!(self.count > 0, "retire from empty reorder buffer");
        let e = self.entries[self.start];
        assert!(e.done, "retire of incomplete instruction");
        self.advance();
        e
    }

    /// Drains the oldest entry regardless of completion. Used by the
    /// interrupt coordinator, which discards in-flight work wholesale.
    pub fn force_pop(&mut self) -> Option<RobEntry> {
        if self.count == 0 {
            return None;
        }
        let e = self.entries[self.start];
        self.advance();
        Some(e)
    }

    fn advance(&mut self) {
        self.start = (self.start + 1) & (self.entries.len() - 1);
        self.count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(rl: u8, rp: u8) -> RobData {
        RobData { rl_dst: RegId(rl), rp_dst: PhysReg(rp), pc: 0x8000_0000, ..RobData::default() }
    }

    #[test]
    fn slots_allocate_in_order() {
        let mut rob = Rob::new(4);
        assert_eq!(rob.put(data(1, 33)), RobId(0));
        assert_eq!(rob.put(data(2, 34)), RobId(1));
        assert_eq!(rob.free_slots(), 2);
        assert_eq!(rob.start_id(), RobId(0));
    }

    #[test]
    fn retire_is_in_order_and_requires_done() {
        let mut rob = Rob::new(4);
        let a = rob.put(data(1, 33));
        let b = rob.put(data(2, 34));
        // Complete out of order.
        rob.mark_done(b, false);
        let head = rob.peek(0).unwrap();
        assert!(!head.1.done);
        rob.mark_done(a, false);
        assert_eq!(rob.retire().data.rp_dst, PhysReg(33));
        assert_eq!(rob.retire().data.rp_dst, PhysReg(34));
        assert!(rob.is_empty());
    }

    #[test]
    fn peek_is_superscalar() {
        let mut rob = Rob::new(4);
        let _ = rob.put(data(1, 33));
        let _ = rob.put(data(2, 34));
        assert_eq!(rob.peek(1).unwrap().0, RobId(1));
        assert!(rob.peek(2).is_none());
    }

    #[test]
    fn ring_wraps() {
        let mut rob = Rob::new(2);
        for i in 0..5 {
            let id = rob.put(data(1, 33));
            rob.mark_done(id, false);
            assert_eq!(id, RobId(i & 1));
            let _ = rob.retire();
        }
    }

    #[test]
    fn note_tag_backfills() {
        let mut rob = Rob::new(4);
        let id = rob.put(data(1, 33));
        rob.note_tag(id, SpecTag(3), true);
        let (_, e) = rob.peek(0).unwrap();
        assert_eq!(e.data.tag, SpecTag(3));
        assert!(e.data.tag_increment);
    }

    #[test]
    #[should_panic(expected = "done twice")]
    fn double_completion_panics() {
        let mut rob = Rob::new(4);
        let id = rob.put(data(1, 33));
        rob.mark_done(id, false);
        rob.mark_done(id, false);
    }

    #[test]
    fn force_pop_ignores_done() {
        let mut rob = Rob::new(4);
        let _ = rob.put(data(1, 33));
        assert!(rob.force_pop().is_some());
        assert!(rob.force_pop().is_none());
    }
}
