//! Reservation stations.
//!
//! Each station buffers renamed instructions for one functional unit.
//! A slot is reserved at RS-select, filled at RS-insert one cycle later,
//! woken by result broadcasts, and taken by the wakeup-select logic when
//! both operands are present. Physical register 0 in an operand field
//! means "operand value already captured".

use crate::common::{ExceptionCause, PhysReg, RobId, SpecTag};
use crate::isa::OpType;

/// A renamed instruction waiting for operands.
#[derive(Debug, Clone, Copy)]
pub struct RsEntry {
    /// Reorder buffer slot of this instruction.
    pub rob_id: RobId,
    /// Speculation tag.
    pub tag: SpecTag,
    /// Operation class.
    pub op: OpType,
    /// funct3 selector.
    pub funct3: u8,
    /// funct7 modifier.
    pub funct7: u8,
    /// RV64 W-form flag.
    pub op32: bool,
    /// Destination physical register (0 when none).
    pub rp_dst: PhysReg,
    /// First operand producer; 0 when `s1_val` is captured.
    pub rp_s1: PhysReg,
    /// Second operand producer; 0 when `s2_val` is captured.
    pub rp_s2: PhysReg,
    /// First operand value, valid when `rp_s1` is 0.
    pub s1_val: u64,
    /// Second operand value, valid when `rp_s2` is 0.
    pub s2_val: u64,
    /// Immediate operand.
    pub imm: i64,
    /// Instruction address.
    pub pc: u64,
    /// Fall-through address (`pc` + encoded width; compressed
    /// instructions advance by 2).
    pub next_pc: u64,
    /// CSR address for CSR operations.
    pub csr: u16,
    /// The frontend predicted this instruction taken.
    pub pred_taken: bool,
    /// Exception carried from fetch or decode.
    pub cause: Option<ExceptionCause>,
}

impl RsEntry {
    /// True when both operands are present.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.rp_s1.is_zero() && self.rp_s2.is_zero()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    reserved: bool,
    entry: Option<RsEntry>,
    /// Insertion order for oldest-first selection.
    seq: u64,
}

/// One reservation station.
#[derive(Debug)]
pub struct ReservationStation {
    /// Op types this station accepts, as an [`OpType`] bit set.
    accepts: u32,
    slots: Vec<Slot>,
    next_seq: u64,
}

impl ReservationStation {
    /// Creates a station with `entries` slots accepting the given op set.
    #[must_use]
    pub fn new(accepts: u32, entries: usize) -> Self {
        Self { accepts, slots: vec![Slot::default(); entries], next_seq: 0 }
    }

    /// True when this station executes the given op type.
    #[must_use]
    pub fn accepts(&self, op: OpType) -> bool {
        op.is_in(self.accepts)
    }

    /// Reserves a free slot, returning its index; `None` stalls RS-select.
    pub fn select(&mut self) -> Option<usize> {
        let idx = self.slots.iter().position(|s| !s.reserved)?;
        self.slots[idx].reserved = true;
        Some(idx)
    }

    /// Fills a previously reserved slot.
    ///
    /// # Panics
    ///
    /// Panics when the slot was not reserved or is already full.
    pub fn insert(&mut self, idx: usize, entry: RsEntry) {
        let slot = &mut self.slots[idx];
        assert!(slot.reserved && slot.entry.is_none(), "insert into unreserved or full slot {idx}");
        slot.entry = Some(entry);
        slot.seq = self.next_seq;
        self.next_seq += 1;
    }

    /// Delivers a broadcast result to every waiting operand field.
    pub fn update(&mut self, rp: PhysReg, value: u64) {
        debug_assert!(!rp.is_zero());
        for slot in &mut self.slots {
            if let Some(e) = slot.entry.as_mut() {
                if e.rp_s1 == rp {
                    e.rp_s1 = PhysReg::ZERO;
                    e.s1_val = value;
                }
                if e.rp_s2 == rp {
                    e.rp_s2 = PhysReg::ZERO;
                    e.s2_val = value;
                }
            }
        }
    }

    /// Takes the oldest ready entry, freeing its slot.
    pub fn take_ready(&mut self) -> Option<RsEntry> {
        let idx = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.entry.is_some_and(|e| e.ready()))
            .min_by_key(|(_, s)| s.seq)
            .map(|(i, _)| i)?;
        let slot = &mut self.slots[idx];
        slot.reserved = false;
        slot.entry.take()
    }

    /// Discards every slot, including reservations. Used by hard flushes.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot { seq: slot.seq, ..Slot::default() };
        }
    }

    /// Number of unreserved slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| !s.reserved).count()
    }
}
