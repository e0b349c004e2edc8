//! Fetch unit.
//!
//! Runs one fetch block per cycle through three conceptual stages:
//! 1. **S0** pushes the current block address at the instruction cache
//!    and remembers the expected start offset.
//! 2. **S1** accepts the cache response and slices it into instructions,
//!    expanding compressed parcels and joining a 32-bit instruction that
//!    straddles two blocks via the saved previous half.
//! 3. **S2** predecodes each instruction and applies the static
//!    prediction policy: the block is truncated at the first redirecting
//!    or stalling instruction.
//!
//! Accepted instructions queue up for decode. A rollback redirect clears
//! that queue; wrong-path instructions that already left it drain
//! through the scheduler under inactive tags instead.

use std::collections::VecDeque;

use crate::cache::{CacheResponse, ICache};
use crate::common::{ExceptionCause, SpecTag};
use crate::config::Xlen;
use crate::core::frontend::predecode::{check, predecode, CheckAction};
use crate::core::frontend::stall::StallController;
use crate::isa::rvc;

/// Outstanding cache requests.
const REQ_DEPTH: usize = 2;
/// Fetched-instruction queue depth.
const QUEUE_DEPTH: usize = 16;

/// One fetched instruction, headed for decode.
#[derive(Debug, Clone, Copy)]
pub struct FetchedInstr {
    /// Expanded 32-bit encoding.
    pub raw: u32,
    /// Instruction address.
    pub pc: u64,
    /// Fall-through address.
    pub next_pc: u64,
    /// The static policy predicted this instruction taken.
    pub pred_taken: bool,
    /// Rollback marker: set on the first instruction fetched after a
    /// rollback redirect.
    pub rollback_tag: Option<SpecTag>,
    /// Fetch-detected exception; the instruction bits are invalid.
    pub cause: Option<ExceptionCause>,
}

#[derive(Debug, Clone, Copy)]
struct PrevHalf {
    pc: u64,
    parcel: u16,
}

/// The fetch unit.
#[derive(Debug)]
pub struct FetchUnit {
    fetch_block_bytes: u64,
    compressed: bool,
    xlen: Xlen,

    /// Next address to fetch.
    pc: u64,
    /// Start addresses of requests in flight, in issue order.
    req_fifo: VecDeque<u64>,
    /// Responses to drop after a flush.
    discard: usize,
    prev_half: Option<PrevHalf>,
    queue: VecDeque<FetchedInstr>,
    stall: StallController,
    pending_rollback_tag: Option<SpecTag>,
}

impl FetchUnit {
    /// Creates a fetch unit starting at `start_pc`.
    #[must_use]
    pub fn new(start_pc: u64, fetch_block_bytes: usize, compressed: bool, xlen: Xlen) -> Self {
        Self {
            fetch_block_bytes: fetch_block_bytes as u64,
            compressed,
            xlen,
            pc: start_pc,
            req_fifo: VecDeque::new(),
            discard: 0,
            prev_half: None,
            queue: VecDeque::new(),
            stall: StallController::new(),
            pending_rollback_tag: None,
        }
    }

    fn block_of(&self, addr: u64) -> u64 {
        addr & !(self.fetch_block_bytes - 1)
    }

    /// Worst-case instructions one response can add to the queue.
    fn lanes_max(&self) -> usize {
        self.fetch_block_bytes as usize / 2 + 1
    }

    /// Takes the oldest fetched instruction.
    pub fn pop(&mut self) -> Option<FetchedInstr> {
        self.queue.pop_front()
    }

    /// True when no fetched instruction awaits decode.
    #[must_use]
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Address of the oldest instruction that has not entered the
    /// scheduler, falling back to the fetch pc. The interrupt coordinator
    /// records this as the resume point when the reorder buffer is empty.
    #[must_use]
    pub fn resume_pc(&self) -> u64 {
        self.queue.front().map_or(self.pc, |f| f.pc)
    }

    /// True when the unsafe stall bit is set.
    #[must_use]
    pub fn stalled_unsafe(&self) -> bool {
        self.stall.stalled_unsafe()
    }

    /// Advances fetch by one cycle.
    pub fn tick(&mut self, icache: &mut ICache, exception_stalled: bool) {
        // S1/S2: consume at most one response.
        if self.discard > 0 {
            if icache.accept_res().is_some() {
                self.discard -= 1;
            }
        } else if self.queue.len() + self.lanes_max() <= QUEUE_DEPTH {
            if let Some(resp) = icache.accept_res() {
                self.process_block(&resp);
            }
        }

        // S0: issue the next block.
        if !self.stall.is_stalled(exception_stalled)
            && self.req_fifo.len() < REQ_DEPTH
            && icache.can_issue()
        {
            let block = self.block_of(self.pc);
            icache.issue_req(block);
            self.req_fifo.push_back(self.pc);
            self.pc = block + self.fetch_block_bytes;
        }
    }

    fn process_block(&mut self, resp: &CacheResponse) {
        let start = self.req_fifo.pop_front().expect("response without a request");
        debug_assert_eq!(self.block_of(start), resp.addr);

        if resp.error {
            self.emit_fault(start, ExceptionCause::InstrAccessFault);
            return;
        }
        if !self.compressed && start % 4 != 0 {
            self.emit_fault(start, ExceptionCause::InstrAddrMisaligned);
            return;
        }

        let bytes = resp.fetch_block.to_le_bytes();
        let block_len = self.fetch_block_bytes as usize;
        let mut pos = (start - resp.addr) as usize;

        // A 32-bit instruction split across blocks completes here.
        if let Some(half) = self.prev_half.take() {
            debug_assert_eq!(half.pc + 2, resp.addr + pos as u64);
            let hi = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            let raw = u32::from(half.parcel) | (u32::from(hi) << 16);
            pos += 2;
            if !self.emit(raw, half.pc, half.pc + 4) {
                return;
            }
        }

        while pos < block_len {
            let pc = resp.addr + pos as u64;
            let lo = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            if self.compressed && lo & 0b11 != 0b11 {
                let raw = rvc::expand(lo, self.xlen);
                pos += 2;
                if !self.emit(raw, pc, pc + 2) {
                    return;
                }
            } else if pos + 4 <= block_len {
                let hi = u16::from_le_bytes([bytes[pos + 2], bytes[pos + 3]]);
                let raw = u32::from(lo) | (u32::from(hi) << 16);
                pos += 4;
                if !self.emit(raw, pc, pc + 4) {
                    return;
                }
            } else {
                self.prev_half = Some(PrevHalf { pc, parcel: lo });
                break;
            }
        }
    }

    /// Queues one instruction and steers fetch. Returns false when the
    /// rest of the block must be discarded.
    fn emit(&mut self, raw: u32, pc: u64, next_pc: u64) -> bool {
        let pre = predecode(raw);
        let action = check(&pre, pc);
        let pred_taken = matches!(action, CheckAction::Redirect { taken: true, .. });
        self.queue.push_back(FetchedInstr {
            raw,
            pc,
            next_pc,
            pred_taken,
            rollback_tag: self.pending_rollback_tag.take(),
            cause: None,
        });
        match action {
            CheckAction::Continue => true,
            CheckAction::Redirect { target, .. } => {
                self.steer(target);
                false
            }
            CheckAction::Stall => {
                self.stall.stall_unsafe();
                self.flush_requests();
                self.prev_half = None;
                false
            }
        }
    }

    fn emit_fault(&mut self, pc: u64, cause: ExceptionCause) {
        self.queue.push_back(FetchedInstr {
            raw: 0,
            pc,
            next_pc: pc + 4,
            pred_taken: false,
            rollback_tag: self.pending_rollback_tag.take(),
            cause: Some(cause),
        });
        // Nothing sensible follows a broken fetch; hold until the trap
        // flush (or a rollback, if this turns out to be wrong-path).
        self.stall.stall_unsafe();
        self.flush_requests();
        self.prev_half = None;
    }

    fn steer(&mut self, target: u64) {
        self.pc = target;
        self.flush_requests();
        self.prev_half = None;
    }

    fn flush_requests(&mut self) {
        self.discard += self.req_fifo.len();
        self.req_fifo.clear();
    }

    /// Rollback redirect: restart fetch at `target`, marking the first
    /// new instruction with the rollback target tag. The fetched queue is
    /// dropped; any pending unsafe stall belonged to the wrong path.
    pub fn redirect_rollback(&mut self, target: u64, tag: SpecTag) {
        self.queue.clear();
        self.flush_requests();
        self.prev_half = None;
        self.stall.resume_from_flush();
        self.pc = target;
        self.pending_rollback_tag = Some(tag);
    }

    /// An unsafe instruction resolved with successor `target`.
    pub fn resume_unsafe(&mut self, target: u64, exception_stalled: bool) {
        if self.stall.resume_from_unsafe(exception_stalled) {
            self.flush_requests();
            self.prev_half = None;
            self.pc = target;
        }
    }

    /// Hard flush resume (trap entry, interrupt handler, MRET return):
    /// discard everything and restart at `target`.
    pub fn resume_from_flush(&mut self, target: u64) {
        self.queue.clear();
        self.flush_requests();
        self.prev_half = None;
        self.stall.resume_from_flush();
        self.pending_rollback_tag = None;
        self.pc = target;
    }

    /// Interrupt entry: discard everything and hold fetch until the jump
    /// to the handler.
    pub fn halt(&mut self) {
        self.queue.clear();
        self.flush_requests();
        self.prev_half = None;
        self.stall.stall_unsafe();
    }
}
