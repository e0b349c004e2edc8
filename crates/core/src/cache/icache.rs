//! Instruction cache.
//!
//! Set-associative, virtually none of the complexity of a data cache:
//! read-only, one outstanding request, one response slot. The address
//! splits as {tag | index | offset}. A lookup takes one cycle; a miss
//! starts the refiller and the response is produced on the final beat.
//! Lines that refilled with a bus error are reported but never marked
//! valid, so later fetches of the same line re-miss and retry the bus.
//!
//! Replacement rotates a single global victim pointer on each completed
//! refill. Fills are rare relative to lookups, so fairness per set is
//! not worth the state.

use tracing::{debug, trace};

use crate::cache::refiller::Refiller;
use crate::config::IcacheConfig;
use crate::soc::{CoreBus, BUS_WORD_BYTES};
use crate::stats::SimStats;

/// One answered fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheResponse {
    /// The requested fetch block address.
    pub addr: u64,
    /// Fetch block bytes, little-endian in the low bytes.
    pub fetch_block: u64,
    /// The backing refill hit a bus error; the block bytes are garbage.
    pub error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheState {
    /// Sweeping valid bits, one set per cycle.
    Flush { remaining: usize },
    Lookup,
    Refill,
}

#[derive(Debug, Clone)]
struct Way {
    tags: Vec<u64>,
    valid: Vec<bool>,
    data: Vec<Vec<u8>>,
}

/// The instruction cache.
#[derive(Debug)]
pub struct ICache {
    ways: Vec<Way>,
    sets: usize,
    line_bytes: usize,
    fetch_block_bytes: usize,
    offset_bits: u32,
    index_bits: u32,

    state: CacheState,
    /// Victim way for the next fill.
    victim: usize,

    req: Option<u64>,
    resp: Option<CacheResponse>,
    flush_requested: bool,

    refiller: Refiller,
    refill_buf: Vec<u8>,
    refill_error: bool,
}

impl ICache {
    /// Creates an empty cache with the given geometry.
    #[must_use]
    pub fn new(cfg: &IcacheConfig, fetch_block_bytes: usize) -> Self {
        let way = Way {
            tags: vec![0; cfg.sets],
            valid: vec![false; cfg.sets],
            data: vec![vec![0; cfg.line_bytes]; cfg.sets],
        };
        Self {
            ways: vec![way; cfg.ways],
            sets: cfg.sets,
            line_bytes: cfg.line_bytes,
            fetch_block_bytes,
            offset_bits: cfg.offset_bits(),
            index_bits: cfg.index_bits(),
            state: CacheState::Lookup,
            victim: 0,
            req: None,
            resp: None,
            flush_requested: false,
            refiller: Refiller::new(cfg.line_bytes),
            refill_buf: vec![0; cfg.line_bytes],
            refill_error: false,
        }
    }

    fn index(&self, addr: u64) -> usize {
        ((addr >> self.offset_bits) & ((1 << self.index_bits) - 1)) as usize
    }

    fn tag(&self, addr: u64) -> u64 {
        addr >> (self.offset_bits + self.index_bits)
    }

    fn line_addr(&self, addr: u64) -> u64 {
        addr & !(self.line_bytes as u64 - 1)
    }

    /// True when a fetch request can be accepted this cycle.
    #[must_use]
    pub fn can_issue(&self) -> bool {
        self.state == CacheState::Lookup
            && !self.flush_requested
            && self.req.is_none()
            && self.resp.is_none()
    }

    /// Captures one fetch block request.
    ///
    /// # Panics
    ///
    /// Panics when the cache is not ready; callers gate on
    /// [`Self::can_issue`].
    pub fn issue_req(&mut self, addr: u64) {
        assert!(self.can_issue(), "request issued to a busy cache");
        debug_assert_eq!(addr % self.fetch_block_bytes as u64, 0);
        self.req = Some(addr);
    }

    /// Takes the answered request, if one is ready.
    pub fn accept_res(&mut self) -> Option<CacheResponse> {
        self.resp.take()
    }

    /// Requests an invalidation sweep. Takes effect once the in-flight
    /// request (if any) has been answered, then holds off new requests
    /// for one cycle per set.
    pub fn flush(&mut self) {
        self.flush_requested = true;
    }

    /// Advances the cache by one cycle.
    pub fn tick(&mut self, bus: &mut dyn CoreBus, stats: &mut SimStats) {
        match self.state {
            CacheState::Flush { remaining } => {
                let set = self.sets - remaining;
                for way in &mut self.ways {
                    way.valid[set] = false;
                }
                self.state = if remaining == 1 {
                    CacheState::Lookup
                } else {
                    CacheState::Flush { remaining: remaining - 1 }
                };
            }
            CacheState::Lookup => {
                if self.flush_requested && self.req.is_none() && self.resp.is_none() {
                    self.flush_requested = false;
                    self.state = CacheState::Flush { remaining: self.sets };
                    return;
                }
                let Some(addr) = self.req else { return };
                if self.resp.is_some() {
                    return;
                }
                let index = self.index(addr);
                let tag = self.tag(addr);
                let hit = self.ways.iter().find(|w| w.valid[index] && w.tags[index] == tag);
                if let Some(way) = hit {
                    let block = extract_block(
                        &way.data[index],
                        addr,
                        self.line_bytes,
                        self.fetch_block_bytes,
                    );
                    self.resp = Some(CacheResponse { addr, fetch_block: block, error: false });
                    self.req = None;
                    stats.icache_hits += 1;
                } else {
                    stats.icache_misses += 1;
                    trace!(line = self.line_addr(addr), "miss, starting refill");
                    self.refill_error = false;
                    self.refiller.start(self.line_addr(addr));
                    self.state = CacheState::Refill;
                }
            }
            CacheState::Refill => {
                let Some(beat) = self.refiller.tick(bus) else { return };
                if beat.error {
                    self.refill_error = true;
                } else {
                    let off = (beat.addr as usize) & (self.line_bytes - 1);
                    self.refill_buf[off..off + BUS_WORD_BYTES as usize]
                        .copy_from_slice(&beat.data.to_le_bytes());
                }
                if beat.last {
                    let addr = self.req.take().expect("refill without a request");
                    let index = self.index(addr);
                    if self.refill_error {
                        stats.icache_refill_errors += 1;
                        debug!(line = self.line_addr(addr), "refill hit a bus error");
                    } else {
                        let tag = self.tag(addr);
                        let way = &mut self.ways[self.victim];
                        way.tags[index] = tag;
                        way.valid[index] = true;
                        way.data[index].copy_from_slice(&self.refill_buf);
                        trace!(line = self.line_addr(addr), way = self.victim, "line filled");
                        self.victim = (self.victim + 1) % self.ways.len();
                    }
                    let block = extract_block(
                        &self.refill_buf,
                        addr,
                        self.line_bytes,
                        self.fetch_block_bytes,
                    );
                    self.resp = Some(CacheResponse {
                        addr,
                        fetch_block: block,
                        error: self.refill_error,
                    });
                    self.state = CacheState::Lookup;
                }
            }
        }
    }
}

fn extract_block(line: &[u8], addr: u64, line_bytes: usize, block_bytes: usize) -> u64 {
    let off = (addr as usize) & (line_bytes - 1);
    let mut bytes = [0u8; 8];
    bytes[..block_bytes].copy_from_slice(&line[off..off + block_bytes]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::TestMemory;
    use pretty_assertions::assert_eq;

    fn cfg() -> IcacheConfig {
        IcacheConfig { ways: 2, sets: 4, line_bytes: 32 }
    }

    fn mem() -> TestMemory {
        let mut m = TestMemory::new(0x1000, 0x1000);
        let words: Vec<u32> = (0..0x400).map(|i| 0x1000_0000 + i).collect();
        m.load_words(0x1000, &words);
        m
    }

    fn run_until_response(
        cache: &mut ICache,
        mem: &mut TestMemory,
        stats: &mut SimStats,
    ) -> CacheResponse {
        for _ in 0..64 {
            cache.tick(mem, stats);
            if let Some(resp) = cache.accept_res() {
                return resp;
            }
        }
        panic!("no response");
    }

    #[test]
    fn miss_refills_then_hits() {
        let mut mem = mem();
        let mut stats = SimStats::new();
        let mut cache = ICache::new(&cfg(), 8);

        cache.issue_req(0x1040);
        let resp = run_until_response(&mut cache, &mut mem, &mut stats);
        assert!(!resp.error);
        assert_eq!(resp.fetch_block, 0x1000_0011_1000_0010);
        assert_eq!(stats.icache_misses, 1);

        // Same line again: single-cycle hit.
        assert!(cache.can_issue());
        cache.issue_req(0x1048);
        cache.tick(&mut mem, &mut stats);
        let resp = cache.accept_res().unwrap();
        assert_eq!(resp.fetch_block, 0x1000_0013_1000_0012);
        assert_eq!(stats.icache_hits, 1);
    }

    #[test]
    fn erroring_line_is_not_validated() {
        let mut mem = mem();
        mem.add_error_range(0x1060..0x1080);
        let mut stats = SimStats::new();
        let mut cache = ICache::new(&cfg(), 8);

        cache.issue_req(0x1060);
        let resp = run_until_response(&mut cache, &mut mem, &mut stats);
        assert!(resp.error);
        assert_eq!(stats.icache_refill_errors, 1);

        // The same address misses again instead of serving the bad line.
        cache.issue_req(0x1060);
        let resp = run_until_response(&mut cache, &mut mem, &mut stats);
        assert!(resp.error);
        assert_eq!(stats.icache_misses, 2);
    }

    #[test]
    fn flush_invalidates_every_set() {
        let mut mem = mem();
        let mut stats = SimStats::new();
        let mut cache = ICache::new(&cfg(), 8);

        cache.issue_req(0x1040);
        let _ = run_until_response(&mut cache, &mut mem, &mut stats);

        cache.flush();
        assert!(!cache.can_issue());
        // One cycle to accept the flush, then one per set.
        for _ in 0..5 {
            cache.tick(&mut mem, &mut stats);
        }
        assert!(cache.can_issue());

        cache.issue_req(0x1040);
        let _ = run_until_response(&mut cache, &mut mem, &mut stats);
        assert_eq!(stats.icache_misses, 2);
    }

    #[test]
    fn conflicting_lines_fill_both_ways_then_evict() {
        let mut mem = mem();
        let mut stats = SimStats::new();
        let mut cache = ICache::new(&cfg(), 8);

        // Three addresses mapping to set 0 (stride = sets * line_bytes).
        for addr in [0x1000u64, 0x1080, 0x1100] {
            cache.issue_req(addr);
            let _ = run_until_response(&mut cache, &mut mem, &mut stats);
        }
        assert_eq!(stats.icache_misses, 3);

        // The first line was evicted by the third fill.
        cache.issue_req(0x1080);
        let _ = run_until_response(&mut cache, &mut mem, &mut stats);
        assert_eq!(stats.icache_hits, 1);
        cache.issue_req(0x1000);
        let _ = run_until_response(&mut cache, &mut mem, &mut stats);
        assert_eq!(stats.icache_misses, 4);
    }
}
