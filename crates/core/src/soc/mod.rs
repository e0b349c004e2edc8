//! Bus interface and test memory.
//!
//! The core talks to the outside world over a word-granular
//! request/response channel: 64-bit data words addressed by word index,
//! with a byte-select mask on writes. Multi-beat cache line fills are
//! plain sequential word reads.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use crate::common::BusError;

/// Word size of the bus in bytes.
pub const BUS_WORD_BYTES: u64 = 8;

/// The request/response memory channel.
pub trait CoreBus {
    /// Reads one bus word. `word_addr` is a word index (byte address
    /// divided by [`BUS_WORD_BYTES`]).
    fn read(&mut self, word_addr: u64) -> Result<u64, BusError>;

    /// Writes the byte lanes selected by `sel` (bit `i` enables byte `i`)
    /// of one bus word.
    fn write(&mut self, word_addr: u64, data: u64, sel: u8) -> Result<(), BusError>;
}

impl<T: CoreBus> CoreBus for Rc<RefCell<T>> {
    fn read(&mut self, word_addr: u64) -> Result<u64, BusError> {
        self.borrow_mut().read(word_addr)
    }

    fn write(&mut self, word_addr: u64, data: u64, sel: u8) -> Result<(), BusError> {
        self.borrow_mut().write(word_addr, data, sel)
    }
}

/// Flat little-endian memory with configurable faulting ranges, for
/// tests and demos.
#[derive(Debug)]
pub struct TestMemory {
    base: u64,
    data: Vec<u8>,
    /// Byte-address ranges that answer with a bus error.
    error_ranges: Vec<Range<u64>>,
}

impl TestMemory {
    /// Creates `size` bytes of zeroed memory starting at byte address
    /// `base` (word-aligned).
    #[must_use]
    pub fn new(base: u64, size: usize) -> Self {
        assert_eq!(base % BUS_WORD_BYTES, 0);
        Self { base, data: vec![0; size], error_ranges: Vec::new() }
    }

    /// Marks a byte-address range as faulting.
    pub fn add_error_range(&mut self, range: Range<u64>) {
        self.error_ranges.push(range);
    }

    /// Copies 32-bit little-endian words (a program image) to `addr`.
    pub fn load_words(&mut self, addr: u64, words: &[u32]) {
        for (i, w) in words.iter().enumerate() {
            self.store_bytes(addr + 4 * i as u64, &w.to_le_bytes());
        }
    }

    /// Copies 16-bit little-endian parcels to `addr`; used to lay out
    /// compressed code.
    pub fn load_parcels(&mut self, addr: u64, parcels: &[u16]) {
        for (i, p) in parcels.iter().enumerate() {
            self.store_bytes(addr + 2 * i as u64, &p.to_le_bytes());
        }
    }

    fn store_bytes(&mut self, addr: u64, bytes: &[u8]) {
        let off = (addr - self.base) as usize;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
    }

    /// Reads one byte directly, bypassing the bus.
    #[must_use]
    pub fn peek_byte(&self, addr: u64) -> u8 {
        self.data[(addr - self.base) as usize]
    }

    fn check(&self, word_addr: u64) -> Result<usize, BusError> {
        let addr = word_addr * BUS_WORD_BYTES;
        if self.error_ranges.iter().any(|r| r.contains(&addr)) {
            return Err(BusError::AccessFault { addr });
        }
        if addr < self.base || addr + BUS_WORD_BYTES > self.base + self.data.len() as u64 {
            return Err(BusError::AccessFault { addr });
        }
        Ok((addr - self.base) as usize)
    }
}

impl CoreBus for TestMemory {
    fn read(&mut self, word_addr: u64) -> Result<u64, BusError> {
        let off = self.check(word_addr)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[off..off + 8]);
        Ok(u64::from_le_bytes(bytes))
    }

    fn write(&mut self, word_addr: u64, data: u64, sel: u8) -> Result<(), BusError> {
        let off = self.check(word_addr)?;
        let bytes = data.to_le_bytes();
        for lane in 0..8 {
            if sel & (1 << lane) != 0 {
                self.data[off + lane] = bytes[lane];
            }
        }
        Ok(())
    }
}
