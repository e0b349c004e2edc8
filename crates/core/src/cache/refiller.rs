//! Cache line refiller.
//!
//! Fetches one line as sequential single-word bus reads, one beat per
//! cycle. A bus error truncates the fill: the erroring beat is delivered
//! with both `error` and `last` set and the refill ends there.

use crate::soc::{CoreBus, BUS_WORD_BYTES};

/// One delivered refill beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillBeat {
    /// Byte address of this word.
    pub addr: u64,
    /// The word read; zero on error.
    pub data: u64,
    /// The bus answered with an error.
    pub error: bool,
    /// Final beat of the refill.
    pub last: bool,
}

/// Single-outstanding line refiller.
#[derive(Debug)]
pub struct Refiller {
    words_per_line: usize,
    active: Option<Refill>,
}

#[derive(Debug)]
struct Refill {
    line_addr: u64,
    word: usize,
}

impl Refiller {
    /// Creates a refiller for `line_bytes`-sized lines.
    #[must_use]
    pub fn new(line_bytes: usize) -> Self {
        assert_eq!(line_bytes % BUS_WORD_BYTES as usize, 0);
        Self { words_per_line: line_bytes / BUS_WORD_BYTES as usize, active: None }
    }

    /// True when a new refill may start.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Begins refilling the line at `line_addr` (line-aligned).
    ///
    /// # Panics
    ///
    /// Panics when a refill is already in flight.
    pub fn start(&mut self, line_addr: u64) {
        assert!(self.active.is_none(), "refiller is single-outstanding");
        self.active = Some(Refill { line_addr, word: 0 });
    }

    /// Abandons the refill in flight, if any.
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Issues the next word read; `None` when idle.
    pub fn tick(&mut self, bus: &mut dyn CoreBus) -> Option<RefillBeat> {
        let refill = self.active.as_mut()?;
        let addr = refill.line_addr + refill.word as u64 * BUS_WORD_BYTES;
        let beat = match bus.read(addr / BUS_WORD_BYTES) {
            Ok(data) => {
                let last = refill.word + 1 == self.words_per_line;
                refill.word += 1;
                RefillBeat { addr, data, error: false, last }
            }
            Err(_) => RefillBeat { addr, data: 0, error: true, last: true },
        };
        if beat.last {
            self.active = None;
        }
        Some(beat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::TestMemory;
    use pretty_assertions::assert_eq;

    #[test]
    fn fills_a_line_one_word_per_cycle() {
        let mut mem = TestMemory::new(0x1000, 0x100);
        mem.load_words(0x1020, &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);

        let mut refiller = Refiller::new(32);
        refiller.start(0x1020);
        assert!(!refiller.is_idle());

        let beats: Vec<RefillBeat> =
            std::iter::from_fn(|| refiller.tick(&mut mem)).collect();
        assert_eq!(beats.len(), 4);
        assert_eq!(beats[0].addr, 0x1020);
        assert_eq!(beats[0].data, 0x0000_0022_0000_0011);
        assert!(beats[3].last);
        assert!(beats.iter().all(|b| !b.error));
        assert!(refiller.is_idle());
    }

    #[test]
    fn error_beat_ends_the_refill_early() {
        let mut mem = TestMemory::new(0x1000, 0x100);
        mem.add_error_range(0x1028..0x1030);

        let mut refiller = Refiller::new(32);
        refiller.start(0x1020);
        let first = refiller.tick(&mut mem).unwrap();
        assert!(!first.error);
        let second = refiller.tick(&mut mem).unwrap();
        assert!(second.error);
        assert!(second.last);
        assert!(refiller.is_idle());
    }
}
