//! Frontend stall controller.
//!
//! Fetch stops for two reasons: an unsafe instruction whose successor
//! address is unknown until it executes (JALR, CSR accesses, MRET, WFI,
//! FENCE.I), and a reported exception that will flush the pipeline
//! anyway. The unsafe stall is a stored bit, set here and cleared by the
//! resolving unit's resume. The exception stall is not stored: it is
//! derived each cycle from the exception register and retirement state,
//! so clearing those lifts it without an extra handshake.

/// The stored-stall half of the frontend stall logic.
#[derive(Debug, Default)]
pub struct StallController {
    stalled_unsafe: bool,
}

impl StallController {
    /// Creates an unstalled controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when fetch must hold, given the live exception stall.
    #[must_use]
    pub fn is_stalled(&self, exception_stalled: bool) -> bool {
        self.stalled_unsafe || exception_stalled
    }

    /// True when the unsafe bit is set.
    #[must_use]
    pub fn stalled_unsafe(&self) -> bool {
        self.stalled_unsafe
    }

    /// Stops fetch behind an unsafe instruction.
    pub fn stall_unsafe(&mut self) {
        self.stalled_unsafe = true;
    }

    /// Resolved unsafe instruction: clears the unsafe bit. Returns true
    /// when fetch may actually redirect and resume; a live exception
    /// stall swallows the redirect, since the trap flush will supply its
    /// own resume address.
    ///
    /// # Panics
    ///
    /// Panics when no unsafe stall was pending; a resume must match a
    /// stall.
    pub fn resume_from_unsafe(&mut self, exception_stalled: bool) -> bool {
        assert!(self.stalled_unsafe, "resume without a pending unsafe stall");
        self.stalled_unsafe = false;
        !exception_stalled
    }

    /// Hard flush resume (trap entry or interrupt): unconditionally
    /// clears the unsafe bit.
    pub fn resume_from_flush(&mut self) {
        self.stalled_unsafe = false;
    }
}
