//! Exception information register.
//!
//! Completions can report exceptions out of program order, but only the
//! oldest in-flight exception may take effect. This register keeps the
//! report belonging to the oldest reorder buffer slot; retirement acts on
//! it when that slot reaches the head. While the register is valid the
//! frontend holds fetch, which bounds the wrong-path work behind a fault.

use crate::common::{ExceptionCause, RobId};
use crate::core::structs::Rob;

/// One reported exception, waiting for its instruction to reach the
/// reorder buffer head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingException {
    /// Architectural cause.
    pub cause: ExceptionCause,
    /// Reorder buffer slot of the faulting instruction.
    pub rob_id: RobId,
    /// Faulting instruction address.
    pub pc: u64,
    /// Value for mtval.
    pub mtval: u64,
}

/// The exception information register.
#[derive(Debug, Default)]
pub struct ExceptionRegister {
    pending: Option<PendingException>,
}

impl ExceptionRegister {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a report, keeping whichever of the current and new report
    /// is older in program order. Age is measured from the reorder buffer
    /// start, so comparisons stay correct across ring wrap.
    pub fn report(&mut self, rob: &Rob, report: PendingException) {
        let keep_new = match self.pending {
            None => true,
            Some(current) => rob.age(report.rob_id) < rob.age(current.rob_id),
        };
        if keep_new {
            self.pending = Some(report);
        }
    }

    /// The currently held report, if any.
    #[must_use]
    pub fn get(&self) -> Option<PendingException> {
        self.pending
    }

    /// True when a report is held. Drives the frontend exception stall.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pending.is_some()
    }

    /// Discards the held report and lifts the fetch stall.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structs::{Rob, RobData};
    use pretty_assertions::assert_eq;

    fn report(id: RobId, cause: ExceptionCause) -> PendingException {
        PendingException { cause, rob_id: id, pc: 0x100, mtval: 0 }
    }

    #[test]
    fn oldest_report_wins() {
        let mut rob = Rob::new(8);
        let a = rob.put(RobData::default());
        let b = rob.put(RobData::default());

        let mut ecr = ExceptionRegister::new();
        ecr.report(&rob, report(b, ExceptionCause::LoadAccessFault));
        // The older instruction's report displaces the younger one.
        ecr.report(&rob, report(a, ExceptionCause::IllegalInstruction));
        assert_eq!(ecr.get().unwrap().rob_id, a);

        // A younger report leaves the older one in place.
        ecr.report(&rob, report(b, ExceptionCause::Breakpoint));
        assert_eq!(ecr.get().unwrap().cause, ExceptionCause::IllegalInstruction);
    }

    #[test]
    fn age_comparison_survives_ring_wrap() {
        let mut rob = Rob::new(4);
        // Advance the ring so allocation wraps: slots 3 then 0.
        for _ in 0..3 {
            let id = rob.put(RobData::default());
            rob.mark_done(id, false);
            let _ = rob.retire();
        }
        let old = rob.put(RobData::default());
        let young = rob.put(RobData::default());
        assert!(old.0 > young.0);

        let mut ecr = ExceptionRegister::new();
        ecr.report(&rob, report(young, ExceptionCause::Breakpoint));
        ecr.report(&rob, report(old, ExceptionCause::LoadAccessFault));
        assert_eq!(ecr.get().unwrap().rob_id, old);
    }

    #[test]
    fn clear_empties_the_register() {
        let mut rob = Rob::new(4);
        let a = rob.put(RobData::default());
        let mut ecr = ExceptionRegister::new();
        ecr.report(&rob, report(a, ExceptionCause::EcallM));
        assert!(ecr.is_valid());
        ecr.clear();
        assert!(!ecr.is_valid());
    }
}
