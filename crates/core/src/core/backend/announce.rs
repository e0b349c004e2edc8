//! Result announcement.
//!
//! All functional units share one result bus: at most one completion is
//! drained per cycle, round-robin across the units so no unit starves.
//! Announcing a result marks the reorder buffer slot done, writes the
//! register file, and wakes waiting reservation station operands in the
//! same cycle.
//!
//! Invalidated instructions announce too. Their register write is
//! harmless (the register is recycled when they retire inactive) and
//! keeps wrong-path dependency chains draining, but their exception
//! reports are dropped so a wrong-path fault can never stall fetch or
//! reach retirement.

use crate::core::backend::exception::{ExceptionRegister, PendingException};
use crate::core::structs::{CheckpointRat, RegFile, ReservationStation, Rob};
use crate::fu::FuncUnit;

/// The result bus arbiter.
#[derive(Debug, Default)]
pub struct Announcer {
    next: usize,
}

impl Announcer {
    /// Creates the arbiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains at most one completion from `units`.
    pub fn tick(
        &mut self,
        units: &mut [&mut dyn FuncUnit],
        rob: &mut Rob,
        rf: &mut RegFile,
        stations: &mut [ReservationStation],
        crat: &CheckpointRat,
        ecr: &mut ExceptionRegister,
    ) {
        let count = units.len();
        for offset in 0..count {
            let idx = (self.next + offset) % count;
            let Some(result) = units[idx].take_result() else { continue };
            self.next = (idx + 1) % count;

            rob.mark_done(result.rob_id, result.exception.is_some());
            if let Some(exc) = result.exception {
                if crat.is_active(result.tag) {
                    ecr.report(
                        rob,
                        PendingException {
                            cause: exc.cause,
                            rob_id: result.rob_id,
                            pc: result.pc,
                            mtval: exc.mtval,
                        },
                    );
                }
            }
            if !result.rp_dst.is_zero() {
                rf.write(result.rp_dst, result.value);
                for station in stations.iter_mut() {
                    station.update(result.rp_dst, result.value);
                }
            }
            return;
        }
    }
}
