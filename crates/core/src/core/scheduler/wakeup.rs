//! Wakeup-select.
//!
//! Pairs each reservation station with its functional unit: every cycle,
//! if the unit can accept work, the oldest ready entry is drained from
//! the station and issued. One issue per unit per cycle.

use crate::core::structs::ReservationStation;
use crate::fu::FuncUnit;

/// Issues from each station to its paired unit.
///
/// # Panics
///
/// Panics (in debug builds) when the pairing is uneven; station `i`
/// always feeds unit `i`.
pub fn issue_ready(stations: &mut [ReservationStation], units: &mut [&mut dyn FuncUnit]) {
    debug_assert_eq!(stations.len(), units.len());
    for (rs, fu) in stations.iter_mut().zip(units.iter_mut()) {
        if !fu.can_issue() {
            continue;
        }
        if let Some(entry) = rs.take_ready() {
            fu.issue(entry);
        }
    }
}
