//! Frontend: fetch, predecode, and the stall logic between them.

pub mod fetch;
pub mod predecode;
pub mod stall;

pub use fetch::{FetchUnit, FetchedInstr};
pub use predecode::{check, predecode, CfiType, CheckAction, Predecoded};
pub use stall::StallController;
