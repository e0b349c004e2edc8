//! Backend: result announcement, exception tracking, retirement, and
//! interrupt entry.

pub mod announce;
pub mod exception;
pub mod interrupt;
pub mod retire;

pub use announce::Announcer;
pub use exception::{ExceptionRegister, PendingException};
pub use interrupt::{IntAction, InterruptCoordinator};
pub use retire::{RetireFsm, Retirement};
