pub mod harness;

pub use harness::{TestContext, TRAP_VECTOR};
