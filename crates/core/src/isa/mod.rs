//! Instruction set support.
//!
//! This module covers everything between raw fetched bits and the renamed
//! micro-operation the scheduler consumes:
//! 1. **Classification:** [`OpType`] groups instructions by the functional
//!    unit that executes them.
//! 2. **Decode:** RV32/RV64 IMC + Zicsr + Zifencei to [`DecodedInstr`].
//! 3. **Compression:** RVC expansion of 16-bit parcels.
//! 4. **CSRs:** the machine-mode register file with read-only bit masks.

/// Machine-mode control and status registers.
pub mod csr;
/// Instruction decoder.
pub mod decode;
/// Major opcode and function-field constants.
pub mod opcodes;
/// Operation classification for functional unit routing.
pub mod optype;
/// Compressed (RVC) instruction expansion.
pub mod rvc;

pub use decode::{DecodedInstr, InstrDecoder};
pub use optype::OpType;
