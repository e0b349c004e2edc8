//! End-to-end tests for the core model.
//!
//! Programs are raw RV32/RV64 encodings loaded into a flat test memory;
//! each test drives the core cycle by cycle and checks architectural
//! state through the committed alias table and the CSR file.

/// Shared harness: a core wired to a test memory with run helpers.
pub mod common;

/// Whole-pipeline scenarios, one module per concern.
mod pipeline;
