//! Precise exception entry: older work commits, the faulting instruction
//! and everything younger is discarded, and the handler sees the cause.

use crate::common::{TestContext, TRAP_VECTOR};
use o3sim_core::isa::csr::addr;
use pretty_assertions::assert_eq;

const HANDLER_MARK: u32 = 0x0010_0F93; // addi x31, x0, 1
const SELF_LOOP: u32 = 0x0000_006F; // jal x0, 0

#[test]
fn illegal_instruction_traps_precisely() {
    let mut ctx = TestContext::default()
        .load_program(
            0x1000,
            &[
                0x0050_0093, // addi x1, x0, 5
                0x0000_0000, // illegal
                0x0630_0113, // addi x2, x0, 99 (younger, discarded)
            ],
        )
        .load_program(TRAP_VECTOR, &[HANDLER_MARK, SELF_LOOP]);

    ctx.run_until(1000, |core| core.reg(31) == 1);
    assert_eq!(ctx.reg(1), 5);
    assert_eq!(ctx.reg(2), 0);
    assert_eq!(ctx.core.stats.traps, 1);
    assert_eq!(ctx.csr(addr::MEPC), 0x1004);
    assert_eq!(ctx.csr(addr::MCAUSE), 2);
    assert_eq!(ctx.csr(addr::MTVAL), 0);
}

#[test]
fn ecall_raises_environment_call_from_machine_mode() {
    let mut ctx = TestContext::default()
        .load_program(
            0x1000,
            &[
                0x0050_0093, // addi x1, x0, 5
                0x0000_0073, // ecall
            ],
        )
        .load_program(TRAP_VECTOR, &[HANDLER_MARK, SELF_LOOP]);

    ctx.run_until(1000, |core| core.reg(31) == 1);
    assert_eq!(ctx.reg(1), 5);
    assert_eq!(ctx.csr(addr::MEPC), 0x1004);
    assert_eq!(ctx.csr(addr::MCAUSE), 11);
}

#[test]
fn oldest_exception_wins_over_a_younger_one() {
    // Both the load fault and the illegal instruction behind it report;
    // the trap must take the older cause and epc.
    let mut ctx = TestContext::default()
        .load_program(
            0x1000,
            &[
                0x0000_3083, // ld x1, 0(x0)   (address 0 faults)
                0x0000_0000, // illegal
            ],
        )
        .load_program(TRAP_VECTOR, &[HANDLER_MARK, SELF_LOOP]);

    ctx.run_until(1000, |core| core.reg(31) == 1);
    assert_eq!(ctx.csr(addr::MEPC), 0x1000);
    assert_eq!(ctx.csr(addr::MCAUSE), 5);
    assert_eq!(ctx.csr(addr::MTVAL), 0);
    assert_eq!(ctx.core.stats.traps, 1);
}

#[test]
fn embedded_register_count_traps_on_high_registers() {
    // With a 16-register file, x15 is the last legal register and x20
    // decodes as an illegal instruction.
    let mut config = TestContext::config();
    config.core.isa_reg_cnt = 16;
    let mut ctx = TestContext::new(config)
        .load_program(
            0x1000,
            &[
                0x0050_0793, // addi x15, x0, 5
                0x0010_0A13, // addi x20, x0, 1 (illegal here)
            ],
        )
        .load_program(
            TRAP_VECTOR,
            &[
                0x0010_0713, // addi x14, x0, 1
                SELF_LOOP,
            ],
        );

    ctx.run_until(1000, |core| core.reg(14) == 1);
    assert_eq!(ctx.reg(15), 5);
    assert_eq!(ctx.csr(addr::MEPC), 0x1004);
    assert_eq!(ctx.csr(addr::MCAUSE), 2);
    assert_eq!(ctx.core.stats.traps, 1);
}

#[test]
fn handler_advances_mepc_and_returns() {
    // The handler steps mepc past the ecall and returns; execution
    // continues with the instruction after the trap.
    let mut ctx = TestContext::default()
        .load_program(
            0x1000,
            &[
                0x0050_0093, // addi x1, x0, 5
                0x0000_0073, // ecall
                0x0070_0113, // addi x2, x0, 7
                SELF_LOOP,
            ],
        )
        .load_program(
            TRAP_VECTOR,
            &[
                0x3410_22F3, // csrrs x5, mepc, x0
                0x0042_8293, // addi  x5, x5, 4
                0x3412_9073, // csrrw x0, mepc, x5
                0x3020_0073, // mret
            ],
        );

    ctx.run_until(3000, |core| core.reg(2) == 7);
    assert_eq!(ctx.reg(1), 5);
    assert_eq!(ctx.reg(5), 0x1008);
    assert_eq!(ctx.core.stats.traps, 1);
}
