//! Straight-line execution through renaming and the ALU/muldiv units.

use crate::common::TestContext;
use pretty_assertions::assert_eq;

#[test]
fn dependent_alu_chain_commits_in_order() {
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0050_0093, // addi x1, x0, 5
            0x0070_8113, // addi x2, x1, 7
            0x0001_0193, // addi x3, x2, 0
        ],
    );
    ctx.run_until_retired(3, 500);
    assert_eq!(ctx.reg(1), 5);
    assert_eq!(ctx.reg(2), 12);
    assert_eq!(ctx.reg(3), 12);
}

#[test]
fn multiply_flows_through_the_long_latency_unit() {
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0050_0093, // addi x1, x0, 5
            0x0070_8113, // addi x2, x1, 7
            0x0220_80B3, // mul  x1, x1, x2
            0x0010_81B3, // add  x3, x1, x1
        ],
    );
    ctx.run_until_retired(4, 500);
    assert_eq!(ctx.reg(1), 60);
    assert_eq!(ctx.reg(3), 120);
}

#[test]
fn independent_instructions_overlap() {
    // Two independent chains; the second must not wait for the divide.
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0630_0093, // addi x1, x0, 99
            0x0070_0113, // addi x2, x0, 7
            0x0220_C1B3, // div  x3, x1, x2
            0x0010_0213, // addi x4, x0, 1
            0x0020_0293, // addi x5, x0, 2
        ],
    );
    ctx.run_until_retired(5, 500);
    assert_eq!(ctx.reg(3), 14);
    assert_eq!(ctx.reg(4), 1);
    assert_eq!(ctx.reg(5), 2);
}
