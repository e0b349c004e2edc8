//! Fetch-path scenarios: compressed code, block-straddling instructions,
//! and the FENCE.I cache flush.

use crate::common::TestContext;
use pretty_assertions::assert_eq;

#[test]
fn compressed_and_full_width_instructions_mix() {
    // c.li x1, 13 ; c.li x2, 2 ; add x3, x1, x2
    let mut ctx = TestContext::default()
        .load_parcels(0x1000, &[0x40B5, 0x4109])
        .load_program(0x1004, &[0x0020_81B3]);
    ctx.run_until_retired(3, 500);
    assert_eq!(ctx.reg(1), 13);
    assert_eq!(ctx.reg(2), 2);
    assert_eq!(ctx.reg(3), 15);
}

#[test]
fn instruction_straddling_a_fetch_block_executes_once() {
    // Four-byte fetch blocks, entry in the middle of the first block: the
    // 32-bit addi spans the 0x1004 boundary and is stitched from two
    // responses.
    let mut config = TestContext::config();
    config.frontend.fetch_block_bytes = 4;
    config.core.start_pc = 0x1002;
    let mut ctx = TestContext::new(config)
        .load_program(0x1002, &[0x1230_0093]) // addi x1, x0, 0x123
        .load_program(0x1006, &[0x0000_006F]); // jal x0, 0
    ctx.run_until(1000, |core| core.reg(1) != 0);
    assert_eq!(ctx.reg(1), 0x123);
}

#[test]
fn fence_i_flushes_and_execution_continues() {
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0050_0093, // addi x1, x0, 5
            0x0000_100F, // fence.i
            0x0070_8113, // addi x2, x1, 7
        ],
    );
    ctx.run_until_retired(3, 1000);
    assert_eq!(ctx.reg(2), 12);
    // The flush forced at least one refetch miss.
    assert!(ctx.core.stats.icache_misses >= 2);
}
