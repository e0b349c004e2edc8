//! Misprediction rollback: checkpoint restore, wrong-path isolation, and
//! resource recycling across repeated rollbacks.

use crate::common::TestContext;
use pretty_assertions::assert_eq;

#[test]
fn mispredicted_branch_discards_the_wrong_path() {
    // The forward beq is predicted not-taken, so the clobbering addi is
    // fetched speculatively; the branch resolves taken and rolls it back.
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0050_0093, // addi x1, x0, 5
            0x0010_8463, // beq  x1, x1, +8
            0x0630_0093, // addi x1, x0, 99   (wrong path)
            0x0070_0113, // addi x2, x0, 7    (branch target)
            0x0000_006F, // jal  x0, 0
        ],
    );
    ctx.run_until(1000, |core| core.reg(2) == 7);
    assert_eq!(ctx.reg(1), 5);
    assert!(ctx.core.stats.rollbacks >= 1);
}

#[test]
fn repeated_rollbacks_recycle_tags_and_registers() {
    // Every iteration mispredicts the forward branch once. If a rollback
    // leaked a register, a tag, or a checkpoint slot, the loop would wedge
    // long before twenty iterations.
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0010_8093, // addi x1, x1, 1
            0x0000_0463, // beq  x0, x0, +8   (always taken, predicted not)
            0x0010_0F93, // addi x31, x0, 1   (wrong path)
            0xFE00_0AE3, // beq  x0, x0, -12  (back to the top)
        ],
    );
    ctx.run_until(20_000, |core| core.reg(1) >= 20);
    assert!(ctx.core.stats.rollbacks >= 20);
    // The wrong-path write never committed.
    assert_eq!(ctx.reg(31), 0);
}

#[test]
fn rollback_restores_the_renamed_map() {
    // x3 is read on the corrected path after the wrong path renamed it;
    // the checkpoint restore must bring back the pre-branch mapping.
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0110_0193, // addi x3, x0, 17
            0x0010_8463, // beq  x1, x1, +8
            0x0630_0193, // addi x3, x0, 99   (wrong path rename of x3)
            0x0001_8213, // addi x4, x3, 0    (branch target, reads x3)
            0x0000_006F, // jal  x0, 0
        ],
    );
    ctx.run_until(1000, |core| core.reg(4) != 0);
    assert_eq!(ctx.reg(3), 17);
    assert_eq!(ctx.reg(4), 17);
}
