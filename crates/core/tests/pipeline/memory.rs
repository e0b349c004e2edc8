//! Load/store traffic: stores hold until commit, loads forward the
//! written data, and faulting accesses trap with the offending address.

use crate::common::{TestContext, TRAP_VECTOR};
use o3sim_core::isa::csr::addr;
use pretty_assertions::assert_eq;

#[test]
fn store_then_load_round_trips_through_memory() {
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x02A0_0093, // addi x1, x0, 42
            0x0010_0293, // addi x5, x0, 1
            0x00C2_9293, // slli x5, x5, 12   (x5 = 0x1000)
            0x4012_A023, // sw   x1, 0x400(x5)
            0x4002_A303, // lw   x6, 0x400(x5)
        ],
    );
    ctx.run_until_retired(5, 1000);
    assert_eq!(ctx.reg(6), 42);
    assert_eq!(ctx.mem.peek_byte(0x1400), 42);
}

#[test]
fn store_to_an_unmapped_address_traps_with_the_address() {
    let mut ctx = TestContext::default()
        .load_program(
            0x1000,
            &[
                0x0050_0093, // addi x1, x0, 5
                0x0010_2023, // sw   x1, 0(x0)  (address 0 faults)
            ],
        )
        .load_program(
            TRAP_VECTOR,
            &[
                0x0010_0F93, // addi x31, x0, 1
                0x0000_006F, // jal  x0, 0
            ],
        );
    ctx.run_until(1000, |core| core.reg(31) == 1);
    assert_eq!(ctx.reg(1), 5);
    assert_eq!(ctx.csr(addr::MCAUSE), 7);
    assert_eq!(ctx.csr(addr::MEPC), 0x1004);
}

#[test]
fn wrong_path_store_never_reaches_memory() {
    // The store sits behind an always-taken forward branch; its data must
    // not land even though it was issued speculatively.
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0050_0093, // addi x1, x0, 5
            0x0010_0293, // addi x5, x0, 1
            0x00C2_9293, // slli x5, x5, 12
            0x0010_8463, // beq  x1, x1, +8
            0x4012_A023, // sw   x1, 0x400(x5)  (wrong path)
            0x0070_0113, // addi x2, x0, 7      (branch target)
            0x0000_006F, // jal  x0, 0
        ],
    );
    ctx.run_until(1000, |core| core.reg(2) == 7);
    ctx.run(100);
    assert_eq!(ctx.mem.peek_byte(0x1400), 0);
}
