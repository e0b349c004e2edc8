//! Asynchronous interrupt entry: the in-flight window drains, younger
//! work is discarded without committing, and MRET resumes the
//! interrupted code.

use crate::common::{TestContext, TRAP_VECTOR};
use o3sim_core::common::InterruptCause;
use o3sim_core::isa::csr::addr;
use pretty_assertions::assert_eq;

/// Enables machine interrupts then runs an addi chain into a self-loop.
fn interruptible_program() -> TestContext {
    TestContext::default()
        .load_program(
            0x1000,
            &[
                0x3004_6073, // csrrsi x0, mstatus, 8  (MIE)
                0x0800_0293, // addi   x5, x0, 0x80
                0x3042_A073, // csrrs  x0, mie, x5     (MTIE)
                0x0010_0093, // addi   x1, x0, 1
                0x0010_8113, // addi   x2, x1, 1
                0x0011_0193, // addi   x3, x2, 1
                0x0000_006F, // jal    x0, 0
            ],
        )
        .load_program(
            TRAP_VECTOR,
            &[
                0x0010_0513, // addi x10, x0, 1
                0x3020_0073, // mret
            ],
        )
}

#[test]
fn timer_interrupt_drains_then_enters_the_handler() {
    let mut ctx = interruptible_program();
    ctx.run_until(3000, |core| core.reg(3) == 3);

    ctx.core.raise_interrupt(InterruptCause::MachineTimer);
    ctx.run_until(2000, |core| core.stats.interrupts == 1);
    ctx.core.clear_interrupt(InterruptCause::MachineTimer);

    // The handler runs and returns into the parked loop.
    ctx.run_until(2000, |core| core.reg(10) == 1);
    assert_eq!(ctx.reg(1), 1);
    assert_eq!(ctx.reg(2), 2);
    assert_eq!(ctx.reg(3), 3);
    assert_eq!(ctx.csr(addr::MCAUSE), InterruptCause::MachineTimer.mcause(64));
    // The loop parks at 0x1018; the interrupted pc is saved there.
    assert_eq!(ctx.csr(addr::MEPC), 0x1018);
    assert_eq!(ctx.core.stats.interrupts, 1);
}

#[test]
fn masked_interrupts_are_ignored() {
    // MIE never set: the pending bit must not disturb execution.
    let mut ctx = TestContext::default().load_program(
        0x1000,
        &[
            0x0010_0093, // addi x1, x0, 1
            0x0010_8113, // addi x2, x1, 1
            0x0000_006F, // jal  x0, 0
        ],
    );
    ctx.core.raise_interrupt(InterruptCause::MachineTimer);
    ctx.run_until(1000, |core| core.reg(2) == 2);
    assert_eq!(ctx.core.stats.interrupts, 0);
}

#[test]
fn interrupt_with_an_empty_window_resumes_at_the_next_fetch() {
    // Raise the interrupt while the machine spins on the self-loop; the
    // window drains to the looping jump, which is where mepc lands.
    let mut ctx = interruptible_program();
    ctx.run_until(3000, |core| core.reg(3) == 3);
    ctx.run(50);

    ctx.core.raise_interrupt(InterruptCause::MachineTimer);
    ctx.run_until(2000, |core| core.stats.interrupts == 1);
    ctx.core.clear_interrupt(InterruptCause::MachineTimer);
    assert_eq!(ctx.csr(addr::MEPC), 0x1018);

    ctx.run_until(2000, |core| core.reg(10) == 1);
    // After MRET the loop keeps spinning; nothing was lost.
    assert_eq!(ctx.reg(3), 3);
}
