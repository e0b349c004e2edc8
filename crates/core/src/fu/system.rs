//! System unit: CSR accesses, privileged instructions and exception
//! carriers.
//!
//! Everything here except decode-time exception carriers was flagged
//! unsafe at fetch, so the frontend is stalled while the instruction is
//! in flight. CSR accesses and MRET additionally wait for retirement's
//! precommit before touching machine state, then resume the frontend at
//! the right address. ECALL/EBREAK and carried faults complete as
//! exceptions and leave resumption to the trap flush.

use crate::common::{ExceptionCause, SpecTag};
use crate::core::structs::RsEntry;
use crate::fu::{exception_of, result_of, CtrlEvent, FuResult, FuncUnit, Precommit};
use crate::isa::csr::CsrFile;
use crate::isa::opcodes::funct3;
use crate::isa::OpType;

#[derive(Debug)]
enum SysState {
    Idle,
    Pending(RsEntry),
    /// A state-changing instruction waiting for retirement to reach it.
    WaitCommit(RsEntry),
}

/// The system unit.
#[derive(Debug)]
pub struct SystemUnit {
    state: SysState,
    done: Option<FuResult>,
    events: Vec<(SpecTag, CtrlEvent)>,
}

impl SystemUnit {
    #[must_use]
    pub fn new() -> Self {
        Self { state: SysState::Idle, done: None, events: Vec::new() }
    }

    /// Drains the steering events raised since the last call.
    pub fn take_events(&mut self) -> Vec<(SpecTag, CtrlEvent)> {
        std::mem::take(&mut self.events)
    }

    fn carried_exception(entry: &RsEntry) -> FuResult {
        let cause = entry.cause.unwrap_or(ExceptionCause::IllegalInstruction);
        let mtval = match cause {
            ExceptionCause::InstrAddrMisaligned
            | ExceptionCause::InstrAccessFault
            | ExceptionCause::Breakpoint => entry.pc,
            _ => 0,
        };
        exception_of(entry, cause, mtval)
    }

    fn csr_access(&mut self, entry: &RsEntry, csr: &mut CsrFile) -> FuResult {
        let operand =
            if entry.op == OpType::CsrImm { entry.imm as u64 } else { entry.s1_val };
        let Some(old) = csr.read(entry.csr) else {
            return exception_of(entry, ExceptionCause::IllegalInstruction, 0);
        };
        let f3 = u32::from(entry.funct3);
        let write = match f3 {
            funct3::CSRRW | funct3::CSRRWI => Some(operand),
            _ if operand == 0 => None,
            funct3::CSRRS | funct3::CSRRSI => Some(old | operand),
            _ => Some(old & !operand),
        };
        if let Some(value) = write {
            if !csr.write(entry.csr, value) {
                return exception_of(entry, ExceptionCause::IllegalInstruction, 0);
            }
        }
        self.events.push((entry.tag, CtrlEvent::ResumeUnsafe { pc: entry.next_pc }));
        result_of(entry, old)
    }

    /// Executes the pending instruction; `precommit` is retirement's
    /// current head view.
    pub fn tick(&mut self, csr: &mut CsrFile, precommit: Option<Precommit>) {
        if self.done.is_some() {
            return;
        }
        match std::mem::replace(&mut self.state, SysState::Idle) {
            SysState::Idle => {}
            SysState::Pending(entry) => match entry.op {
                OpType::Exception => self.done = Some(Self::carried_exception(&entry)),
                OpType::Ecall => {
                    self.done = Some(exception_of(&entry, ExceptionCause::EcallM, 0));
                }
                OpType::Ebreak => {
                    self.done = Some(exception_of(&entry, ExceptionCause::Breakpoint, entry.pc));
                }
                OpType::Wfi => {
                    // Modeled as a no-op: resume immediately.
                    self.events.push((entry.tag, CtrlEvent::ResumeUnsafe { pc: entry.next_pc }));
                    self.done = Some(result_of(&entry, 0));
                }
                OpType::FenceI => {
                    self.events.push((entry.tag, CtrlEvent::FlushICache));
                    self.events.push((entry.tag, CtrlEvent::ResumeUnsafe { pc: entry.next_pc }));
                    self.done = Some(result_of(&entry, 0));
                }
                OpType::CsrReg | OpType::CsrImm | OpType::Mret => {
                    self.state = SysState::WaitCommit(entry);
                }
                op => unreachable!("system unit issued op {op:?}"),
            },
            SysState::WaitCommit(entry) => match precommit {
                Some(p) if p.rob_id == entry.rob_id => {
                    if !p.side_fx {
                        self.done = Some(result_of(&entry, 0));
                    } else if entry.op == OpType::Mret {
                        let resume = csr.trap_return();
                        self.events.push((entry.tag, CtrlEvent::Iret));
                        self.events.push((entry.tag, CtrlEvent::ResumeUnsafe { pc: resume }));
                        self.done = Some(result_of(&entry, 0));
                    } else {
                        self.done = Some(self.csr_access(&entry, csr));
                    }
                }
                _ => self.state = SysState::WaitCommit(entry),
            },
        }
    }
}

impl Default for SystemUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl FuncUnit for SystemUnit {
    fn can_issue(&self) -> bool {
        matches!(self.state, SysState::Idle) && self.done.is_none()
    }

    fn issue(&mut self, entry: RsEntry) {
        self.state = SysState::Pending(entry);
    }

    fn take_result(&mut self) -> Option<FuResult> {
        self.done.take()
    }

    fn clear(&mut self) {
        self.state = SysState::Idle;
        self.done = None;
        self.events.clear();
    }
}
