//! Multiply/divide unit (M extension).
//!
//! Fixed-latency and unpipelined: one operation occupies the unit for the
//! configured multiply or divide latency, then the result waits in the
//! output slot. Division follows the architectural corner cases (divide
//! by zero, signed overflow).

use crate::config::Xlen;
use crate::core::structs::RsEntry;
use crate::fu::{result_of, FuResult, FuncUnit};
use crate::isa::opcodes::funct3;
use crate::isa::OpType;

#[derive(Debug)]
struct InFlight {
    entry: RsEntry,
    cycles_left: u32,
}

/// The multiply/divide unit.
#[derive(Debug)]
pub struct MulDivUnit {
    xlen: Xlen,
    mul_latency: u32,
    div_latency: u32,
    busy: Option<InFlight>,
    done: Option<FuResult>,
}

fn sext32(v: u64) -> u64 {
    v as u32 as i32 as i64 as u64
}

impl MulDivUnit {
    #[must_use]
    pub fn new(xlen: Xlen, mul_latency: u32, div_latency: u32) -> Self {
        assert!(mul_latency > 0 && div_latency > 0);
        Self { xlen, mul_latency, div_latency, busy: None, done: None }
    }

    fn compute(&self, entry: &RsEntry) -> u64 {
        let narrow = entry.op32 || self.xlen == Xlen::Rv32;
        let (a, b) = if narrow {
            (sext32(entry.s1_val), sext32(entry.s2_val))
        } else {
            (entry.s1_val, entry.s2_val)
        };

        let high_shift = if narrow { 32 } else { 64 };
        let wide = match (entry.op, u32::from(entry.funct3)) {
            (OpType::Mul, funct3::MUL) => a.wrapping_mul(b),
            (OpType::Mul, funct3::MULH) => {
                (((a as i64 as i128) * (b as i64 as i128)) >> high_shift) as u64
            }
            (OpType::Mul, funct3::MULHSU) => {
                let unsigned = if narrow { u128::from(b as u32) } else { u128::from(b) };
                (((a as i64 as i128) * (unsigned as i128)) >> high_shift) as u64
            }
            (OpType::Mul, _) => {
                let (ua, ub) = if narrow {
                    (u128::from(a as u32), u128::from(b as u32))
                } else {
                    (u128::from(a), u128::from(b))
                };
                ((ua * ub) >> high_shift) as u64
            }
            (OpType::DivRem, f3) => {
                let signed = f3 == funct3::DIV || f3 == funct3::REM;
                let is_div = f3 == funct3::DIV || f3 == funct3::DIVU;
                if narrow {
                    div_rem32(a as u32, b as u32, signed, is_div)
                } else {
                    div_rem64(a, b, signed, is_div)
                }
            }
            (op, _) => unreachable!("muldiv issued op {op:?}"),
        };
        if narrow {
            sext32(wide)
        } else {
            wide
        }
    }
}

fn div_rem64(a: u64, b: u64, signed: bool, is_div: bool) -> u64 {
    if b == 0 {
        return if is_div { u64::MAX } else { a };
    }
    if signed {
        let (a, b) = (a as i64, b as i64);
        if a == i64::MIN && b == -1 {
            return if is_div { a as u64 } else { 0 };
        }
        if is_div {
            (a / b) as u64
        } else {
            (a % b) as u64
        }
    } else if is_div {
        a / b
    } else {
        a % b
    }
}

fn div_rem32(a: u32, b: u32, signed: bool, is_div: bool) -> u64 {
    if b == 0 {
        return if is_div { u64::MAX } else { u64::from(a) };
    }
    if signed {
        let (a, b) = (a as i32, b as i32);
        if a == i32::MIN && b == -1 {
            return if is_div { a as u32 as u64 } else { 0 };
        }
        if is_div {
            (a / b) as u32 as u64
        } else {
            (a % b) as u32 as u64
        }
    } else if is_div {
        u64::from(a / b)
    } else {
        u64::from(a % b)
    }
}

impl MulDivUnit {
    /// Advances the latency countdown.
    pub fn tick(&mut self) {
        let Some(inflight) = self.busy.as_mut() else { return };
        inflight.cycles_left -= 1;
        if inflight.cycles_left == 0 && self.done.is_none() {
            let Some(inflight) = self.busy.take() else { return };
            let value = self.compute(&inflight.entry);
            self.done = Some(result_of(&inflight.entry, value));
        } else if inflight.cycles_left == 0 {
            // Output slot still occupied: hold at zero until it drains.
            inflight.cycles_left = 1;
        }
    }
}

impl FuncUnit for MulDivUnit {
    fn can_issue(&self) -> bool {
        self.busy.is_none()
    }

    fn issue(&mut self, entry: RsEntry) {
        let cycles_left =
            if entry.op == OpType::DivRem { self.div_latency } else { self.mul_latency };
        self.busy = Some(InFlight { entry, cycles_left });
    }

    fn take_result(&mut self) -> Option<FuResult> {
        self.done.take()
    }

    fn clear(&mut self) {
        self.busy = None;
        self.done = None;
    }
}
