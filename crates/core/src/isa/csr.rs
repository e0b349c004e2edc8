//! Machine-mode control and status registers.
//!
//! Each register carries a read-only bit mask; writes land as
//! `(value & !ro) | (current & ro)`. The file also implements the trap
//! entry/return sequencing for `mstatus.MIE`/`MPIE` used by retirement and
//! the interrupt coordinator.

use crate::config::{ExtensionsConfig, Xlen};

/// CSR addresses implemented by the machine-mode file.
pub mod addr {
    /// Machine status.
    pub const MSTATUS: u16 = 0x300;
    /// Machine ISA and extensions.
    pub const MISA: u16 = 0x301;
    /// Machine interrupt enable.
    pub const MIE: u16 = 0x304;
    /// Machine trap vector.
    pub const MTVEC: u16 = 0x305;
    /// Machine scratch.
    pub const MSCRATCH: u16 = 0x340;
    /// Machine exception program counter.
    pub const MEPC: u16 = 0x341;
    /// Machine trap cause.
    pub const MCAUSE: u16 = 0x342;
    /// Machine trap value.
    pub const MTVAL: u16 = 0x343;
    /// Machine interrupt pending.
    pub const MIP: u16 = 0x344;
}

/// mstatus.MIE bit.
const MSTATUS_MIE: u64 = 1 << 3;
/// mstatus.MPIE bit.
const MSTATUS_MPIE: u64 = 1 << 7;

/// Writable bits of `mie`: MSIE, MTIE, MEIE.
const MIE_MASK: u64 = (1 << 3) | (1 << 7) | (1 << 11);

/// One CSR with its read-only bit mask.
#[derive(Debug, Clone, Copy)]
struct Csr {
    value: u64,
    /// Bits that ignore writes and keep their current value.
    ro_bits: u64,
}

impl Csr {
    const fn new(value: u64, ro_bits: u64) -> Self {
        Self { value, ro_bits }
    }

    fn write(&mut self, value: u64) {
        self.value = (value & !self.ro_bits) | (self.value & self.ro_bits);
    }
}

/// The machine-mode CSR file.
#[derive(Debug, Clone)]
pub struct CsrFile {
    xlen: Xlen,
    mstatus: Csr,
    misa: Csr,
    mie: Csr,
    mtvec: Csr,
    mscratch: Csr,
    mepc: Csr,
    mcause: Csr,
    mtval: Csr,
    mip: Csr,
}

impl CsrFile {
    /// Creates the file with reset values.
    #[must_use]
    pub fn new(xlen: Xlen, ext: &ExtensionsConfig, mtvec_reset: u64) -> Self {
        let mxl: u64 = match xlen {
            Xlen::Rv32 => 1,
            Xlen::Rv64 => 2,
        };
        let mut misa = mxl << (xlen.bits() - 2);
        misa |= 1 << 8; // I
        if ext.m {
            misa |= 1 << 12;
        }
        if ext.c {
            misa |= 1 << 2;
        }
        // mepc always masks bit 0; bit 1 is writable only with C enabled.
        let mepc_ro = if ext.c { 0b01 } else { 0b11 };
        Self {
            xlen,
            mstatus: Csr::new(0, !(MSTATUS_MIE | MSTATUS_MPIE)),
            misa: Csr::new(misa, u64::MAX),
            mie: Csr::new(0, !MIE_MASK),
            mtvec: Csr::new(mtvec_reset, 0b10),
            mscratch: Csr::new(0, 0),
            mepc: Csr::new(0, mepc_ro),
            mcause: Csr::new(0, 0),
            mtval: Csr::new(0, 0),
            mip: Csr::new(0, u64::MAX),
        }
    }

    fn reg(&self, a: u16) -> Option<&Csr> {
        match a {
            addr::MSTATUS => Some(&self.mstatus),
            addr::MISA => Some(&self.misa),
            addr::MIE => Some(&self.mie),
            addr::MTVEC => Some(&self.mtvec),
            addr::MSCRATCH => Some(&self.mscratch),
            addr::MEPC => Some(&self.mepc),
            addr::MCAUSE => Some(&self.mcause),
            addr::MTVAL => Some(&self.mtval),
            addr::MIP => Some(&self.mip),
            _ => None,
        }
    }

    fn reg_mut(&mut self, a: u16) -> Option<&mut Csr> {
        match a {
            addr::MSTATUS => Some(&mut self.mstatus),
            addr::MISA => Some(&mut self.misa),
            addr::MIE => Some(&mut self.mie),
            addr::MTVEC => Some(&mut self.mtvec),
            addr::MSCRATCH => Some(&mut self.mscratch),
            addr::MEPC => Some(&mut self.mepc),
            addr::MCAUSE => Some(&mut self.mcause),
            addr::MTVAL => Some(&mut self.mtval),
            addr::MIP => Some(&mut self.mip),
            _ => None,
        }
    }

    /// Reads a CSR; `None` for unimplemented addresses.
    #[must_use]
    pub fn read(&self, a: u16) -> Option<u64> {
        self.reg(a).map(|r| r.value & self.xlen.mask())
    }

    /// Writes a CSR through its read-only mask.
    ///
    /// Returns false (illegal) for unimplemented addresses and for the
    /// architecturally read-only address range (`csr[11:10] == 0b11`).
    pub fn write(&mut self, a: u16, value: u64) -> bool {
        if a >> 10 == 0b11 {
            return false;
        }
        let mask = self.xlen.mask();
        match self.reg_mut(a) {
            Some(r) => {
                r.write(value & mask);
                true
            }
            None => false,
        }
    }

    /// True when machine interrupts are globally enabled.
    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.mstatus.value & MSTATUS_MIE != 0
    }

    /// Pending-and-enabled mask (`mie & mip`).
    #[must_use]
    pub fn pending_enabled(&self) -> u64 {
        self.mie.value & self.mip.value
    }

    /// Sets or clears a bit in `mip`.
    pub fn set_pending(&mut self, bit: u64, pending: bool) {
        if pending {
            self.mip.value |= bit;
        } else {
            self.mip.value &= !bit;
        }
    }

    /// Performs trap entry: records cause state and stacks `MIE` into
    /// `MPIE`. Returns the handler address.
    pub fn trap_enter(&mut self, mcause: u64, epc: u64, mtval: u64) -> u64 {
        self.mepc.value = epc & !(self.mepc.ro_bits);
        self.mcause.value = mcause;
        self.mtval.value = mtval;

        let mie = self.mstatus.value & MSTATUS_MIE != 0;
        self.mstatus.value &= !(MSTATUS_MIE | MSTATUS_MPIE);
        if mie {
            self.mstatus.value |= MSTATUS_MPIE;
        }
        self.trap_vector(mcause)
    }

    /// Performs trap return: unstacks `MPIE` into `MIE`. Returns the
    /// resume address from `mepc`.
    pub fn trap_return(&mut self) -> u64 {
        let mpie = self.mstatus.value & MSTATUS_MPIE != 0;
        self.mstatus.value |= MSTATUS_MPIE;
        self.mstatus.value &= !MSTATUS_MIE;
        if mpie {
            self.mstatus.value |= MSTATUS_MIE;
        }
        self.mepc.value & self.xlen.mask()
    }

    /// Handler address for a cause, honoring vectored mode for interrupts.
    #[must_use]
    pub fn trap_vector(&self, mcause: u64) -> u64 {
        let base = self.mtvec.value & !0b11;
        let vectored = self.mtvec.value & 0b11 == 1;
        let interrupt = mcause >> (self.xlen.bits() - 1) != 0;
        if vectored && interrupt {
            let code = mcause & (self.xlen.mask() >> 1);
            base + 4 * code
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file() -> CsrFile {
        CsrFile::new(Xlen::Rv64, &ExtensionsConfig::default(), 0x8000_1000)
    }

    #[test]
    fn misa_ignores_writes() {
        let mut f = file();
        let before = f.read(addr::MISA).unwrap();
        assert!(f.write(addr::MISA, 0));
        assert_eq!(f.read(addr::MISA).unwrap(), before);
    }

    #[test]
    fn mepc_masks_low_bit() {
        let mut f = file();
        assert!(f.write(addr::MEPC, 0x8000_0003));
        assert_eq!(f.read(addr::MEPC).unwrap(), 0x8000_0002);
    }

    #[test]
    fn readonly_address_range_rejected() {
        let mut f = file();
        assert!(!f.write(0xF11, 1)); // mvendorid range
    }

    #[test]
    fn trap_entry_stacks_mie() {
        let mut f = file();
        assert!(f.write(addr::MSTATUS, MSTATUS_MIE));
        let handler = f.trap_enter(2, 0x8000_0100, 0xDEAD);
        assert_eq!(handler, 0x8000_1000);
        assert!(!f.interrupts_enabled());
        assert_eq!(f.read(addr::MSTATUS).unwrap() & MSTATUS_MPIE, MSTATUS_MPIE);
        assert_eq!(f.read(addr::MEPC).unwrap(), 0x8000_0100);
        assert_eq!(f.read(addr::MCAUSE).unwrap(), 2);
        assert_eq!(f.read(addr::MTVAL).unwrap(), 0xDEAD);

        let resume = f.trap_return();
        assert_eq!(resume, 0x8000_0100);
        assert!(f.interrupts_enabled());
    }

    #[test]
    fn vectored_mtvec_offsets_interrupts_only() {
        let mut f = file();
        assert!(f.write(addr::MTVEC, 0x8000_2001));
        let interrupt_cause = (1 << 63) | 7;
        assert_eq!(f.trap_vector(interrupt_cause), 0x8000_2000 + 4 * 7);
        assert_eq!(f.trap_vector(2), 0x8000_2000);
    }
}
