//! Instruction decoder.
//!
//! Decodes 32-bit (already expanded) encodings into the fields the rename
//! and issue machinery consumes. The decoder is pure: undecodable or
//! disabled-extension encodings become [`OpType::Exception`] records that
//! flow through the pipeline and raise `IllegalInstruction` at execution.

use crate::common::{ExceptionCause, RegId};
use crate::config::{ExtensionsConfig, Xlen};
use crate::isa::opcodes::{funct3, funct7, opcodes, system};
use crate::isa::optype::OpType;

/// A decoded instruction, before renaming.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodedInstr {
    /// Operation class.
    pub op: OpType,
    /// funct3 field (operation selector within a class).
    pub funct3: u8,
    /// funct7 field (sub-operation modifier).
    pub funct7: u8,
    /// True for RV64 W-form operations (32-bit arithmetic).
    pub op32: bool,
    /// Destination logical register (x0 when none).
    pub rl_dst: RegId,
    /// First source logical register (x0 when none).
    pub rl_s1: RegId,
    /// Second source logical register (x0 when none).
    pub rl_s2: RegId,
    /// Sign-extended immediate. For CSR-immediate forms this holds the
    /// zero-extended 5-bit operand.
    pub imm: i64,
    /// CSR address for CSR operations.
    pub csr: u16,
    /// Exception carried from fetch or decode.
    pub cause: Option<ExceptionCause>,
}

impl DecodedInstr {
    /// Builds an exception carrier (fetch fault or illegal encoding).
    #[must_use]
    pub fn exception(cause: ExceptionCause) -> Self {
        Self { op: OpType::Exception, cause: Some(cause), ..Self::default() }
    }

    /// True when the instruction reads its first register operand.
    #[must_use]
    pub fn reads_s1(&self) -> bool {
        self.rl_s1.0 != 0
    }

    /// True when the instruction reads its second register operand.
    #[must_use]
    pub fn reads_s2(&self) -> bool {
        self.rl_s2.0 != 0
    }
}

/// Decoder parameterized by register width, enabled extensions, and the
/// architectural register count.
#[derive(Debug, Clone)]
pub struct InstrDecoder {
    xlen: Xlen,
    ext: ExtensionsConfig,
    reg_cnt: u8,
}

impl InstrDecoder {
    /// Creates a decoder for the given width, extension set, and register
    /// count (16 for the embedded variants, 32 otherwise).
    #[must_use]
    pub fn new(xlen: Xlen, ext: ExtensionsConfig, reg_cnt: usize) -> Self {
        Self { xlen, ext, reg_cnt: reg_cnt as u8 }
    }

    /// Decodes one 32-bit encoding.
    #[must_use]
    pub fn decode(&self, raw: u32) -> DecodedInstr {
        let d = self.dispatch(raw);
        // The register check runs on the decoded operands, not the raw
        // fields: bits overlapping rs2 in I-type encodings are immediate.
        if d.rl_dst.0 >= self.reg_cnt || d.rl_s1.0 >= self.reg_cnt || d.rl_s2.0 >= self.reg_cnt {
            return DecodedInstr::exception(ExceptionCause::IllegalInstruction);
        }
        d
    }

    fn dispatch(&self, raw: u32) -> DecodedInstr {
        let opcode = raw & 0x7F;
        let rd = RegId(((raw >> 7) & 0x1F) as u8);
        let rs1 = RegId(((raw >> 15) & 0x1F) as u8);
        let rs2 = RegId(((raw >> 20) & 0x1F) as u8);
        let f3 = (raw >> 12) & 0x7;
        let f7 = (raw >> 25) & 0x7F;

        let fields = DecodedInstr {
            funct3: f3 as u8,
            funct7: f7 as u8,
            rl_dst: rd,
            rl_s1: rs1,
            rl_s2: rs2,
            ..DecodedInstr::default()
        };

        match opcode {
            opcodes::OP_IMM => self.decode_op_imm(raw, fields, false),
            opcodes::OP_IMM_32 if self.xlen == Xlen::Rv64 => self.decode_op_imm(raw, fields, true),
            opcodes::OP_REG => self.decode_op_reg(fields, false),
            opcodes::OP_REG_32 if self.xlen == Xlen::Rv64 => self.decode_op_reg(fields, true),
            opcodes::OP_LUI => DecodedInstr {
                op: OpType::Arithmetic,
                funct3: funct3::ADD_SUB as u8,
                rl_s1: RegId(0),
                rl_s2: RegId(0),
                imm: imm_u(raw),
                ..fields
            },
            opcodes::OP_AUIPC => {
                DecodedInstr { op: OpType::Auipc, rl_s1: RegId(0), rl_s2: RegId(0), imm: imm_u(raw), ..fields }
            }
            opcodes::OP_JAL => {
                DecodedInstr { op: OpType::Jal, rl_s1: RegId(0), rl_s2: RegId(0), imm: imm_j(raw), ..fields }
            }
            opcodes::OP_JALR if f3 == 0 => DecodedInstr { op: OpType::Jalr, rl_s2: RegId(0), imm: imm_i(raw), ..fields },
            opcodes::OP_BRANCH if f3 != 2 && f3 != 3 => {
                DecodedInstr { op: OpType::Branch, rl_dst: RegId(0), imm: imm_b(raw), ..fields }
            }
            opcodes::OP_LOAD => self.decode_load(fields, raw),
            opcodes::OP_STORE => self.decode_store(fields, raw),
            opcodes::OP_MISC_MEM => self.decode_misc_mem(fields, f3),
            opcodes::OP_SYSTEM => self.decode_system(raw, fields, f3),
            _ => DecodedInstr::exception(ExceptionCause::IllegalInstruction),
        }
    }

    fn decode_op_imm(&self, raw: u32, fields: DecodedInstr, op32: bool) -> DecodedInstr {
        let f3 = u32::from(fields.funct3);
        let shamt_bits: u32 = if op32 || self.xlen == Xlen::Rv32 { 5 } else { 6 };
        let shamt_mask = (1u32 << shamt_bits) - 1;
        let upper = (raw >> 20) & !shamt_mask;

        let op = match f3 {
            funct3::ADD_SUB => Some(OpType::Arithmetic),
            funct3::SLT | funct3::SLTU if !op32 => Some(OpType::Compare),
            funct3::XOR | funct3::OR | funct3::AND if !op32 => Some(OpType::Logic),
            funct3::SLL if upper == 0 => Some(OpType::Shift),
            funct3::SRL_SRA if upper == 0 || upper == (funct7::SRA << 5) & !shamt_mask => Some(OpType::Shift),
            _ => None,
        };
        match op {
            Some(op @ OpType::Shift) => DecodedInstr {
                op,
                op32,
                rl_s2: RegId(0),
                imm: i64::from((raw >> 20) & shamt_mask),
                funct7: ((raw >> 25) & 0x7F) as u8,
                ..fields
            },
            Some(op) => DecodedInstr { op, op32, rl_s2: RegId(0), funct7: 0, imm: imm_i(raw), ..fields },
            None => DecodedInstr::exception(ExceptionCause::IllegalInstruction),
        }
    }

    fn decode_op_reg(&self, fields: DecodedInstr, op32: bool) -> DecodedInstr {
        let f3 = u32::from(fields.funct3);
        let f7 = u32::from(fields.funct7);
        let op = match (f7, f3) {
            (funct7::BASE | funct7::SUB, funct3::ADD_SUB) => Some(OpType::Arithmetic),
            (funct7::BASE, funct3::SLL) => Some(OpType::Shift),
            (funct7::BASE, funct3::SLT | funct3::SLTU) if !op32 => Some(OpType::Compare),
            (funct7::BASE, funct3::XOR | funct3::OR | funct3::AND) if !op32 => Some(OpType::Logic),
            (funct7::SRA | funct7::BASE, funct3::SRL_SRA) => Some(OpType::Shift),
            (funct7::MULDIV, _) if self.ext.m => {
                if f3 < 4 {
                    if op32 && f3 != 0 {
                        None
                    } else {
                        Some(OpType::Mul)
                    }
                } else {
                    Some(OpType::DivRem)
                }
            }
            _ => None,
        };
        op.map_or_else(
            || DecodedInstr::exception(ExceptionCause::IllegalInstruction),
            |op| DecodedInstr { op, op32, ..fields },
        )
    }

    fn decode_load(&self, fields: DecodedInstr, raw: u32) -> DecodedInstr {
        let valid = match u32::from(fields.funct3) {
            funct3::LB | funct3::LH | funct3::LW | funct3::LBU | funct3::LHU => true,
            funct3::LD | funct3::LWU => self.xlen == Xlen::Rv64,
            _ => false,
        };
        if valid {
            DecodedInstr { op: OpType::Load, rl_s2: RegId(0), imm: imm_i(raw), ..fields }
        } else {
            DecodedInstr::exception(ExceptionCause::IllegalInstruction)
        }
    }

    fn decode_store(&self, fields: DecodedInstr, raw: u32) -> DecodedInstr {
        let valid = match u32::from(fields.funct3) {
            funct3::SB | funct3::SH | funct3::SW => true,
            funct3::SD => self.xlen == Xlen::Rv64,
            _ => false,
        };
        if valid {
            DecodedInstr { op: OpType::Store, rl_dst: RegId(0), imm: imm_s(raw), ..fields }
        } else {
            DecodedInstr::exception(ExceptionCause::IllegalInstruction)
        }
    }

    fn decode_misc_mem(&self, fields: DecodedInstr, f3: u32) -> DecodedInstr {
        match f3 {
            funct3::FENCE => DecodedInstr { op: OpType::Fence, rl_dst: RegId(0), rl_s1: RegId(0), rl_s2: RegId(0), ..fields },
            funct3::FENCE_I if self.ext.zifencei => {
                DecodedInstr { op: OpType::FenceI, rl_dst: RegId(0), rl_s1: RegId(0), rl_s2: RegId(0), ..fields }
            }
            _ => DecodedInstr::exception(ExceptionCause::IllegalInstruction),
        }
    }

    fn decode_system(&self, raw: u32, fields: DecodedInstr, f3: u32) -> DecodedInstr {
        if f3 == funct3::PRIV {
            let op = match raw {
                system::ECALL => Some(OpType::Ecall),
                system::EBREAK => Some(OpType::Ebreak),
                system::MRET => Some(OpType::Mret),
                system::WFI => Some(OpType::Wfi),
                _ => None,
            };
            return op.map_or_else(
                || DecodedInstr::exception(ExceptionCause::IllegalInstruction),
                |op| DecodedInstr { op, rl_dst: RegId(0), rl_s1: RegId(0), rl_s2: RegId(0), ..fields },
            );
        }
        if !self.ext.zicsr {
            return DecodedInstr::exception(ExceptionCause::IllegalInstruction);
        }
        let csr = ((raw >> 20) & 0xFFF) as u16;
        match f3 {
            funct3::CSRRW | funct3::CSRRS | funct3::CSRRC => {
                DecodedInstr { op: OpType::CsrReg, rl_s2: RegId(0), csr, ..fields }
            }
            funct3::CSRRWI | funct3::CSRRSI | funct3::CSRRCI => DecodedInstr {
                op: OpType::CsrImm,
                rl_s1: RegId(0),
                rl_s2: RegId(0),
                imm: i64::from((raw >> 15) & 0x1F),
                csr,
                ..fields
            },
            _ => DecodedInstr::exception(ExceptionCause::IllegalInstruction),
        }
    }
}

/// I-type immediate.
fn imm_i(raw: u32) -> i64 {
    i64::from(raw as i32 >> 20)
}

/// S-type immediate.
fn imm_s(raw: u32) -> i64 {
    i64::from(((raw & 0xFE00_0000) as i32 >> 20) | ((raw >> 7) & 0x1F) as i32)
}

/// B-type immediate.
pub(crate) fn imm_b(raw: u32) -> i64 {
    let imm = ((raw & 0x8000_0000) as i32 >> 19)
        | (((raw >> 7) & 1) << 11) as i32
        | (((raw >> 25) & 0x3F) << 5) as i32
        | (((raw >> 8) & 0xF) << 1) as i32;
    i64::from(imm)
}

/// U-type immediate.
fn imm_u(raw: u32) -> i64 {
    i64::from((raw & 0xFFFF_F000) as i32)
}

/// J-type immediate.
pub(crate) fn imm_j(raw: u32) -> i64 {
    let imm = ((raw & 0x8000_0000) as i32 >> 11)
        | (raw & 0x000F_F000) as i32
        | (((raw >> 20) & 1) << 11) as i32
        | (((raw >> 21) & 0x3FF) << 1) as i32;
    i64::from(imm)
}
