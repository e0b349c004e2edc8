//! Compressed instruction expansion.
//!
//! Converts a 16-bit compressed parcel into its 32-bit uncompressed
//! equivalent. Reserved or unsupported encodings expand to 0, which the
//! decoder classifies as an illegal instruction.

use crate::config::Xlen;
use crate::isa::opcodes::{funct3, funct7, opcodes, system};

const QUADRANT_0: u16 = 0b00;
const QUADRANT_1: u16 = 0b01;
const QUADRANT_2: u16 = 0b10;

/// Expands a 16-bit RVC instruction into its 32-bit equivalent.
///
/// Encodings that differ between RV32 and RV64 (C.JAL vs C.ADDIW, the
/// doubleword loads/stores) follow `xlen`.
#[must_use]
pub fn expand(inst: u16, xlen: Xlen) -> u32 {
    let op = inst & 0x3;
    let f3 = (inst >> 13) & 0x7;

    match op {
        QUADRANT_0 => expand_q0(inst, f3, xlen),
        QUADRANT_1 => expand_q1(inst, f3, xlen),
        QUADRANT_2 => expand_q2(inst, f3, xlen),
        _ => 0,
    }
}

/// Quadrant 0: stack-pointer-relative allocation and compressed loads/stores.
fn expand_q0(inst: u16, f3: u16, xlen: Xlen) -> u32 {
    let rs1 = 8 + u32::from((inst >> 7) & 0x7);
    let rd_rs2 = 8 + u32::from((inst >> 2) & 0x7);
    match f3 {
        // C.ADDI4SPN
        0b000 => {
            let imm = u32::from((inst >> 6) & 1) << 2
                | u32::from((inst >> 5) & 1) << 3
                | u32::from((inst >> 11) & 0x3) << 4
                | u32::from((inst >> 7) & 0xF) << 6;
            if imm == 0 {
                return 0;
            }
            imm << 20 | (2 << 15) | (funct3::ADD_SUB << 12) | (rd_rs2 << 7) | opcodes::OP_IMM
        }
        // C.LW
        0b010 => {
            let imm = u32::from((inst >> 6) & 1) << 2 | u32::from((inst >> 10) & 0x7) << 3 | u32::from((inst >> 5) & 1) << 6;
            imm << 20 | (rs1 << 15) | (funct3::LW << 12) | (rd_rs2 << 7) | opcodes::OP_LOAD
        }
        // C.LD (RV64)
        0b011 if xlen == Xlen::Rv64 => {
            let imm = u32::from((inst >> 10) & 0x7) << 3 | u32::from((inst >> 5) & 0x3) << 6;
            imm << 20 | (rs1 << 15) | (funct3::LD << 12) | (rd_rs2 << 7) | opcodes::OP_LOAD
        }
        // C.SW
        0b110 => {
            let imm = u32::from((inst >> 6) & 1) << 2 | u32::from((inst >> 10) & 0x7) << 3 | u32::from((inst >> 5) & 1) << 6;
            store(imm, rs1, rd_rs2, funct3::SW)
        }
        // C.SD (RV64)
        0b111 if xlen == Xlen::Rv64 => {
            let imm = u32::from((inst >> 10) & 0x7) << 3 | u32::from((inst >> 5) & 0x3) << 6;
            store(imm, rs1, rd_rs2, funct3::SD)
        }
        _ => 0,
    }
}

/// Quadrant 1: immediate arithmetic, control flow, and the misc-ALU group.
fn expand_q1(inst: u16, f3: u16, xlen: Xlen) -> u32 {
    let rd = u32::from((inst >> 7) & 0x1F);
    let imm6 = sign_extend(u32::from((inst >> 2) & 0x1F) | u32::from((inst >> 12) & 1) << 5, 6);
    match f3 {
        // C.NOP / C.ADDI
        0b000 => (imm6 & 0xFFF) << 20 | (rd << 15) | (funct3::ADD_SUB << 12) | (rd << 7) | opcodes::OP_IMM,
        // RV32: C.JAL, RV64: C.ADDIW
        0b001 => match xlen {
            Xlen::Rv32 => jal_encoding(inst, 1),
            Xlen::Rv64 => {
                if rd == 0 {
                    return 0;
                }
                (imm6 & 0xFFF) << 20 | (rd << 15) | (funct3::ADD_SUB << 12) | (rd << 7) | opcodes::OP_IMM_32
            }
        },
        // C.LI
        0b010 => (imm6 & 0xFFF) << 20 | (funct3::ADD_SUB << 12) | (rd << 7) | opcodes::OP_IMM,
        // C.ADDI16SP / C.LUI
        0b011 => {
            if rd == 2 {
                let imm = sign_extend(
                    u32::from((inst >> 6) & 1) << 4
                        | u32::from((inst >> 2) & 1) << 5
                        | u32::from((inst >> 5) & 1) << 6
                        | u32::from((inst >> 3) & 3) << 7
                        | u32::from((inst >> 12) & 1) << 9,
                    10,
                );
                if imm == 0 {
                    return 0;
                }
                (imm & 0xFFF) << 20 | (2 << 15) | (funct3::ADD_SUB << 12) | (2 << 7) | opcodes::OP_IMM
            } else {
                if imm6 == 0 {
                    return 0;
                }
                (imm6 << 12) | (rd << 7) | opcodes::OP_LUI
            }
        }
        // C.SRLI / C.SRAI / C.ANDI / register-register group
        0b100 => expand_q1_misc_alu(inst, imm6, xlen),
        // C.J
        0b101 => jal_encoding(inst, 0),
        // C.BEQZ
        0b110 => branch_encoding(inst, funct3::BEQ),
        // C.BNEZ
        0b111 => branch_encoding(inst, funct3::BNE),
        _ => 0,
    }
}

fn expand_q1_misc_alu(inst: u16, imm6: u32, xlen: Xlen) -> u32 {
    let bit12 = (inst >> 12) & 1;
    let funct2 = (inst >> 10) & 0x3;
    let rd = 8 + u32::from((inst >> 7) & 0x7);
    let shamt_mask: u32 = match xlen {
        Xlen::Rv32 => 0x1F,
        Xlen::Rv64 => 0x3F,
    };
    match funct2 {
        // C.SRLI
        0 => {
            if xlen == Xlen::Rv32 && bit12 == 1 {
                return 0;
            }
            (imm6 & shamt_mask) << 20 | (rd << 15) | (funct3::SRL_SRA << 12) | (rd << 7) | opcodes::OP_IMM
        }
        // C.SRAI
        1 => {
            if xlen == Xlen::Rv32 && bit12 == 1 {
                return 0;
            }
            (funct7::SRA << 25) | (imm6 & shamt_mask) << 20 | (rd << 15) | (funct3::SRL_SRA << 12) | (rd << 7) | opcodes::OP_IMM
        }
        // C.ANDI
        2 => (imm6 & 0xFFF) << 20 | (rd << 15) | (funct3::AND << 12) | (rd << 7) | opcodes::OP_IMM,
        3 => {
            let sub_op = (inst >> 5) & 0x3;
            let rs2 = 8 + u32::from((inst >> 2) & 0x7);
            let rr = |f7: u32, f3: u32, opc: u32| (f7 << 25) | (rs2 << 20) | (rd << 15) | (f3 << 12) | (rd << 7) | opc;
            match (bit12, sub_op) {
                (0, 0) => rr(funct7::SUB, funct3::ADD_SUB, opcodes::OP_REG),
                (0, 1) => rr(funct7::BASE, funct3::XOR, opcodes::OP_REG),
                (0, 2) => rr(funct7::BASE, funct3::OR, opcodes::OP_REG),
                (0, 3) => rr(funct7::BASE, funct3::AND, opcodes::OP_REG),
                // C.SUBW / C.ADDW
                (1, 0) if xlen == Xlen::Rv64 => rr(funct7::SUB, funct3::ADD_SUB, opcodes::OP_REG_32),
                (1, 1) if xlen == Xlen::Rv64 => rr(funct7::BASE, funct3::ADD_SUB, opcodes::OP_REG_32),
                _ => 0,
            }
        }
        _ => 0,
    }
}

/// Quadrant 2: stack-pointer loads/stores, shifts, and the JR/MV/ADD group.
fn expand_q2(inst: u16, f3: u16, xlen: Xlen) -> u32 {
    let rd = u32::from((inst >> 7) & 0x1F);
    match f3 {
        // C.SLLI
        0b000 => {
            let shamt = u32::from((inst >> 2) & 0x1F) | u32::from((inst >> 12) & 1) << 5;
            if rd == 0 || (xlen == Xlen::Rv32 && shamt >= 32) {
                return 0;
            }
            shamt << 20 | (rd << 15) | (funct3::SLL << 12) | (rd << 7) | opcodes::OP_IMM
        }
        // C.LWSP
        0b010 => {
            let imm = u32::from((inst >> 12) & 1) << 5 | u32::from((inst >> 4) & 0x7) << 2 | u32::from((inst >> 2) & 0x3) << 6;
            if rd == 0 {
                return 0;
            }
            imm << 20 | (2 << 15) | (funct3::LW << 12) | (rd << 7) | opcodes::OP_LOAD
        }
        // C.LDSP (RV64)
        0b011 if xlen == Xlen::Rv64 => {
            let imm = u32::from((inst >> 12) & 1) << 5 | u32::from((inst >> 5) & 0x3) << 3 | u32::from((inst >> 2) & 0x7) << 6;
            if rd == 0 {
                return 0;
            }
            imm << 20 | (2 << 15) | (funct3::LD << 12) | (rd << 7) | opcodes::OP_LOAD
        }
        // C.JR / C.MV / C.EBREAK / C.JALR / C.ADD
        0b100 => {
            let bit12 = (inst >> 12) & 1;
            let rs2 = u32::from((inst >> 2) & 0x1F);
            let rs1 = rd;
            if bit12 == 0 {
                if rs2 == 0 {
                    if rs1 == 0 {
                        return 0;
                    }
                    // C.JR
                    (rs1 << 15) | opcodes::OP_JALR
                } else {
                    // C.MV
                    (rs2 << 20) | (funct3::ADD_SUB << 12) | (rs1 << 7) | opcodes::OP_REG
                }
            } else if rs2 == 0 {
                if rs1 == 0 {
                    system::EBREAK
                } else {
                    // C.JALR
                    (rs1 << 15) | (1 << 7) | opcodes::OP_JALR
                }
            } else {
                // C.ADD
                (rs2 << 20) | (rs1 << 15) | (funct3::ADD_SUB << 12) | (rs1 << 7) | opcodes::OP_REG
            }
        }
        // C.SWSP
        0b110 => {
            let imm = u32::from((inst >> 9) & 0xF) << 2 | u32::from((inst >> 7) & 0x3) << 6;
            store(imm, 2, u32::from((inst >> 2) & 0x1F), funct3::SW)
        }
        // C.SDSP (RV64)
        0b111 if xlen == Xlen::Rv64 => {
            let imm = u32::from((inst >> 10) & 0x7) << 3 | u32::from((inst >> 7) & 0x7) << 6;
            store(imm, 2, u32::from((inst >> 2) & 0x1F), funct3::SD)
        }
        _ => 0,
    }
}

/// Builds an S-type store encoding.
fn store(imm: u32, rs1: u32, rs2: u32, f3: u32) -> u32 {
    let imm_low = imm & 0x1F;
    let imm_high = imm >> 5;
    (imm_high << 25) | (rs2 << 20) | (rs1 << 15) | (f3 << 12) | (imm_low << 7) | opcodes::OP_STORE
}

/// Builds the JAL encoding shared by C.J and C.JAL.
fn jal_encoding(inst: u16, link: u32) -> u32 {
    let offset = sign_extend(
        u32::from((inst >> 3) & 0x7) << 1
            | u32::from((inst >> 11) & 1) << 4
            | u32::from((inst >> 2) & 1) << 5
            | u32::from((inst >> 7) & 1) << 6
            | u32::from((inst >> 6) & 1) << 7
            | u32::from((inst >> 9) & 3) << 8
            | u32::from((inst >> 8) & 1) << 10
            | u32::from((inst >> 12) & 1) << 11,
        12,
    );
    let imm20 = (offset >> 20) & 1;
    let imm10_1 = (offset >> 1) & 0x3FF;
    let imm11 = (offset >> 11) & 1;
    let imm19_12 = (offset >> 12) & 0xFF;
    (imm20 << 31) | (imm10_1 << 21) | (imm11 << 20) | (imm19_12 << 12) | (link << 7) | opcodes::OP_JAL
}

/// Builds the branch encoding shared by C.BEQZ and C.BNEZ.
fn branch_encoding(inst: u16, f3: u32) -> u32 {
    let offset = sign_extend(
        u32::from((inst >> 3) & 0x3) << 1
            | u32::from((inst >> 10) & 0x3) << 3
            | u32::from((inst >> 2) & 1) << 5
            | u32::from((inst >> 5) & 0x3) << 6
            | u32::from((inst >> 12) & 1) << 8,
        9,
    );
    let rs1 = 8 + u32::from((inst >> 7) & 0x7);
    let imm12 = (offset >> 12) & 1;
    let imm10_5 = (offset >> 5) & 0x3F;
    let imm4_1 = (offset >> 1) & 0xF;
    let imm11 = (offset >> 11) & 1;
    (imm12 << 31) | (imm10_5 << 25) | (rs1 << 15) | (f3 << 12) | (imm4_1 << 8) | (imm11 << 7) | opcodes::OP_BRANCH
}

/// Sign-extends a value from `bits` width to 32 bits.
fn sign_extend(val: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    ((val << shift) as i32 >> shift) as u32
}
