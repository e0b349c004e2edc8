//! Major opcode and function-field constants for the base encoding.

/// Major opcodes (bits 6..0 of an uncompressed instruction).
pub mod opcodes {
    /// Integer register-immediate operations.
    pub const OP_IMM: u32 = 0x13;
    /// Integer register-register operations.
    pub const OP_REG: u32 = 0x33;
    /// 32-bit register-immediate operations (RV64).
    pub const OP_IMM_32: u32 = 0x1B;
    /// 32-bit register-register operations (RV64).
    pub const OP_REG_32: u32 = 0x3B;
    /// Load upper immediate.
    pub const OP_LUI: u32 = 0x37;
    /// Add upper immediate to PC.
    pub const OP_AUIPC: u32 = 0x17;
    /// Loads.
    pub const OP_LOAD: u32 = 0x03;
    /// Stores.
    pub const OP_STORE: u32 = 0x23;
    /// Conditional branches.
    pub const OP_BRANCH: u32 = 0x63;
    /// Jump and link.
    pub const OP_JAL: u32 = 0x6F;
    /// Jump and link register.
    pub const OP_JALR: u32 = 0x67;
    /// Memory ordering (FENCE, FENCE.I).
    pub const OP_MISC_MEM: u32 = 0x0F;
    /// System instructions (ECALL, EBREAK, CSR, MRET, WFI).
    pub const OP_SYSTEM: u32 = 0x73;
}

/// funct3 values for the integer base.
pub mod funct3 {
    /// ADD/SUB (register) or ADDI (immediate).
    pub const ADD_SUB: u32 = 0x0;
    /// Shift left logical.
    pub const SLL: u32 = 0x1;
    /// Set less than (signed).
    pub const SLT: u32 = 0x2;
    /// Set less than (unsigned).
    pub const SLTU: u32 = 0x3;
    /// Bitwise exclusive or.
    pub const XOR: u32 = 0x4;
    /// Shift right logical/arithmetic.
    pub const SRL_SRA: u32 = 0x5;
    /// Bitwise or.
    pub const OR: u32 = 0x6;
    /// Bitwise and.
    pub const AND: u32 = 0x7;

    /// Branch if equal.
    pub const BEQ: u32 = 0x0;
    /// Branch if not equal.
    pub const BNE: u32 = 0x1;
    /// Branch if less than (signed).
    pub const BLT: u32 = 0x4;
    /// Branch if greater or equal (signed).
    pub const BGE: u32 = 0x5;
    /// Branch if less than (unsigned).
    pub const BLTU: u32 = 0x6;
    /// Branch if greater or equal (unsigned).
    pub const BGEU: u32 = 0x7;

    /// Load byte (sign-extending).
    pub const LB: u32 = 0x0;
    /// Load halfword (sign-extending).
    pub const LH: u32 = 0x1;
    /// Load word.
    pub const LW: u32 = 0x2;
    /// Load doubleword (RV64).
    pub const LD: u32 = 0x3;
    /// Load byte unsigned.
    pub const LBU: u32 = 0x4;
    /// Load halfword unsigned.
    pub const LHU: u32 = 0x5;
    /// Load word unsigned (RV64).
    pub const LWU: u32 = 0x6;

    /// Store byte.
    pub const SB: u32 = 0x0;
    /// Store halfword.
    pub const SH: u32 = 0x1;
    /// Store word.
    pub const SW: u32 = 0x2;
    /// Store doubleword (RV64).
    pub const SD: u32 = 0x3;

    /// MUL (low half).
    pub const MUL: u32 = 0x0;
    /// MULH (high half, signed x signed).
    pub const MULH: u32 = 0x1;
    /// MULHSU (high half, signed x unsigned).
    pub const MULHSU: u32 = 0x2;
    /// MULHU (high half, unsigned x unsigned).
    pub const MULHU: u32 = 0x3;
    /// DIV (signed).
    pub const DIV: u32 = 0x4;
    /// DIVU.
    pub const DIVU: u32 = 0x5;
    /// REM (signed).
    pub const REM: u32 = 0x6;
    /// REMU.
    pub const REMU: u32 = 0x7;

    /// FENCE.
    pub const FENCE: u32 = 0x0;
    /// FENCE.I.
    pub const FENCE_I: u32 = 0x1;

    /// System PRIV group (ECALL/EBREAK/MRET/WFI).
    pub const PRIV: u32 = 0x0;
    /// CSRRW.
    pub const CSRRW: u32 = 0x1;
    /// CSRRS.
    pub const CSRRS: u32 = 0x2;
    /// CSRRC.
    pub const CSRRC: u32 = 0x3;
    /// CSRRWI.
    pub const CSRRWI: u32 = 0x5;
    /// CSRRSI.
    pub const CSRRSI: u32 = 0x6;
    /// CSRRCI.
    pub const CSRRCI: u32 = 0x7;
}

/// funct7 values for the integer base and the M extension.
pub mod funct7 {
    /// Default function modifier.
    pub const BASE: u32 = 0x00;
    /// SUB / SRA modifier.
    pub const SUB: u32 = 0x20;
    /// SRA modifier (same encoding as SUB).
    pub const SRA: u32 = 0x20;
    /// M-extension marker (MUL.. / DIV..).
    pub const MULDIV: u32 = 0x01;
}

/// Full 32-bit encodings of the PRIV-group system instructions.
pub mod system {
    /// ECALL.
    pub const ECALL: u32 = 0x0000_0073;
    /// EBREAK.
    pub const EBREAK: u32 = 0x0010_0073;
    /// MRET.
    pub const MRET: u32 = 0x3020_0073;
    /// WFI.
    pub const WFI: u32 = 0x1050_0073;
}
