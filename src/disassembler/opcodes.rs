//! ECMA-335 opcode tables.
//!
//! [`INSTRUCTIONS`] is indexed by the opcode byte of single-byte instructions (`0x00` to
//! `0xE0`), [`INSTRUCTIONS_FE`] by the second byte of `0xFE`-prefixed ones (`0x00` to `0x1E`).
//! Unassigned slots hold [`CilInstruction::RESERVED`], recognisable by an empty mnemonic.
//!
//! # References
//! - ECMA-335 6th Edition, Partition III, Section 1.2.1 - Opcode encodings

use crate::disassembler::OperandType;

/// Static decoding information of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CilInstruction {
    /// Mnemonic, empty for reserved opcodes
    pub instr: &'static str,
    /// How the operand following the opcode is encoded
    pub op_type: OperandType,
}

impl CilInstruction {
    /// Placeholder for unassigned opcode values.
    pub const RESERVED: CilInstruction = CilInstruction::new("", OperandType::None);

    const fn new(instr: &'static str, op_type: OperandType) -> Self {
        CilInstruction { instr, op_type }
    }

    /// Returns `true` for unassigned opcode values.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.instr.is_empty()
    }
}

/// Prefix byte of two-byte opcodes
pub const FE_PREFIX: u8 = 0xFE;

/// Find the encoding of `mnemonic`, as `(prefix, opcode)`. Lookup is case-insensitive.
#[must_use]
pub fn lookup_mnemonic(mnemonic: &str) -> Option<(u8, u8)> {
    let find = |table: &[CilInstruction]| {
        table
            .iter()
            .position(|entry| !entry.is_reserved() && entry.instr.eq_ignore_ascii_case(mnemonic))
            .and_then(|index| u8::try_from(index).ok())
    };

    find(&INSTRUCTIONS)
        .map(|opcode| (0, opcode))
        .or_else(|| find(&INSTRUCTIONS_FE).map(|opcode| (FE_PREFIX, opcode)))
}

/// Single-byte opcodes, indexed by opcode byte
#[rustfmt::skip]
pub static INSTRUCTIONS: [CilInstruction; 225] = [
    /* 00 */ CilInstruction::new("nop", OperandType::None),
    /* 01 */ CilInstruction::new("break", OperandType::None),
    /* 02 */ CilInstruction::new("ldarg.0", OperandType::None),
    /* 03 */ CilInstruction::new("ldarg.1", OperandType::None),
    /* 04 */ CilInstruction::new("ldarg.2", OperandType::None),
    /* 05 */ CilInstruction::new("ldarg.3", OperandType::None),
    /* 06 */ CilInstruction::new("ldloc.0", OperandType::None),
    /* 07 */ CilInstruction::new("ldloc.1", OperandType::None),
    /* 08 */ CilInstruction::new("ldloc.2", OperandType::None),
    /* 09 */ CilInstruction::new("ldloc.3", OperandType::None),
    /* 0A */ CilInstruction::new("stloc.0", OperandType::None),
    /* 0B */ CilInstruction::new("stloc.1", OperandType::None),
    /* 0C */ CilInstruction::new("stloc.2", OperandType::None),
    /* 0D */ CilInstruction::new("stloc.3", OperandType::None),
    /* 0E */ CilInstruction::new("ldarg.s", OperandType::UInt8),
    /* 0F */ CilInstruction::new("ldarga.s", OperandType::UInt8),
    /* 10 */ CilInstruction::new("starg.s", OperandType::UInt8),
    /* 11 */ CilInstruction::new("ldloc.s", OperandType::UInt8),
    /* 12 */ CilInstruction::new("ldloca.s", OperandType::UInt8),
    /* 13 */ CilInstruction::new("stloc.s", OperandType::UInt8),
    /* 14 */ CilInstruction::new("ldnull", OperandType::None),
    /* 15 */ CilInstruction::new("ldc.i4.m1", OperandType::None),
    /* 16 */ CilInstruction::new("ldc.i4.0", OperandType::None),
    /* 17 */ CilInstruction::new("ldc.i4.1", OperandType::None),
    /* 18 */ CilInstruction::new("ldc.i4.2", OperandType::None),
    /* 19 */ CilInstruction::new("ldc.i4.3", OperandType::None),
    /* 1A */ CilInstruction::new("ldc.i4.4", OperandType::None),
    /* 1B */ CilInstruction::new("ldc.i4.5", OperandType::None),
    /* 1C */ CilInstruction::new("ldc.i4.6", OperandType::None),
    /* 1D */ CilInstruction::new("ldc.i4.7", OperandType::None),
    /* 1E */ CilInstruction::new("ldc.i4.8", OperandType::None),
    /* 1F */ CilInstruction::new("ldc.i4.s", OperandType::Int8),
    /* 20 */ CilInstruction::new("ldc.i4", OperandType::Int32),
    /* 21 */ CilInstruction::new("ldc.i8", OperandType::Int64),
    /* 22 */ CilInstruction::new("ldc.r4", OperandType::Float32),
    /* 23 */ CilInstruction::new("ldc.r8", OperandType::Float64),
    /* 24 */ CilInstruction::RESERVED,
    /* 25 */ CilInstruction::new("dup", OperandType::None),
    /* 26 */ CilInstruction::new("pop", OperandType::None),
    /* 27 */ CilInstruction::new("jmp", OperandType::Token),
    /* 28 */ CilInstruction::new("call", OperandType::Token),
    /* 29 */ CilInstruction::new("calli", OperandType::Token),
    /* 2A */ CilInstruction::new("ret", OperandType::None),
    /* 2B */ CilInstruction::new("br.s", OperandType::Int8),
    /* 2C */ CilInstruction::new("brfalse.s", OperandType::Int8),
    /* 2D */ CilInstruction::new("brtrue.s", OperandType::Int8),
    /* 2E */ CilInstruction::new("beq.s", OperandType::Int8),
    /* 2F */ CilInstruction::new("bge.s", OperandType::Int8),
    /* 30 */ CilInstruction::new("bgt.s", OperandType::Int8),
    /* 31 */ CilInstruction::new("ble.s", OperandType::Int8),
    /* 32 */ CilInstruction::new("blt.s", OperandType::Int8),
    /* 33 */ CilInstruction::new("bne.un.s", OperandType::Int8),
    /* 34 */ CilInstruction::new("bge.un.s", OperandType::Int8),
    /* 35 */ CilInstruction::new("bgt.un.s", OperandType::Int8),
    /* 36 */ CilInstruction::new("ble.un.s", OperandType::Int8),
    /* 37 */ CilInstruction::new("blt.un.s", OperandType::Int8),
    /* 38 */ CilInstruction::new("br", OperandType::Int32),
    /* 39 */ CilInstruction::new("brfalse", OperandType::Int32),
    /* 3A */ CilInstruction::new("brtrue", OperandType::Int32),
    /* 3B */ CilInstruction::new("beq", OperandType::Int32),
    /* 3C */ CilInstruction::new("bge", OperandType::Int32),
    /* 3D */ CilInstruction::new("bgt", OperandType::Int32),
    /* 3E */ CilInstruction::new("ble", OperandType::Int32),
    /* 3F */ CilInstruction::new("blt", OperandType::Int32),
    /* 40 */ CilInstruction::new("bne.un", OperandType::Int32),
    /* 41 */ CilInstruction::new("bge.un", OperandType::Int32),
    /* 42 */ CilInstruction::new("bgt.un", OperandType::Int32),
    /* 43 */ CilInstruction::new("ble.un", OperandType::Int32),
    /* 44 */ CilInstruction::new("blt.un", OperandType::Int32),
    /* 45 */ CilInstruction::new("switch", OperandType::Switch),
    /* 46 */ CilInstruction::new("ldind.i1", OperandType::None),
    /* 47 */ CilInstruction::new("ldind.u1", OperandType::None),
    /* 48 */ CilInstruction::new("ldind.i2", OperandType::None),
    /* 49 */ CilInstruction::new("ldind.u2", OperandType::None),
    /* 4A */ CilInstruction::new("ldind.i4", OperandType::None),
    /* 4B */ CilInstruction::new("ldind.u4", OperandType::None),
    /* 4C */ CilInstruction::new("ldind.i8", OperandType::None),
    /* 4D */ CilInstruction::new("ldind.i", OperandType::None),
    /* 4E */ CilInstruction::new("ldind.r4", OperandType::None),
    /* 4F */ CilInstruction::new("ldind.r8", OperandType::None),
    /* 50 */ CilInstruction::new("ldind.ref", OperandType::None),
    /* 51 */ CilInstruction::new("stind.ref", OperandType::None),
    /* 52 */ CilInstruction::new("stind.i1", OperandType::None),
    /* 53 */ CilInstruction::new("stind.i2", OperandType::None),
    /* 54 */ CilInstruction::new("stind.i4", OperandType::None),
    /* 55 */ CilInstruction::new("stind.i8", OperandType::None),
    /* 56 */ CilInstruction::new("stind.r4", OperandType::None),
    /* 57 */ CilInstruction::new("stind.r8", OperandType::None),
    /* 58 */ CilInstruction::new("add", OperandType::None),
    /* 59 */ CilInstruction::new("sub", OperandType::None),
    /* 5A */ CilInstruction::new("mul", OperandType::None),
    /* 5B */ CilInstruction::new("div", OperandType::None),
    /* 5C */ CilInstruction::new("div.un", OperandType::None),
    /* 5D */ CilInstruction::new("rem", OperandType::None),
    /* 5E */ CilInstruction::new("rem.un", OperandType::None),
    /* 5F */ CilInstruction::new("and", OperandType::None),
    /* 60 */ CilInstruction::new("or", OperandType::None),
    /* 61 */ CilInstruction::new("xor", OperandType::None),
    /* 62 */ CilInstruction::new("shl", OperandType::None),
    /* 63 */ CilInstruction::new("shr", OperandType::None),
    /* 64 */ CilInstruction::new("shr.un", OperandType::None),
    /* 65 */ CilInstruction::new("neg", OperandType::None),
    /* 66 */ CilInstruction::new("not", OperandType::None),
    /* 67 */ CilInstruction::new("conv.i1", OperandType::None),
    /* 68 */ CilInstruction::new("conv.i2", OperandType::None),
    /* 69 */ CilInstruction::new("conv.i4", OperandType::None),
    /* 6A */ CilInstruction::new("conv.i8", OperandType::None),
    /* 6B */ CilInstruction::new("conv.r4", OperandType::None),
    /* 6C */ CilInstruction::new("conv.r8", OperandType::None),
    /* 6D */ CilInstruction::new("conv.u4", OperandType::None),
    /* 6E */ CilInstruction::new("conv.u8", OperandType::None),
    /* 6F */ CilInstruction::new("callvirt", OperandType::Token),
    /* 70 */ CilInstruction::new("cpobj", OperandType::Token),
    /* 71 */ CilInstruction::new("ldobj", OperandType::Token),
    /* 72 */ CilInstruction::new("ldstr", OperandType::Token),
    /* 73 */ CilInstruction::new("newobj", OperandType::Token),
    /* 74 */ CilInstruction::new("castclass", OperandType::Token),
    /* 75 */ CilInstruction::new("isinst", OperandType::Token),
    /* 76 */ CilInstruction::new("conv.r.un", OperandType::None),
    /* 77 */ CilInstruction::RESERVED,
    /* 78 */ CilInstruction::RESERVED,
    /* 79 */ CilInstruction::new("unbox", OperandType::Token),
    /* 7A */ CilInstruction::new("throw", OperandType::None),
    /* 7B */ CilInstruction::new("ldfld", OperandType::Token),
    /* 7C */ CilInstruction::new("ldflda", OperandType::Token),
    /* 7D */ CilInstruction::new("stfld", OperandType::Token),
    /* 7E */ CilInstruction::new("ldsfld", OperandType::Token),
    /* 7F */ CilInstruction::new("ldsflda", OperandType::Token),
    /* 80 */ CilInstruction::new("stsfld", OperandType::Token),
    /* 81 */ CilInstruction::new("stobj", OperandType::Token),
    /* 82 */ CilInstruction::new("conv.ovf.i1.un", OperandType::None),
    /* 83 */ CilInstruction::new("conv.ovf.i2.un", OperandType::None),
    /* 84 */ CilInstruction::new("conv.ovf.i4.un", OperandType::None),
    /* 85 */ CilInstruction::new("conv.ovf.i8.un", OperandType::None),
    /* 86 */ CilInstruction::new("conv.ovf.u1.un", OperandType::None),
    /* 87 */ CilInstruction::new("conv.ovf.u2.un", OperandType::None),
    /* 88 */ CilInstruction::new("conv.ovf.u4.un", OperandType::None),
    /* 89 */ CilInstruction::new("conv.ovf.u8.un", OperandType::None),
    /* 8A */ CilInstruction::new("conv.ovf.i.un", OperandType::None),
    /* 8B */ CilInstruction::new("conv.ovf.u.un", OperandType::None),
    /* 8C */ CilInstruction::new("box", OperandType::Token),
    /* 8D */ CilInstruction::new("newarr", OperandType::Token),
    /* 8E */ CilInstruction::new("ldlen", OperandType::None),
    /* 8F */ CilInstruction::new("ldelema", OperandType::Token),
    /* 90 */ CilInstruction::new("ldelem.i1", OperandType::None),
    /* 91 */ CilInstruction::new("ldelem.u1", OperandType::None),
    /* 92 */ CilInstruction::new("ldelem.i2", OperandType::None),
    /* 93 */ CilInstruction::new("ldelem.u2", OperandType::None),
    /* 94 */ CilInstruction::new("ldelem.i4", OperandType::None),
    /* 95 */ CilInstruction::new("ldelem.u4", OperandType::None),
    /* 96 */ CilInstruction::new("ldelem.i8", OperandType::None),
    /* 97 */ CilInstruction::new("ldelem.i", OperandType::None),
    /* 98 */ CilInstruction::new("ldelem.r4", OperandType::None),
    /* 99 */ CilInstruction::new("ldelem.r8", OperandType::None),
    /* 9A */ CilInstruction::new("ldelem.ref", OperandType::None),
    /* 9B */ CilInstruction::new("stelem.i", OperandType::None),
    /* 9C */ CilInstruction::new("stelem.i1", OperandType::None),
    /* 9D */ CilInstruction::new("stelem.i2", OperandType::None),
    /* 9E */ CilInstruction::new("stelem.i4", OperandType::None),
    /* 9F */ CilInstruction::new("stelem.i8", OperandType::None),
    /* A0 */ CilInstruction::new("stelem.r4", OperandType::None),
    /* A1 */ CilInstruction::new("stelem.r8", OperandType::None),
    /* A2 */ CilInstruction::new("stelem.ref", OperandType::None),
    /* A3 */ CilInstruction::new("ldelem", OperandType::Token),
    /* A4 */ CilInstruction::new("stelem", OperandType::Token),
    /* A5 */ CilInstruction::new("unbox.any", OperandType::Token),
    /* A6 */ CilInstruction::RESERVED,
    /* A7 */ CilInstruction::RESERVED,
    /* A8 */ CilInstruction::RESERVED,
    /* A9 */ CilInstruction::RESERVED,
    /* AA */ CilInstruction::RESERVED,
    /* AB */ CilInstruction::RESERVED,
    /* AC */ CilInstruction::RESERVED,
    /* AD */ CilInstruction::RESERVED,
    /* AE */ CilInstruction::RESERVED,
    /* AF */ CilInstruction::RESERVED,
    /* B0 */ CilInstruction::RESERVED,
    /* B1 */ CilInstruction::RESERVED,
    /* B2 */ CilInstruction::RESERVED,
    /* B3 */ CilInstruction::new("conv.ovf.i1", OperandType::None),
    /* B4 */ CilInstruction::new("conv.ovf.u1", OperandType::None),
    /* B5 */ CilInstruction::new("conv.ovf.i2", OperandType::None),
    /* B6 */ CilInstruction::new("conv.ovf.u2", OperandType::None),
    /* B7 */ CilInstruction::new("conv.ovf.i4", OperandType::None),
    /* B8 */ CilInstruction::new("conv.ovf.u4", OperandType::None),
    /* B9 */ CilInstruction::new("conv.ovf.i8", OperandType::None),
    /* BA */ CilInstruction::new("conv.ovf.u8", OperandType::None),
    /* BB */ CilInstruction::RESERVED,
    /* BC */ CilInstruction::RESERVED,
    /* BD */ CilInstruction::RESERVED,
    /* BE */ CilInstruction::RESERVED,
    /* BF */ CilInstruction::RESERVED,
    /* C0 */ CilInstruction::RESERVED,
    /* C1 */ CilInstruction::RESERVED,
    /* C2 */ CilInstruction::new("refanyval", OperandType::Token),
    /* C3 */ CilInstruction::new("ckfinite", OperandType::None),
    /* C4 */ CilInstruction::RESERVED,
    /* C5 */ CilInstruction::RESERVED,
    /* C6 */ CilInstruction::new("mkrefany", OperandType::Token),
    /* C7 */ CilInstruction::RESERVED,
    /* C8 */ CilInstruction::RESERVED,
    /* C9 */ CilInstruction::RESERVED,
    /* CA */ CilInstruction::RESERVED,
    /* CB */ CilInstruction::RESERVED,
    /* CC */ CilInstruction::RESERVED,
    /* CD */ CilInstruction::RESERVED,
    /* CE */ CilInstruction::RESERVED,
    /* CF */ CilInstruction::RESERVED,
    /* D0 */ CilInstruction::new("ldtoken", OperandType::Token),
    /* D1 */ CilInstruction::new("conv.u2", OperandType::None),
    /* D2 */ CilInstruction::new("conv.u1", OperandType::None),
    /* D3 */ CilInstruction::new("conv.i", OperandType::None),
    /* D4 */ CilInstruction::new("conv.ovf.i", OperandType::None),
    /* D5 */ CilInstruction::new("conv.ovf.u", OperandType::None),
    /* D6 */ CilInstruction::new("add.ovf", OperandType::None),
    /* D7 */ CilInstruction::new("add.ovf.un", OperandType::None),
    /* D8 */ CilInstruction::new("mul.ovf", OperandType::None),
    /* D9 */ CilInstruction::new("mul.ovf.un", OperandType::None),
    /* DA */ CilInstruction::new("sub.ovf", OperandType::None),
    /* DB */ CilInstruction::new("sub.ovf.un", OperandType::None),
    /* DC */ CilInstruction::new("endfinally", OperandType::None),
    /* DD */ CilInstruction::new("leave", OperandType::Int32),
    /* DE */ CilInstruction::new("leave.s", OperandType::Int8),
    /* DF */ CilInstruction::new("stind.i", OperandType::None),
    /* E0 */ CilInstruction::new("conv.u", OperandType::None),
];

/// `0xFE`-prefixed opcodes, indexed by the second byte
#[rustfmt::skip]
pub static INSTRUCTIONS_FE: [CilInstruction; 31] = [
    /* FE 00 */ CilInstruction::new("arglist", OperandType::None),
    /* FE 01 */ CilInstruction::new("ceq", OperandType::None),
    /* FE 02 */ CilInstruction::new("cgt", OperandType::None),
    /* FE 03 */ CilInstruction::new("cgt.un", OperandType::None),
    /* FE 04 */ CilInstruction::new("clt", OperandType::None),
    /* FE 05 */ CilInstruction::new("clt.un", OperandType::None),
    /* FE 06 */ CilInstruction::new("ldftn", OperandType::Token),
    /* FE 07 */ CilInstruction::new("ldvirtftn", OperandType::Token),
    /* FE 08 */ CilInstruction::RESERVED,
    /* FE 09 */ CilInstruction::new("ldarg", OperandType::UInt16),
    /* FE 0A */ CilInstruction::new("ldarga", OperandType::UInt16),
    /* FE 0B */ CilInstruction::new("starg", OperandType::UInt16),
    /* FE 0C */ CilInstruction::new("ldloc", OperandType::UInt16),
    /* FE 0D */ CilInstruction::new("ldloca", OperandType::UInt16),
    /* FE 0E */ CilInstruction::new("stloc", OperandType::UInt16),
    /* FE 0F */ CilInstruction::new("localloc", OperandType::None),
    /* FE 10 */ CilInstruction::RESERVED,
    /* FE 11 */ CilInstruction::new("endfilter", OperandType::None),
    /* FE 12 */ CilInstruction::new("unaligned.", OperandType::UInt8),
    /* FE 13 */ CilInstruction::new("volatile.", OperandType::None),
    /* FE 14 */ CilInstruction::new("tail.", OperandType::None),
    /* FE 15 */ CilInstruction::new("initobj", OperandType::Token),
    /* FE 16 */ CilInstruction::new("constrained.", OperandType::Token),
    /* FE 17 */ CilInstruction::new("cpblk", OperandType::None),
    /* FE 18 */ CilInstruction::new("initblk", OperandType::None),
    /* FE 19 */ CilInstruction::new("no.", OperandType::UInt8),
    /* FE 1A */ CilInstruction::new("rethrow", OperandType::None),
    /* FE 1B */ CilInstruction::RESERVED,
    /* FE 1C */ CilInstruction::new("sizeof", OperandType::Token),
    /* FE 1D */ CilInstruction::new("refanytype", OperandType::None),
    /* FE 1E */ CilInstruction::new("readonly.", OperandType::None),
];
