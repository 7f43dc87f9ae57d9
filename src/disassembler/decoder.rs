//! CIL instruction decoding.
//!
//! Decoding is a linear sweep: every byte of the code is visited once, in program order,
//! whether or not it is reachable. There is no basic block or control-flow reconstruction.
//!
//! # Example: Decoding a Single Instruction
//!
//! ```rust
//! use cilguard::{Parser, disassembler::decode_instruction};
//! let code = [0x2A]; // ret
//! let mut parser = Parser::new(&code);
//! let instr = decode_instruction(&mut parser)?;
//! assert_eq!(instr.mnemonic, "ret");
//! # Ok::<(), cilguard::Error>(())
//! ```
//!
//! # Example: Walking a Method Body Lazily
//!
//! ```rust
//! use cilguard::disassembler::{CilWalker, InstructionWalker};
//! let code = [0x00, 0x2A, 0xFF]; // nop, ret, <invalid>
//! let mut walk = CilWalker.walk(&code);
//! assert_eq!(walk.next().unwrap()?.mnemonic, "nop");
//! assert_eq!(walk.next().unwrap()?.mnemonic, "ret");
//! assert!(walk.next().unwrap().is_err());
//! assert!(walk.next().is_none());
//! # Ok::<(), cilguard::Error>(())
//! ```

use std::iter::FusedIterator;

use crate::{
    disassembler::{
        opcodes::FE_PREFIX, Immediate, Instruction, Operand, OperandType, INSTRUCTIONS,
        INSTRUCTIONS_FE,
    },
    file::parser::Parser,
    metadata::token::Token,
    Error::OutOfBounds,
    Result,
};

/// Decode the instruction at the parser's current position and advance past it.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for unknown or reserved opcodes and
/// [`crate::Error::OutOfBounds`] if the opcode or its operand is truncated.
pub fn decode_instruction(parser: &mut Parser) -> Result<Instruction> {
    let offset = parser.pos();
    let first_byte = parser.read_le::<u8>()?;

    let (cil_instruction, prefix, opcode) = match first_byte {
        FE_PREFIX => {
            let second_byte = parser.read_le::<u8>()?;

            match INSTRUCTIONS_FE.get(second_byte as usize) {
                Some(instr) => (instr, FE_PREFIX, second_byte),
                None => return Err(malformed_error!("Invalid opcode: FE {:02X}", second_byte)),
            }
        }
        _ => match INSTRUCTIONS.get(first_byte as usize) {
            Some(instr) => (instr, 0, first_byte),
            None => return Err(malformed_error!("Invalid opcode: {:X}", first_byte)),
        },
    };

    if cil_instruction.is_reserved() {
        return Err(malformed_error!(
            "Reserved opcode: {:04X}",
            (u16::from(prefix) << 8) | u16::from(opcode)
        ));
    }

    let operand = match cil_instruction.op_type {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::Int16 => Operand::Immediate(Immediate::Int16(parser.read_le::<i16>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::UInt32 => Operand::Immediate(Immediate::UInt32(parser.read_le::<u32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::UInt64 => Operand::Immediate(Immediate::UInt64(parser.read_le::<u64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::Token => Operand::Token(Token::new(parser.read_le::<u32>()?)),
        OperandType::Switch => {
            let case_count = parser.read_le::<u32>()? as usize;
            // The count is untrusted, never allocate more than the remaining bytes can hold
            if case_count > parser.remaining() / 4 {
                return Err(OutOfBounds);
            }

            let mut targets = Vec::with_capacity(case_count);
            for _ in 0..case_count {
                targets.push(parser.read_le::<i32>()?);
            }

            Operand::Switch(targets)
        }
    };

    Ok(Instruction {
        offset,
        size: parser.pos() - offset,
        opcode,
        prefix,
        mnemonic: cil_instruction.instr,
        operand,
    })
}

/// Lazy, linear decoder over one method's code.
///
/// Yields instructions in program order until the code is exhausted. The first decode error
/// is yielded once, after which the iterator is fused and returns `None`.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    parser: Parser<'a>,
    failed: bool,
}

impl<'a> Instructions<'a> {
    /// Start decoding `code` at offset 0.
    #[must_use]
    pub fn new(code: &'a [u8]) -> Self {
        Instructions {
            parser: Parser::new(code),
            failed: false,
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.parser.has_more_data() {
            return None;
        }

        let result = decode_instruction(&mut self.parser);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl FusedIterator for Instructions<'_> {}

/// Decode all of `code` at once.
///
/// # Errors
/// Returns the first decode error encountered.
pub fn decode_stream(code: &[u8]) -> Result<Vec<Instruction>> {
    Instructions::new(code).collect()
}

/// Turns the raw code of a method body into a lazy instruction sequence.
///
/// The verifier only ever talks to this trait, so hosts targeting a different instruction
/// encoding, or tests wanting to observe decoding, can swap the implementation.
/// Implementations must be finite and restartable: walking the same bytes twice yields the
/// same sequence.
pub trait InstructionWalker: Send + Sync {
    /// Start a walk over `code`.
    fn walk<'a>(&self, code: &'a [u8]) -> Box<dyn Iterator<Item = Result<Instruction>> + 'a>;
}

/// The ECMA-335 CIL [`InstructionWalker`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CilWalker;

impl InstructionWalker for CilWalker {
    fn walk<'a>(&self, code: &'a [u8]) -> Box<dyn Iterator<Item = Result<Instruction>> + 'a> {
        Box::new(Instructions::new(code))
    }
}
