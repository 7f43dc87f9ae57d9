//! Decoded CIL instruction representation.
//!
//! # Key Components
//!
//! - [`Instruction`] - One decoded instruction: opcode, operand, offset and size
//! - [`Operand`] - Type-safe operand representation
//! - [`Immediate`] - Immediate value types
//! - [`OperandType`] - Operand encoding, as listed in the opcode tables
//!
//! # Usage Examples
//!
//! ```rust
//! use cilguard::disassembler::{Immediate, Operand, OperandType};
//!
//! let operand = Operand::Immediate(Immediate::Int32(42));
//! assert_eq!(OperandType::Int32.size(), Some(4));
//! assert!(operand.token().is_none());
//! ```

use std::fmt::{self, UpperHex};

use crate::metadata::token::Token;

/// Types of operands for CIL instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Metadata token reference
    Token,
    /// Switch table operand
    Switch,
}

impl OperandType {
    /// Returns the size in bytes of this operand type.
    ///
    /// Returns `None` for `Switch`, whose size depends on the encoded case count.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 => Some(1),
            OperandType::Int16 | OperandType::UInt16 => Some(2),
            OperandType::Int32
            | OperandType::UInt32
            | OperandType::Float32
            | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::UInt64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// An immediate value embedded in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Unsigned 8-bit immediate value
    UInt8(u8),
    /// Signed 16-bit immediate value
    Int16(i16),
    /// Unsigned 16-bit immediate value
    UInt16(u16),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Unsigned 32-bit immediate value
    UInt32(u32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// Unsigned 64-bit immediate value
    UInt64(u64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

impl UpperHex for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value:02X}"),
            Immediate::UInt8(value) => write!(f, "{value:02X}"),
            Immediate::Int16(value) => write!(f, "{value:04X}"),
            Immediate::UInt16(value) => write!(f, "{value:04X}"),
            Immediate::Int32(value) => write!(f, "{value:08X}"),
            Immediate::UInt32(value) => write!(f, "{value:08X}"),
            Immediate::Int64(value) => write!(f, "{value:016X}"),
            Immediate::UInt64(value) => write!(f, "{value:016X}"),
            Immediate::Float32(value) => write!(f, "{:08X}", value.to_bits()),
            Immediate::Float64(value) => write!(f, "{:016X}", value.to_bits()),
        }
    }
}

/// The operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Immediate value (constants, local / argument indices, branch displacements)
    Immediate(Immediate),
    /// Metadata token (`call`, `newobj`, `ldfld`, `ldstr`, ...)
    Token(Token),
    /// Branch displacements of a `switch`, relative to the next instruction
    Switch(Vec<i32>),
}

impl Operand {
    /// The token, if this operand is one.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self {
            Operand::Token(token) => Some(*token),
            _ => None,
        }
    }
}

/// A single decoded CIL instruction.
///
/// Produced only by the decoder, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of the instruction within the method's code
    pub offset: usize,
    /// Encoded size in bytes, prefix and operand included
    pub size: usize,
    /// Primary opcode byte
    pub opcode: u8,
    /// Prefix byte (0 if no prefix)
    pub prefix: u8,
    /// Instruction mnemonic (e.g. `call`, `ldsfld`)
    pub mnemonic: &'static str,
    /// Decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// The metadata token operand, if any.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.operand.token()
    }

    /// Offset of the instruction that follows this one.
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset, self.mnemonic)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, " 0x{:X}", value),
            Operand::Token(token) => write!(f, " {}", token),
            Operand::Switch(targets) => write!(f, " ({} targets)", targets.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_sizes() {
        assert_eq!(OperandType::None.size(), Some(0));
        assert_eq!(OperandType::UInt16.size(), Some(2));
        assert_eq!(OperandType::Token.size(), Some(4));
        assert_eq!(OperandType::Float64.size(), Some(8));
        assert_eq!(OperandType::Switch.size(), None);
    }

    #[test]
    fn immediate_hex() {
        assert_eq!(format!("{:X}", Immediate::Int8(-1)), "FF");
        assert_eq!(format!("{:X}", Immediate::UInt16(0x1234)), "1234");
        assert_eq!(format!("{:X}", Immediate::Float32(1.0)), "3F800000");
    }

    #[test]
    fn instruction_display() {
        let instruction = Instruction {
            offset: 0x1A,
            size: 5,
            opcode: 0x28,
            prefix: 0,
            mnemonic: "call",
            operand: Operand::Token(Token::new(0x0A00_0001)),
        };
        assert_eq!(instruction.to_string(), "IL_001A: call 0x0a000001");
        assert_eq!(instruction.next_offset(), 0x1F);
        assert_eq!(instruction.token(), Some(Token::new(0x0A00_0001)));
    }
}
