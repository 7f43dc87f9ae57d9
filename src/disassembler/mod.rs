//! CIL instruction decoding.
//!
//! This is the instruction walker of the verifier: it turns a method's raw code into a lazy
//! sequence of [`Instruction`]s, each with its opcode, operand and byte offset.
//!
//! # Key Types
//! - [`Instruction`] - Represents a decoded CIL instruction
//! - [`Operand`] - Instruction operands (immediates, tokens, switch tables)
//! - [`InstructionWalker`] - The seam the verifier decodes through
//! - [`CilWalker`] - The ECMA-335 implementation of [`InstructionWalker`]
//!
//! # Main Functions
//! - [`decode_instruction`] - Decode a single instruction
//! - [`decode_stream`] - Decode a whole method body eagerly
//! - [`lookup_mnemonic`] - Map a mnemonic back to its encoding
//!
//! # Example
//! ```rust
//! use cilguard::disassembler::decode_instruction;
//! use cilguard::Parser;
//! let bytecode = &[0x00, 0x2A]; // nop, ret
//! let mut parser = Parser::new(bytecode);
//! let instruction = decode_instruction(&mut parser)?;
//! assert_eq!(instruction.mnemonic, "nop");
//! # Ok::<(), cilguard::Error>(())
//! ```

mod decoder;
mod instruction;
mod opcodes;

pub use decoder::{decode_instruction, decode_stream, CilWalker, InstructionWalker, Instructions};
pub use instruction::{Immediate, Instruction, Operand, OperandType};
pub use opcodes::{lookup_mnemonic, CilInstruction, FE_PREFIX, INSTRUCTIONS, INSTRUCTIONS_FE};
