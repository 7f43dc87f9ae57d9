//! # cilguard Prelude
//!
//! The types a host needs to build a module, compile a policy and verify the one against
//! the other.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilguard operations
pub use crate::Error;

/// The result type used throughout cilguard
pub use crate::Result;

// ================================================================================================
// Verification
// ================================================================================================

/// The verifier and its limits
pub use crate::sandbox::{ScanConfig, Verifier};

/// Verification outcomes
pub use crate::sandbox::{
    BlockReason, CheckResult, Unverifiable, UnverifiableReason, Violation,
};

/// Policies, their configuration surface and hot-reload store
pub use crate::sandbox::{
    policy::NamePattern, Policy, PolicyBuilder, PolicyConfig, PolicyStore, RuleKind, RuleMatch,
};

/// Symbol descriptors
pub use crate::sandbox::{Category, MethodRole, SymbolDescriptor};

// ================================================================================================
// Module Model
// ================================================================================================

/// Metadata tokens
pub use crate::metadata::token::Token;

/// Assembly identities
pub use crate::metadata::identity::{AssemblyDisplayName, AssemblyIdentity, AssemblyVersion};

/// Methods, their attributes and bodies
pub use crate::metadata::method::{
    MethodAccess, MethodAttribute, MethodAttributes, MethodBody, MethodDef, MethodModifiers,
};

/// Declared types and members
pub use crate::metadata::typesystem::{FieldDef, PropertyDef, TypeDef};

/// Token targets
pub use crate::metadata::references::{FieldReference, MethodReference, Reference, TypeReference};

/// The module aggregate and its builders
pub use crate::metadata::{
    builder::{FieldDefBuilder, MethodDefBuilder, ModuleBuilder, PropertyDefBuilder, TypeDefBuilder},
    module::Module,
};

// ================================================================================================
// Disassembly
// ================================================================================================

/// Instruction decoding
pub use crate::disassembler::{
    decode_instruction, decode_stream, CilWalker, Instruction, InstructionWalker, Operand,
};

/// Low-level byte cursor
pub use crate::Parser;
