// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cilguard
//!
//! A static bytecode verifier that decides whether an untrusted .NET plugin may be activated
//! inside a long-lived host. Every method body of the plugin is decoded, every symbol it
//! references is classified, and the first symbol a [`Policy`] denies is reported together
//! with the exact instruction that referenced it.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cilguard::prelude::*;
//!
//! // The host hands over an already-loaded module
//! let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
//! let delete = module.member_ref(MethodReference::new(
//!     TypeReference::new("System.IO", "File").with_scope(AssemblyIdentity::simple("System.IO")),
//!     "Delete",
//!     "Void",
//! ));
//! TypeDefBuilder::new().namespace("Plugin").name("Main").build(&mut module)?;
//! MethodDefBuilder::new()
//!     .name("Run")
//!     .public()
//!     .code([vec![0x28], delete.value().to_le_bytes().to_vec(), vec![0x2A]].concat())
//!     .build(&mut module)?;
//!
//! let policy = Policy::from_json(r#"{ "assemblies": [ { "name": "System.IO" } ] }"#)?;
//! let verifier = Verifier::new(Arc::new(policy));
//!
//! match verifier.check(&module.build()) {
//!     CheckResult::Passed => println!("activate"),
//!     CheckResult::Rejected(violation) => println!("denied: {}", violation),
//!     CheckResult::Unverifiable(reason) => println!("refused: {}", reason),
//! }
//! # Ok::<(), cilguard::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - the module model handed over by the host
//! - [`disassembler`] - ECMA-335 CIL decoding behind the [`disassembler::InstructionWalker`] seam
//! - [`sandbox`] - descriptors, policy, verifier and results
//! - [`file`] - the bounds-checked byte cursor the decoder reads through
//! - [`prelude`] - convenient re-exports
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Verdicts
//!
//! [`Verifier::check`] returns a [`CheckResult`]. Only [`CheckResult::Passed`] permits
//! loading. A module that cannot be fully analysed (corrupt body, dangling token, exhausted
//! [`ScanConfig`] limits) is [`CheckResult::Unverifiable`] and must be refused as well.
//!
//! ## Policies
//!
//! Policies are JSON documents ([`PolicyConfig`]) or built with [`PolicyBuilder`]. An
//! ambiguous policy, one that gives two different reasons for the same identity, is
//! rejected when it is built, never during a scan. [`PolicyStore`] swaps policies
//! atomically for hosts that reload them at runtime.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: rule compilation and verdicts at `debug`,
//! per-method decoding at `trace`, refused modules and rejected reloads at `warn`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Bounds-checked little-endian reading of method bodies
pub mod file;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilguard::prelude::*;
///
/// let policy = Policy::builder().deny_opcode("localloc").build()?;
/// assert_eq!(policy.rule_count(), 1);
/// # Ok::<(), cilguard::Error>(())
/// ```
pub mod prelude;

/// Instructions, decoder and walker based on ECMA-335
pub mod disassembler;

/// The module model: identities, types, methods, bodies and token references
pub mod metadata;

/// Symbol classification, policies and the verifier
pub mod sandbox;

/// `cilguard` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilguard` Error type
///
/// Policy construction fails with [`Error::Configuration`], [`Error::Json`] or
/// [`Error::FileError`]; decoding fails with [`Error::Malformed`], [`Error::OutOfBounds`] or
/// [`Error::Empty`]. Verification itself never fails: its outcome is a [`CheckResult`].
///
/// # Examples
///
/// ```rust
/// use cilguard::{Error, Policy};
///
/// match Policy::from_json(r#"{ "opcodes": [ { "opcode": "jump.to.moon" } ] }"#) {
///     Ok(_) => unreachable!(),
///     Err(Error::Configuration(message)) => assert!(message.contains("jump.to.moon")),
///     Err(e) => panic!("unexpected error {}", e),
/// }
/// ```
pub use error::Error;

/// Low-level byte cursor used by the instruction decoder.
///
/// # Example
///
/// ```rust
/// use cilguard::{Parser, disassembler::decode_instruction};
/// let code = [0x2A]; // ret
/// let mut parser = Parser::new(&code);
/// let instr = decode_instruction(&mut parser)?;
/// assert_eq!(instr.mnemonic, "ret");
/// # Ok::<(), cilguard::Error>(())
/// ```
pub use file::parser::Parser;

pub use metadata::{builder::ModuleBuilder, module::Module};
pub use sandbox::{
    BlockReason, CheckResult, Policy, PolicyBuilder, PolicyConfig, PolicyStore, ScanConfig,
    SymbolDescriptor, Unverifiable, UnverifiableReason, Verifier, Violation,
};
