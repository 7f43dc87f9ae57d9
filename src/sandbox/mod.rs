//! Policy-driven verification of plugin modules.
//!
//! - [`descriptor`] - normalized, comparable [`SymbolDescriptor`]s and their labels
//! - [`classify`] - references and definitions to descriptors
//! - [`policy`] - the rule set, its JSON surface, builder and hot-reload store
//! - [`verifier`] - the scan loop and [`ScanConfig`] limits
//! - [`result`] - [`CheckResult`], [`Violation`] and [`Unverifiable`]
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use cilguard::sandbox::{MethodRole, Verifier};
//! use cilguard::metadata::{builder::*, identity::AssemblyIdentity, method::MethodAttribute};
//! use cilguard::Policy;
//!
//! let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
//! TypeDefBuilder::new().namespace("Plugin").name("Main").build(&mut module)?;
//! MethodDefBuilder::new().name("Helper").private().code([0x2A]).build(&mut module)?;
//!
//! let policy = Policy::builder()
//!     .require_attributes(MethodRole::Method, &[MethodAttribute::Public])
//!     .build()?;
//! let result = Verifier::new(Arc::new(policy)).check(&module.build());
//!
//! assert_eq!(
//!     result.violation().unwrap().illegal_instruction.to_string(),
//!     "[METHOD_ATTRIBUTE] [Public]"
//! );
//! # Ok::<(), cilguard::Error>(())
//! ```

pub mod classify;
mod config;
pub mod descriptor;
pub mod policy;
pub mod result;
mod verifier;

pub use config::ScanConfig;
pub use descriptor::{
    AssemblyRef, AttributeMaskRef, Category, FieldRef, MethodRef, MethodRole, OperandOwner,
    OperandRef, PropertyRef, SymbolDescriptor, TypeRef,
};
pub use policy::{Policy, PolicyBuilder, PolicyConfig, PolicyStore, RuleKind, RuleMatch};
pub use result::{BlockReason, CheckResult, Unverifiable, UnverifiableReason, Violation};
pub use verifier::Verifier;
