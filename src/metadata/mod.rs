//! The module model the verifier consumes.
//!
//! This is the input boundary of the crate: a host that has already loaded a plugin hands
//! over a [`module::Module`] carrying the plugin's assembly identity, its declared types with
//! their methods, fields and properties, and the table that resolves the metadata tokens
//! found in method bodies.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references used throughout .NET
//! - [`identity`] - Assembly identities and (partial) display names
//! - [`method`] - Method attributes and tiny / fat method body headers
//! - [`typesystem`] - Declared types, fields and properties
//! - [`references`] - What a token inside a method body points at
//! - [`module`] - The [`module::Module`] aggregate
//! - [`builder`] - Fluent [`module::Module`] construction for thin loaders and tests
//!
//! # Examples
//!
//! ```rust
//! use cilguard::metadata::method::MethodBody;
//!
//! // A tiny header followed by `ldnull; ret`
//! let body = MethodBody::parse(&[0x0A, 0x14, 0x2A])?;
//! assert_eq!(body.code, vec![0x14, 0x2A]);
//! # Ok::<(), cilguard::Error>(())
//! ```

/// Fluent construction of modules
pub mod builder;
/// Assembly identities and display names
pub mod identity;
/// Method definitions, attributes and bodies
pub mod method;
/// The module aggregate handed to the verifier
pub mod module;
/// Symbols referenced from method bodies
pub mod references;
/// Metadata tokens
pub mod token;
/// Declared types, fields and properties
pub mod typesystem;
