//! The declarative policy document.
//!
//! [`PolicyConfig`] is the serde surface of a [`crate::Policy`]: plain strings and lists,
//! exactly as an operator writes them. Nothing is validated here; compiling the document
//! with [`crate::PolicyBuilder`] parses names, resolves mnemonics and rejects ambiguity.
//!
//! # Example
//!
//! ```json
//! {
//!   "assemblies": [ { "name": "System.Net.Http" } ],
//!   "allowed_assemblies": [ "mscorlib", "System.Runtime", "Host.Api" ],
//!   "types": [ { "name": "System.Reflection.Emit.DynamicMethod", "include_derived": true } ],
//!   "methods": [ { "declaring_type": "System.IO.File", "name": "Delete" } ],
//!   "fields": [ { "declaring_type": "System.IntPtr", "name": "Zero" } ],
//!   "properties": [ { "declaring_type": "System.Environment", "name": "CurrentDirectory" } ],
//!   "required_attributes": [ { "applies_to": "method", "flags": [ "Public" ] } ],
//!   "opcodes": [ { "opcode": "localloc" }, { "opcode": "call", "operand": "System.Runtime.InteropServices.Marshal.Copy" } ],
//!   "names": [ { "prefix": "<", "reason": "illegal_name" }, { "non_printable": true } ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::sandbox::{descriptor::MethodRole, result::BlockReason};

/// Deny an assembly by (partial) display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyRuleConfig {
    /// Display name; a bare simple name matches every version
    pub name: String,
    /// Defaults to `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// Deny a type, optionally together with every type deriving directly from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeRuleConfig {
    /// `Namespace.Name`
    pub name: String,
    /// Also deny types whose direct ancestor is this type
    #[serde(default)]
    pub include_derived: bool,
    /// Defaults to `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// Deny a method or constructor (`.ctor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodRuleConfig {
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Method name
    pub name: String,
    /// Simple name of the return type; absent matches every overload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Defaults to `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// Deny a field or a property, by declaring type and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberRuleConfig {
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Member name
    pub name: String,
    /// Defaults to `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// Require attributes on every method of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequiredAttributesConfig {
    /// `method`, `constructor` or `accessor`
    pub applies_to: MethodRole,
    /// Attribute names as in `System.Reflection.MethodAttributes` (`Public`, `Static`, ...)
    pub flags: Vec<String>,
    /// Defaults to `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// Deny an opcode, anywhere or only with one operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpcodeRuleConfig {
    /// Mnemonic, e.g. `localloc` or `calli`
    pub opcode: String,
    /// Qualified name of the referenced symbol (`Namespace.Type` or `Namespace.Type.Member`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<String>,
    /// Defaults to `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// A naming-pattern rule. Exactly one pattern must be given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NameRuleConfig {
    /// Names starting with this string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Names ending with this string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Names containing this string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    /// Names containing control or other non-printable characters
    pub non_printable: bool,
    /// Defaults to `illegal_name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

/// A complete policy document. Every section is optional; an empty document allows
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Denied assemblies
    pub assemblies: Vec<AssemblyRuleConfig>,
    /// When non-empty, symbols from any other external assembly are denied
    pub allowed_assemblies: Vec<String>,
    /// Denied types
    pub types: Vec<TypeRuleConfig>,
    /// Denied methods and constructors
    pub methods: Vec<MethodRuleConfig>,
    /// Denied fields
    pub fields: Vec<MemberRuleConfig>,
    /// Denied properties
    pub properties: Vec<MemberRuleConfig>,
    /// Required method attributes
    pub required_attributes: Vec<RequiredAttributesConfig>,
    /// Denied opcodes
    pub opcodes: Vec<OpcodeRuleConfig>,
    /// Naming-pattern rules
    pub names: Vec<NameRuleConfig>,
}

impl PolicyConfig {
    /// Returns `true` if the document contains no rule at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &PolicyConfig::default()
    }
}
