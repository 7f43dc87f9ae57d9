//! The deny-rule set a module is verified against.
//!
//! A [`Policy`] is compiled once from a [`PolicyConfig`] (or built fluently with a
//! [`PolicyBuilder`]) and is read-only afterwards. Evaluation is total: every
//! [`SymbolDescriptor`] either matches a rule, yielding the rule's [`BlockReason`], or does not.
//!
//! # Evaluation order
//!
//! For one descriptor the first matching rule wins:
//!
//! 1. the defining assembly against the assembly deny rules, then against the allow-list
//! 2. the type (or a member's declaring type) against the exact type rules, then a type's
//!    direct ancestor against the `include_derived` rules and its defining assembly against
//!    the assembly rules
//! 3. exact method, constructor and field rules
//! 4. property rules, then the accessor's method rules
//! 5. required method attributes
//! 6. opcode rules, operand specific before operand agnostic
//!
//! Naming rules run after the exact rules of the same descriptor. Constructors are exempt
//! from naming rules.

mod builder;
mod config;
mod rules;
mod store;

pub use builder::PolicyBuilder;
pub use config::{
    AssemblyRuleConfig, MemberRuleConfig, MethodRuleConfig, NameRuleConfig, OpcodeRuleConfig,
    PolicyConfig, RequiredAttributesConfig, TypeRuleConfig,
};
pub use rules::{
    AssemblyRule, MemberTable, MethodRule, NamePattern, NameRule, OpcodeRule, RequiredAttributes,
};
pub use store::PolicyStore;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use strum::Display;

use crate::{
    metadata::{
        identity::{AssemblyDisplayName, AssemblyIdentity},
        method::{MethodAttribute, MethodAttributes},
    },
    sandbox::{
        descriptor::{MethodRef, MethodRole, SymbolDescriptor},
        result::BlockReason,
    },
    Result,
};

/// The kind of rule that matched a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RuleKind {
    /// An assembly deny rule
    Assembly,
    /// The assembly allow-list did not contain the defining assembly
    AllowList,
    /// An exact type rule, on the type or on a member's declaring type
    Type,
    /// The direct ancestor matched an `include_derived` rule, or its defining assembly is
    /// denied or not allowed
    BaseType,
    /// A method or constructor rule
    Method,
    /// A field rule
    Field,
    /// A property rule
    Property,
    /// A method rule matched a property accessor
    Accessor,
    /// Required method attributes were missing
    RequiredAttributes,
    /// An opcode rule
    Opcode,
    /// A naming-pattern rule
    Name,
}

/// Which rule matched, and its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleMatch {
    /// The kind of rule
    pub kind: RuleKind,
    /// The rule's reason
    pub reason: BlockReason,
}

impl RuleMatch {
    fn new(kind: RuleKind, reason: BlockReason) -> Self {
        RuleMatch { kind, reason }
    }
}

/// A compiled, immutable set of deny rules.
///
/// An empty policy (`Policy::default()`) denies nothing.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    assemblies: Vec<AssemblyRule>,
    allowed_assemblies: Vec<AssemblyDisplayName>,
    types: HashMap<String, BlockReason>,
    derived: HashMap<String, BlockReason>,
    methods: MemberTable<MethodRule>,
    fields: MemberTable<Option<BlockReason>>,
    properties: MemberTable<Option<BlockReason>>,
    required: BTreeMap<MethodRole, RequiredAttributes>,
    opcodes: HashMap<&'static str, OpcodeRule>,
    names: Vec<NameRule>,
}

impl Policy {
    /// Start building a policy.
    #[must_use]
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    /// Compile a policy document.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the document is inconsistent.
    pub fn from_config(config: PolicyConfig) -> Result<Self> {
        PolicyBuilder::from_config(config).build()
    }

    /// Parse and compile a JSON policy document.
    ///
    /// # Errors
    /// Returns [`crate::Error::Json`] if the document does not parse and
    /// [`crate::Error::Configuration`] if it is inconsistent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilguard::Policy;
    ///
    /// let policy = Policy::from_json(r#"{ "opcodes": [ { "opcode": "calli" } ] }"#)?;
    /// assert_eq!(policy.rule_count(), 1);
    /// # Ok::<(), cilguard::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PolicyConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// Parse and compile a JSON policy document from a reader.
    ///
    /// # Errors
    /// See [`Policy::from_json`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: PolicyConfig = serde_json::from_reader(reader)?;
        Self::from_config(config)
    }

    /// Parse and compile a JSON policy file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, otherwise see
    /// [`Policy::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading policy from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Total number of rules, counting every allow-list entry and every
    /// `include_derived` rule once more.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.assemblies.len()
            + self.allowed_assemblies.len()
            + self.types.len()
            + self.derived.len()
            + self.methods.values().map(MethodRule::len).sum::<usize>()
            + self.fields.len()
            + self.properties.len()
            + self.required.len()
            + self.opcodes.values().map(OpcodeRule::len).sum::<usize>()
            + self.names.len()
    }

    /// Returns `true` if the policy denies nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// The attributes required of methods of `role`, if any.
    #[must_use]
    pub fn required_attributes(&self, role: MethodRole) -> Option<&RequiredAttributes> {
        self.required.get(&role)
    }

    /// The required attributes of `role` that `attributes` lacks.
    #[must_use]
    pub fn missing_attributes(
        &self,
        role: MethodRole,
        attributes: &MethodAttributes,
    ) -> BTreeSet<MethodAttribute> {
        self.required
            .get(&role)
            .map(|required| {
                required
                    .flags
                    .iter()
                    .copied()
                    .filter(|flag| !attributes.contains(*flag))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The reason `descriptor` is denied, if it is.
    #[must_use]
    pub fn evaluate(&self, descriptor: &SymbolDescriptor) -> Option<BlockReason> {
        self.check(descriptor).map(|matched| matched.reason)
    }

    /// The first rule that denies `descriptor`, if any.
    #[must_use]
    pub fn check(&self, descriptor: &SymbolDescriptor) -> Option<RuleMatch> {
        match descriptor {
            SymbolDescriptor::AssemblyRef(assembly) => self.check_assembly(&assembly.identity),
            SymbolDescriptor::TypeRef(ty) => self
                .check_scope(ty.scope.as_ref())
                .or_else(|| self.check_type(&ty.full_name))
                .or_else(|| {
                    ty.declared_base_type
                        .as_ref()
                        .and_then(|base| self.derived.get(base))
                        .map(|reason| RuleMatch::new(RuleKind::BaseType, *reason))
                })
                .or_else(|| {
                    self.check_scope(ty.base_scope.as_ref())
                        .map(|matched| RuleMatch::new(RuleKind::BaseType, matched.reason))
                })
                .or_else(|| self.check_name(ty.simple_name())),
            SymbolDescriptor::MethodRef(method) => self
                .check_scope(method.scope.as_ref())
                .or_else(|| self.check_type(&method.declaring_type_name))
                .or_else(|| self.check_accessor_name(method))
                .or_else(|| self.check_method(method, RuleKind::Method))
                .or_else(|| {
                    if method.is_constructor {
                        None
                    } else {
                        self.check_name(&method.method_name)
                    }
                }),
            SymbolDescriptor::PropertyRef(property) => {
                let accessor = &property.accessor;
                self.check_scope(accessor.scope.as_ref())
                    .or_else(|| self.check_type(&accessor.declaring_type_name))
                    .or_else(|| {
                        self.check_property(&accessor.declaring_type_name, &property.property_name)
                    })
                    .or_else(|| self.check_method(accessor, RuleKind::Accessor))
                    .or_else(|| self.check_name(&property.property_name))
                    .or_else(|| self.check_name(&accessor.method_name))
            }
            SymbolDescriptor::FieldRef(field) => self
                .check_scope(field.scope.as_ref())
                .or_else(|| self.check_type(&field.declaring_type_name))
                .or_else(|| {
                    self.fields
                        .get(&field.declaring_type_name, &field.field_name)
                        .copied()
                        .flatten()
                        .map(|reason| RuleMatch::new(RuleKind::Field, reason))
                })
                .or_else(|| self.check_name(&field.field_name)),
            SymbolDescriptor::AttributeMaskRef(mask) => {
                let required = self.required.get(&mask.applies_to)?;
                mask.missing_flags
                    .iter()
                    .any(|flag| required.flags.contains(flag))
                    .then(|| RuleMatch::new(RuleKind::RequiredAttributes, required.reason))
            }
            SymbolDescriptor::OperandRef(operand) => self
                .opcodes
                .get(operand.opcode_name)
                .and_then(|rule| rule.reason(operand.operand_name.as_deref()))
                .map(|reason| RuleMatch::new(RuleKind::Opcode, reason)),
        }
    }

    fn check_assembly(&self, identity: &AssemblyIdentity) -> Option<RuleMatch> {
        self.assemblies
            .iter()
            .find(|rule| rule.name.matches(identity))
            .map(|rule| RuleMatch::new(RuleKind::Assembly, rule.reason))
    }

    /// Deny rules first; the allow-list only constrains external scopes.
    fn check_scope(&self, scope: Option<&AssemblyIdentity>) -> Option<RuleMatch> {
        let identity = scope?;
        self.check_assembly(identity).or_else(|| {
            let allowed = self.allowed_assemblies.is_empty()
                || self
                    .allowed_assemblies
                    .iter()
                    .any(|name| name.matches(identity));
            (!allowed).then(|| RuleMatch::new(RuleKind::AllowList, BlockReason::Restricted))
        })
    }

    fn check_type(&self, full_name: &str) -> Option<RuleMatch> {
        self.types
            .get(full_name)
            .map(|reason| RuleMatch::new(RuleKind::Type, *reason))
    }

    fn check_property(&self, declaring_type: &str, name: &str) -> Option<RuleMatch> {
        self.properties
            .get(declaring_type, name)
            .copied()
            .flatten()
            .map(|reason| RuleMatch::new(RuleKind::Property, reason))
    }

    /// Member references carry no property information, so `get_X` and `set_X` are checked
    /// against the rules for property `X` of the same type.
    fn check_accessor_name(&self, method: &MethodRef) -> Option<RuleMatch> {
        if method.is_constructor {
            return None;
        }
        let property = method
            .method_name
            .strip_prefix("get_")
            .or_else(|| method.method_name.strip_prefix("set_"))?;
        self.check_property(&method.declaring_type_name, property)
    }

    fn check_method(&self, method: &MethodRef, kind: RuleKind) -> Option<RuleMatch> {
        self.methods
            .get(&method.declaring_type_name, &method.method_name)
            .and_then(|rule| rule.reason(&method.return_type_name))
            .map(|reason| RuleMatch::new(kind, reason))
    }

    fn check_name(&self, name: &str) -> Option<RuleMatch> {
        self.names
            .iter()
            .find(|rule| rule.pattern.matches(name))
            .map(|rule| RuleMatch::new(RuleKind::Name, rule.reason))
    }
}
