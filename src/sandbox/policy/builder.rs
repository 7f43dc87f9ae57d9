//! Compiling a [`PolicyConfig`] into a [`Policy`].

use std::{collections::HashMap, hash::Hash, str::FromStr};

use crate::{
    disassembler::{lookup_mnemonic, CilInstruction, FE_PREFIX, INSTRUCTIONS, INSTRUCTIONS_FE},
    metadata::{identity::AssemblyDisplayName, method::MethodAttribute},
    sandbox::{
        descriptor::MethodRole,
        policy::{
            config::{
                AssemblyRuleConfig, MemberRuleConfig, MethodRuleConfig, NameRuleConfig,
                OpcodeRuleConfig, PolicyConfig, RequiredAttributesConfig, TypeRuleConfig,
            },
            rules::{merge_reason, AssemblyRule, MemberTable, NamePattern, NameRule, RequiredAttributes},
            Policy,
        },
        result::BlockReason,
    },
    Result,
};

/// Record `reason` for `key`, failing if `map` already holds a different one.
fn merge_keyed<K: Eq + Hash>(
    map: &mut HashMap<K, BlockReason>,
    key: K,
    reason: BlockReason,
    identity: impl FnOnce() -> String,
) -> Result<()> {
    let mut slot = map.get(&key).copied();
    merge_reason(&mut slot, reason, identity)?;
    map.insert(key, reason);
    Ok(())
}

fn require_name(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(configuration_error!("{} rule with an empty name", what))
    } else {
        Ok(())
    }
}

/// Fluent construction of a [`Policy`].
///
/// Rules added here carry their default reason (`Restricted`, or `IllegalName` for naming
/// rules). Use [`PolicyBuilder::from_config`] for full control over reasons. Nothing is
/// validated until [`PolicyBuilder::build`].
///
/// # Examples
///
/// ```rust
/// use cilguard::PolicyBuilder;
/// use cilguard::metadata::method::MethodAttribute;
/// use cilguard::sandbox::MethodRole;
///
/// let policy = PolicyBuilder::new()
///     .deny_assembly("System.Net.Http")
///     .deny_type_and_derived("System.Reflection.Emit.DynamicMethod")
///     .deny_method("System.IO.File", "Delete")
///     .require_attributes(MethodRole::Method, &[MethodAttribute::Public])
///     .deny_opcode("localloc")
///     .build()?;
/// assert_eq!(policy.rule_count(), 6);
/// # Ok::<(), cilguard::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    config: PolicyConfig,
}

impl PolicyBuilder {
    /// Start an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a policy document.
    #[must_use]
    pub fn from_config(config: PolicyConfig) -> Self {
        PolicyBuilder { config }
    }

    /// Deny an assembly by (partial) display name.
    #[must_use]
    pub fn deny_assembly(mut self, name: impl Into<String>) -> Self {
        self.config.assemblies.push(AssemblyRuleConfig {
            name: name.into(),
            reason: None,
        });
        self
    }

    /// Add an assembly to the allow-list. Once the list is non-empty, symbols from any other
    /// external assembly are denied.
    #[must_use]
    pub fn allow_assembly(mut self, name: impl Into<String>) -> Self {
        self.config.allowed_assemblies.push(name.into());
        self
    }

    /// Deny a type by full name.
    #[must_use]
    pub fn deny_type(mut self, name: impl Into<String>) -> Self {
        self.config.types.push(TypeRuleConfig {
            name: name.into(),
            include_derived: false,
            reason: None,
        });
        self
    }

    /// Deny a type and every type that derives directly from it.
    #[must_use]
    pub fn deny_type_and_derived(mut self, name: impl Into<String>) -> Self {
        self.config.types.push(TypeRuleConfig {
            name: name.into(),
            include_derived: true,
            reason: None,
        });
        self
    }

    /// Deny every overload of a method or constructor (`.ctor`).
    #[must_use]
    pub fn deny_method(
        mut self,
        declaring_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.config.methods.push(MethodRuleConfig {
            declaring_type: declaring_type.into(),
            name: name.into(),
            return_type: None,
            reason: None,
        });
        self
    }

    /// Deny the overloads of a method that return `return_type`.
    #[must_use]
    pub fn deny_method_returning(
        mut self,
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        return_type: impl Into<String>,
    ) -> Self {
        self.config.methods.push(MethodRuleConfig {
            declaring_type: declaring_type.into(),
            name: name.into(),
            return_type: Some(return_type.into()),
            reason: None,
        });
        self
    }

    /// Deny a field.
    #[must_use]
    pub fn deny_field(mut self, declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        self.config.fields.push(MemberRuleConfig {
            declaring_type: declaring_type.into(),
            name: name.into(),
            reason: None,
        });
        self
    }

    /// Deny a property, through both of its accessors.
    #[must_use]
    pub fn deny_property(
        mut self,
        declaring_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.config.properties.push(MemberRuleConfig {
            declaring_type: declaring_type.into(),
            name: name.into(),
            reason: None,
        });
        self
    }

    /// Require `flags` on every method of `role`.
    #[must_use]
    pub fn require_attributes(mut self, role: MethodRole, flags: &[MethodAttribute]) -> Self {
        self.config.required_attributes.push(RequiredAttributesConfig {
            applies_to: role,
            flags: flags.iter().map(ToString::to_string).collect(),
            reason: None,
        });
        self
    }

    /// Deny every occurrence of an opcode.
    #[must_use]
    pub fn deny_opcode(mut self, mnemonic: impl Into<String>) -> Self {
        self.config.opcodes.push(OpcodeRuleConfig {
            opcode: mnemonic.into(),
            operand: None,
            reason: None,
        });
        self
    }

    /// Deny an opcode only where its operand references `operand`
    /// (`Namespace.Type` or `Namespace.Type.Member`).
    #[must_use]
    pub fn deny_opcode_with_operand(
        mut self,
        mnemonic: impl Into<String>,
        operand: impl Into<String>,
    ) -> Self {
        self.config.opcodes.push(OpcodeRuleConfig {
            opcode: mnemonic.into(),
            operand: Some(operand.into()),
            reason: None,
        });
        self
    }

    /// Deny a naming pattern.
    #[must_use]
    pub fn deny_names(mut self, pattern: NamePattern) -> Self {
        let mut rule = NameRuleConfig::default();
        match pattern {
            NamePattern::Prefix(prefix) => rule.prefix = Some(prefix),
            NamePattern::Suffix(suffix) => rule.suffix = Some(suffix),
            NamePattern::Contains(part) => rule.contains = Some(part),
            NamePattern::NonPrintable => rule.non_printable = true,
        }
        self.config.names.push(rule);
        self
    }

    /// The document built so far.
    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Validate and compile the policy.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if two rules give different reasons for the
    /// same identity, a rule names an empty identity, an assembly name cannot be parsed, an
    /// attribute or opcode name is unknown, or an assembly is both allowed and denied.
    pub fn build(self) -> Result<Policy> {
        let config = self.config;
        let mut policy = Policy::default();

        for rule in &config.assemblies {
            compile_assembly(&mut policy, rule)?;
        }

        for name in &config.allowed_assemblies {
            let parsed = parse_assembly(name)?;
            if policy
                .assemblies
                .iter()
                .any(|rule| rule.name.is_equivalent(&parsed))
            {
                return Err(configuration_error!(
                    "assembly '{}' is both allowed and denied",
                    name
                ));
            }
            if !policy
                .allowed_assemblies
                .iter()
                .any(|allowed| allowed.is_equivalent(&parsed))
            {
                policy.allowed_assemblies.push(parsed);
            }
        }

        for rule in &config.types {
            require_name(&rule.name, "type")?;
            let reason = rule.reason.unwrap_or_default();
            merge_keyed(&mut policy.types, rule.name.clone(), reason, || {
                format!("type '{}'", rule.name)
            })?;
            if rule.include_derived {
                merge_keyed(&mut policy.derived, rule.name.clone(), reason, || {
                    format!("types derived from '{}'", rule.name)
                })?;
            }
        }

        for rule in &config.methods {
            require_name(&rule.declaring_type, "method")?;
            require_name(&rule.name, "method")?;
            let reason = rule.reason.unwrap_or_default();
            let method = policy.methods.entry(&rule.declaring_type, &rule.name);
            match &rule.return_type {
                Some(return_type) => {
                    require_name(return_type, "method")?;
                    merge_keyed(&mut method.by_return, return_type.clone(), reason, || {
                        format!(
                            "method '{} {}.{}'",
                            return_type, rule.declaring_type, rule.name
                        )
                    })?;
                }
                None => merge_reason(&mut method.any_return, reason, || {
                    format!("method '{}.{}'", rule.declaring_type, rule.name)
                })?,
            }
        }

        for rule in &config.fields {
            compile_member(&mut policy.fields, rule, "field")?;
        }

        for rule in &config.properties {
            compile_member(&mut policy.properties, rule, "property")?;
        }

        for rule in &config.required_attributes {
            compile_required(&mut policy, rule)?;
        }

        for rule in &config.opcodes {
            compile_opcode(&mut policy, rule)?;
        }

        for rule in &config.names {
            compile_name(&mut policy, rule)?;
        }

        log::debug!("compiled policy with {} rules", policy.rule_count());
        Ok(policy)
    }
}

fn parse_assembly(name: &str) -> Result<AssemblyDisplayName> {
    require_name(name, "assembly")?;
    AssemblyDisplayName::parse(name)
        .map_err(|error| configuration_error!("invalid assembly name '{}': {}", name, error))
}

fn compile_assembly(policy: &mut Policy, rule: &AssemblyRuleConfig) -> Result<()> {
    let name = parse_assembly(&rule.name)?;
    let reason = rule.reason.unwrap_or_default();

    match policy
        .assemblies
        .iter()
        .find(|existing| existing.name.is_equivalent(&name))
    {
        Some(existing) => {
            let mut slot = Some(existing.reason);
            merge_reason(&mut slot, reason, || format!("assembly '{}'", rule.name))
        }
        None => {
            policy.assemblies.push(AssemblyRule { name, reason });
            Ok(())
        }
    }
}

fn compile_member(
    table: &mut MemberTable<Option<BlockReason>>,
    rule: &MemberRuleConfig,
    what: &str,
) -> Result<()> {
    require_name(&rule.declaring_type, what)?;
    require_name(&rule.name, what)?;
    merge_reason(
        table.entry(&rule.declaring_type, &rule.name),
        rule.reason.unwrap_or_default(),
        || format!("{} '{}.{}'", what, rule.declaring_type, rule.name),
    )
}

fn compile_required(policy: &mut Policy, rule: &RequiredAttributesConfig) -> Result<()> {
    if rule.flags.is_empty() {
        return Err(configuration_error!(
            "required attribute rule for {} lists no flags",
            rule.applies_to
        ));
    }

    let flags = rule
        .flags
        .iter()
        .map(|flag| {
            MethodAttribute::from_str(flag.trim())
                .map_err(|_| configuration_error!("unknown method attribute '{}'", flag))
        })
        .collect::<Result<Vec<_>>>()?;

    let reason = rule.reason.unwrap_or_default();
    match policy.required.get_mut(&rule.applies_to) {
        Some(existing) => {
            let mut slot = Some(existing.reason);
            merge_reason(&mut slot, reason, || {
                format!("required attributes of {}", rule.applies_to)
            })?;
            existing.flags.extend(flags);
        }
        None => {
            policy.required.insert(
                rule.applies_to,
                RequiredAttributes {
                    flags: flags.into_iter().collect(),
                    reason,
                },
            );
        }
    }
    Ok(())
}

fn compile_opcode(policy: &mut Policy, rule: &OpcodeRuleConfig) -> Result<()> {
    let (prefix, opcode) = lookup_mnemonic(rule.opcode.trim())
        .ok_or_else(|| configuration_error!("unknown opcode '{}'", rule.opcode))?;
    let table: &[CilInstruction] = if prefix == FE_PREFIX {
        &INSTRUCTIONS_FE
    } else {
        &INSTRUCTIONS
    };
    let mnemonic = table
        .get(opcode as usize)
        .map(|entry| entry.instr)
        .ok_or_else(|| configuration_error!("unknown opcode '{}'", rule.opcode))?;

    let reason = rule.reason.unwrap_or_default();
    let entry = policy.opcodes.entry(mnemonic).or_default();
    match &rule.operand {
        Some(operand) => {
            require_name(operand, "opcode operand")?;
            merge_keyed(&mut entry.by_operand, operand.clone(), reason, || {
                format!("opcode '{}' on '{}'", mnemonic, operand)
            })?;
        }
        None => merge_reason(&mut entry.any_operand, reason, || {
            format!("opcode '{}'", mnemonic)
        })?,
    }
    Ok(())
}

fn compile_name(policy: &mut Policy, rule: &NameRuleConfig) -> Result<()> {
    let mut patterns = Vec::new();
    if let Some(prefix) = &rule.prefix {
        patterns.push(NamePattern::Prefix(prefix.clone()));
    }
    if let Some(suffix) = &rule.suffix {
        patterns.push(NamePattern::Suffix(suffix.clone()));
    }
    if let Some(part) = &rule.contains {
        patterns.push(NamePattern::Contains(part.clone()));
    }
    if rule.non_printable {
        patterns.push(NamePattern::NonPrintable);
    }

    let pattern = match patterns.len() {
        1 => patterns.remove(0),
        _ => {
            return Err(configuration_error!(
                "name rule must set exactly one of prefix, suffix, contains or non_printable"
            ))
        }
    };
    if let NamePattern::Prefix(text) | NamePattern::Suffix(text) | NamePattern::Contains(text) =
        &pattern
    {
        if text.is_empty() {
            return Err(configuration_error!("name rule with an empty pattern"));
        }
    }

    let reason = rule.reason.unwrap_or(BlockReason::IllegalName);
    match policy.names.iter().find(|existing| existing.pattern == pattern) {
        Some(existing) => {
            let mut slot = Some(existing.reason);
            merge_reason(&mut slot, reason, || format!("name rule {}", pattern))
        }
        None => {
            policy.names.push(NameRule { pattern, reason });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn configuration_message(result: Result<Policy>) -> String {
        match result {
            Err(Error::Configuration(message)) => message,
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn duplicates_with_equal_reasons_merge() {
        let policy = PolicyBuilder::new()
            .deny_assembly("System.IO")
            .deny_assembly("System.IO")
            .deny_type("System.IO.File")
            .deny_type("System.IO.File")
            .deny_method("System.IO.File", "Delete")
            .deny_method("System.IO.File", "Delete")
            .deny_opcode("localloc")
            .deny_opcode("LOCALLOC")
            .build()
            .unwrap();
        assert_eq!(policy.rule_count(), 4);
    }

    #[test]
    fn conflicting_reasons_are_rejected() {
        let config: PolicyConfig = serde_json::from_str(
            r#"{ "types": [
                { "name": "System.IO.File" },
                { "name": "System.IO.File", "reason": "illegal_name" }
            ] }"#,
        )
        .unwrap();
        let message = configuration_message(PolicyBuilder::from_config(config).build());
        assert!(message.contains("System.IO.File"));

        let config: PolicyConfig = serde_json::from_str(
            r#"{ "methods": [
                { "declaring_type": "A", "name": "B", "return_type": "Void" },
                { "declaring_type": "A", "name": "B", "return_type": "Void", "reason": "illegal_name" }
            ] }"#,
        )
        .unwrap();
        configuration_message(PolicyBuilder::from_config(config).build());

        let config: PolicyConfig = serde_json::from_str(
            r#"{ "required_attributes": [
                { "applies_to": "method", "flags": [ "Public" ] },
                { "applies_to": "method", "flags": [ "Static" ], "reason": "illegal_name" }
            ] }"#,
        )
        .unwrap();
        configuration_message(PolicyBuilder::from_config(config).build());
    }

    #[test]
    fn different_identities_do_not_conflict() {
        let config: PolicyConfig = serde_json::from_str(
            r#"{ "methods": [
                { "declaring_type": "A", "name": "B" },
                { "declaring_type": "A", "name": "B", "return_type": "String", "reason": "illegal_name" }
            ] }"#,
        )
        .unwrap();
        assert!(PolicyBuilder::from_config(config).build().is_ok());
    }

    #[test]
    fn invalid_rules_are_rejected() {
        configuration_message(PolicyBuilder::new().deny_type("").build());
        configuration_message(PolicyBuilder::new().deny_method("System.IO.File", " ").build());
        configuration_message(PolicyBuilder::new().deny_assembly("").build());
        configuration_message(
            PolicyBuilder::new()
                .deny_assembly("System.IO, Flavor=Strawberry")
                .build(),
        );
        configuration_message(PolicyBuilder::new().deny_opcode("not.an.opcode").build());
        configuration_message(
            PolicyBuilder::new()
                .deny_names(NamePattern::Prefix(String::new()))
                .build(),
        );
        configuration_message(
            PolicyBuilder::new()
                .require_attributes(MethodRole::Method, &[])
                .build(),
        );

        let config: PolicyConfig = serde_json::from_str(
            r#"{ "required_attributes": [ { "applies_to": "method", "flags": [ "Sneaky" ] } ] }"#,
        )
        .unwrap();
        let message = configuration_message(PolicyBuilder::from_config(config).build());
        assert!(message.contains("Sneaky"));

        let config: PolicyConfig =
            serde_json::from_str(r#"{ "names": [ { "prefix": "<", "suffix": ">" } ] }"#).unwrap();
        configuration_message(PolicyBuilder::from_config(config).build());
    }

    #[test]
    fn allowed_and_denied_assembly_is_rejected() {
        let message = configuration_message(
            PolicyBuilder::new()
                .deny_assembly("System.IO")
                .allow_assembly("System.IO")
                .build(),
        );
        assert!(message.contains("both allowed and denied"));
    }

    #[test]
    fn assembly_rules_compare_names_case_insensitively() {
        let config: PolicyConfig = serde_json::from_str(
            r#"{ "assemblies": [
                { "name": "System.IO" },
                { "name": "system.io", "reason": "illegal_name" }
            ] }"#,
        )
        .unwrap();
        let message = configuration_message(PolicyBuilder::from_config(config).build());
        assert!(message.contains("system.io"));

        let message = configuration_message(
            PolicyBuilder::new()
                .deny_assembly("System.IO")
                .allow_assembly("system.io")
                .build(),
        );
        assert!(message.contains("both allowed and denied"));

        let policy = PolicyBuilder::new()
            .deny_assembly("System.IO")
            .deny_assembly("SYSTEM.IO")
            .allow_assembly("mscorlib")
            .allow_assembly("MSCorLib")
            .build()
            .unwrap();
        assert_eq!(policy.rule_count(), 2);
    }

    #[test]
    fn required_attributes_merge() {
        let policy = PolicyBuilder::new()
            .require_attributes(MethodRole::Method, &[MethodAttribute::Public])
            .require_attributes(MethodRole::Method, &[MethodAttribute::HideBySig])
            .build()
            .unwrap();
        let required = policy.required_attributes(MethodRole::Method).unwrap();
        assert_eq!(required.flags.len(), 2);
        assert!(policy.required_attributes(MethodRole::Constructor).is_none());
    }
}
