//! Compiled rule tables.
//!
//! These are the validated, lookup-friendly forms of the entries of a
//! [`crate::PolicyConfig`]. Every table rejects a second registration of the same identity
//! with a different [`BlockReason`]; a second registration with the same reason is merged.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use crate::{
    metadata::{identity::AssemblyDisplayName, method::MethodAttribute},
    sandbox::result::BlockReason,
    Result,
};

/// Record `reason` in `slot`, failing if a different reason is already there.
pub(crate) fn merge_reason(
    slot: &mut Option<BlockReason>,
    reason: BlockReason,
    identity: impl FnOnce() -> String,
) -> Result<()> {
    match slot {
        Some(existing) if *existing != reason => Err(configuration_error!(
            "conflicting reasons {} and {} for {}",
            existing,
            reason,
            identity()
        )),
        Some(_) => {
            log::trace!("merged duplicate rule for {}", identity());
            Ok(())
        }
        None => {
            *slot = Some(reason);
            Ok(())
        }
    }
}

/// Rules keyed by a declaring type and a member name.
#[derive(Debug, Clone)]
pub struct MemberTable<V> {
    members: HashMap<String, HashMap<String, V>>,
}

impl<V> Default for MemberTable<V> {
    fn default() -> Self {
        MemberTable {
            members: HashMap::new(),
        }
    }
}

impl<V: Default> MemberTable<V> {
    pub(crate) fn entry(&mut self, declaring_type: &str, name: &str) -> &mut V {
        self.members
            .entry(declaring_type.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
    }
}

impl<V> MemberTable<V> {
    /// The rule for `declaring_type::name`, if any.
    #[must_use]
    pub fn get(&self, declaring_type: &str, name: &str) -> Option<&V> {
        self.members.get(declaring_type)?.get(name)
    }

    /// Number of members with a rule.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.values().map(HashMap::len).sum()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.members.values().flat_map(HashMap::values)
    }

    /// Returns `true` if no member has a rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deny rules for one method name on one declaring type.
#[derive(Debug, Clone, Default)]
pub struct MethodRule {
    /// Matches every return type
    pub any_return: Option<BlockReason>,
    /// Matches one return type only
    pub by_return: HashMap<String, BlockReason>,
}

impl MethodRule {
    /// The reason for a method returning `return_type`. Return-type specific rules win.
    #[must_use]
    pub fn reason(&self, return_type: &str) -> Option<BlockReason> {
        self.by_return.get(return_type).copied().or(self.any_return)
    }

    pub(crate) fn len(&self) -> usize {
        usize::from(self.any_return.is_some()) + self.by_return.len()
    }
}

/// Deny rules for one opcode.
#[derive(Debug, Clone, Default)]
pub struct OpcodeRule {
    /// Matches every occurrence
    pub any_operand: Option<BlockReason>,
    /// Matches only occurrences whose operand references this qualified name
    pub by_operand: HashMap<String, BlockReason>,
}

impl OpcodeRule {
    /// The reason for an occurrence referencing `operand`. Operand specific rules win.
    #[must_use]
    pub fn reason(&self, operand: Option<&str>) -> Option<BlockReason> {
        operand
            .and_then(|name| self.by_operand.get(name).copied())
            .or(self.any_operand)
    }

    pub(crate) fn len(&self) -> usize {
        usize::from(self.any_operand.is_some()) + self.by_operand.len()
    }
}

/// A denied assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRule {
    /// The (partial) display name to match
    pub name: AssemblyDisplayName,
    /// Reason reported on a match
    pub reason: BlockReason,
}

/// Attributes every method of one role must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredAttributes {
    /// The required attributes
    pub flags: BTreeSet<MethodAttribute>,
    /// Reason reported when any of them is missing
    pub reason: BlockReason,
}

/// What a naming rule looks for in a simple name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamePattern {
    /// Name starts with the string
    Prefix(String),
    /// Name ends with the string
    Suffix(String),
    /// Name contains the string
    Contains(String),
    /// Name contains a control, whitespace, invisible formatting or private-use character
    NonPrintable,
}

impl NamePattern {
    /// Returns `true` if `name` matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
            NamePattern::Suffix(suffix) => name.ends_with(suffix.as_str()),
            NamePattern::Contains(part) => name.contains(part.as_str()),
            NamePattern::NonPrintable => name.chars().any(is_non_printable),
        }
    }
}

fn is_non_printable(c: char) -> bool {
    c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{00AD}'
                | '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{FEFF}'
                | '\u{E000}'..='\u{F8FF}'
        )
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Prefix(prefix) => write!(f, "prefix '{}'", prefix),
            NamePattern::Suffix(suffix) => write!(f, "suffix '{}'", suffix),
            NamePattern::Contains(part) => write!(f, "contains '{}'", part),
            NamePattern::NonPrintable => f.write_str("non-printable characters"),
        }
    }
}

/// A naming-pattern rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRule {
    /// The pattern
    pub pattern: NamePattern,
    /// Reason reported on a match
    pub reason: BlockReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn merge_same_reason() {
        let mut slot = None;
        merge_reason(&mut slot, BlockReason::Restricted, || "A".to_string()).unwrap();
        merge_reason(&mut slot, BlockReason::Restricted, || "A".to_string()).unwrap();
        assert_eq!(slot, Some(BlockReason::Restricted));
    }

    #[test]
    fn merge_conflicting_reason() {
        let mut slot = Some(BlockReason::Restricted);
        let err = merge_reason(&mut slot, BlockReason::IllegalName, || "type 'A'".to_string())
            .unwrap_err();
        match err {
            Error::Configuration(message) => {
                assert!(message.contains("RESTRICTED"));
                assert!(message.contains("ILLEGAL_NAME"));
                assert!(message.contains("type 'A'"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn member_table() {
        let mut table: MemberTable<Option<BlockReason>> = MemberTable::default();
        *table.entry("System.IO.File", "Delete") = Some(BlockReason::Restricted);

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("System.IO.File", "Delete"),
            Some(&Some(BlockReason::Restricted))
        );
        assert!(table.get("System.IO.File", "Exists").is_none());
        assert!(table.get("System.IO.Directory", "Delete").is_none());
    }

    #[test]
    fn specific_rules_win() {
        let method = MethodRule {
            any_return: Some(BlockReason::Restricted),
            by_return: HashMap::from([("String".to_string(), BlockReason::IllegalName)]),
        };
        assert_eq!(method.reason("String"), Some(BlockReason::IllegalName));
        assert_eq!(method.reason("Void"), Some(BlockReason::Restricted));

        let opcode = OpcodeRule {
            any_operand: None,
            by_operand: HashMap::from([("System.IO.File".to_string(), BlockReason::Restricted)]),
        };
        assert_eq!(opcode.reason(Some("System.IO.File")), Some(BlockReason::Restricted));
        assert_eq!(opcode.reason(Some("System.IO.Path")), None);
        assert_eq!(opcode.reason(None), None);
    }

    #[test]
    fn name_patterns() {
        assert!(NamePattern::Prefix("<".to_string()).matches("<Main>b__0"));
        assert!(NamePattern::Suffix("k__BackingField".to_string()).matches("<X>k__BackingField"));
        assert!(NamePattern::Contains("Inject".to_string()).matches("DoInjectNow"));
        assert!(NamePattern::NonPrintable.matches("a\u{200B}b"));
        assert!(NamePattern::NonPrintable.matches("\u{E001}"));
        assert!(NamePattern::NonPrintable.matches("tab\there"));
        assert!(!NamePattern::NonPrintable.matches("PlainName_1"));
        assert!(!NamePattern::NonPrintable.matches("Überprüfung"));
    }
}
