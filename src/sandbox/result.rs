//! The verdict of a verification run.
//!
//! A [`CheckResult`] has three states. `Passed` is the only one that permits loading;
//! `Rejected` carries the first policy [`Violation`]; `Unverifiable` says the module could not
//! be fully analysed (corrupt body, unresolvable token, exhausted limits) and must be refused
//! just the same. Hosts can tell the last two apart for diagnostics only.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{metadata::token::Token, sandbox::descriptor::SymbolDescriptor};

/// Why a rule blocks a symbol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    /// Present on an explicit deny-list, or missing from an allow-list
    #[default]
    Restricted,
    /// Fails a naming-pattern rule
    IllegalName,
}

/// A disallowed symbol and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Violation {
    /// The symbol a rule matched
    pub illegal_instruction: SymbolDescriptor,
    /// Where it was found: usually an operand position, the type or assembly for
    /// definition-level violations
    pub position: SymbolDescriptor,
    /// The reason attached to the matched rule
    pub reason: BlockReason,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocked ({}) at {}",
            self.illegal_instruction, self.reason, self.position
        )
    }
}

/// Why a module could not be fully analysed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnverifiableReason {
    /// A method body or header could not be decoded
    Decode(String),
    /// A symbol token did not resolve through the module's reference table
    UnresolvedToken(Token),
    /// A member or type instruction carried a token from a table that holds no symbols
    UnexpectedToken {
        /// Mnemonic of the instruction
        opcode: &'static str,
        /// The token it carried
        token: Token,
    },
    /// A method body exceeded [`crate::ScanConfig::max_body_size`]
    BodyTooLarge {
        /// Code size of the offending body
        size: usize,
        /// Configured limit
        limit: usize,
    },
    /// [`crate::ScanConfig::time_budget`] ran out before the scan finished
    BudgetExceeded,
}

impl fmt::Display for UnverifiableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnverifiableReason::Decode(message) => write!(f, "undecodable body: {}", message),
            UnverifiableReason::UnresolvedToken(token) => {
                write!(f, "unresolved token {}", token)
            }
            UnverifiableReason::UnexpectedToken { opcode, token } => {
                write!(f, "{} on non-symbol token {}", opcode, token)
            }
            UnverifiableReason::BodyTooLarge { size, limit } => {
                write!(f, "body of {} bytes exceeds the limit of {} bytes", size, limit)
            }
            UnverifiableReason::BudgetExceeded => f.write_str("time budget exceeded"),
        }
    }
}

/// The "could not verify" marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unverifiable {
    /// Where analysis stopped, when it stopped inside a method
    pub location: Option<SymbolDescriptor>,
    /// What went wrong
    pub reason: UnverifiableReason,
}

impl fmt::Display for Unverifiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "could not verify {}: {}", location, self.reason),
            None => write!(f, "could not verify: {}", self.reason),
        }
    }
}

/// Outcome of [`crate::Verifier::check`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckResult {
    /// No rule matched anywhere in the module
    Passed,
    /// The first violation found
    Rejected(Violation),
    /// The module could not be fully analysed
    Unverifiable(Unverifiable),
}

impl CheckResult {
    /// `true` iff neither a violation nor a could-not-verify marker is present.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, CheckResult::Passed)
    }

    /// The violation, if the module was rejected by policy.
    #[must_use]
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            CheckResult::Rejected(violation) => Some(violation),
            _ => None,
        }
    }

    /// The could-not-verify marker, if analysis did not complete.
    #[must_use]
    pub fn unverifiable(&self) -> Option<&Unverifiable> {
        match self {
            CheckResult::Unverifiable(unverifiable) => Some(unverifiable),
            _ => None,
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Passed => f.write_str("passed"),
            CheckResult::Rejected(violation) => write!(f, "rejected: {}", violation),
            CheckResult::Unverifiable(unverifiable) => write!(f, "{}", unverifiable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::identity::AssemblyIdentity, sandbox::descriptor::AssemblyRef};

    fn assembly() -> SymbolDescriptor {
        SymbolDescriptor::AssemblyRef(AssemblyRef::new(AssemblyIdentity::simple("Evil")))
    }

    #[test]
    fn reason_names() {
        assert_eq!(BlockReason::Restricted.to_string(), "RESTRICTED");
        assert_eq!(BlockReason::IllegalName.to_string(), "ILLEGAL_NAME");
        assert_eq!(
            serde_json::from_str::<BlockReason>("\"illegal_name\"").unwrap(),
            BlockReason::IllegalName
        );
    }

    #[test]
    fn accessors() {
        assert!(CheckResult::Passed.passed());
        assert!(CheckResult::Passed.violation().is_none());

        let rejected = CheckResult::Rejected(Violation {
            illegal_instruction: assembly(),
            position: assembly(),
            reason: BlockReason::Restricted,
        });
        assert!(!rejected.passed());
        assert!(rejected.violation().is_some());
        assert!(rejected.unverifiable().is_none());

        let unverifiable = CheckResult::Unverifiable(Unverifiable {
            location: None,
            reason: UnverifiableReason::BudgetExceeded,
        });
        assert!(!unverifiable.passed());
        assert!(unverifiable.violation().is_none());
        assert_eq!(
            unverifiable.to_string(),
            "could not verify: time budget exceeded"
        );
    }

    #[test]
    fn violation_display() {
        let violation = Violation {
            illegal_instruction: assembly(),
            position: assembly(),
            reason: BlockReason::Restricted,
        };
        assert!(violation
            .to_string()
            .starts_with("[ASSEMBLY] Evil, Version=0.0.0.0"));
        assert!(violation.to_string().contains("blocked (RESTRICTED)"));
    }
}
