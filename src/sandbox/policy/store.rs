//! Atomic policy replacement for long-lived hosts.

use std::sync::{Arc, RwLock};

use crate::{sandbox::policy::Policy, Result};

/// Holds the current [`Policy`] and swaps it wholesale on reload.
///
/// Scans take a [`PolicyStore::snapshot`] and keep it for their whole run, so a reload
/// never changes the rules under an in-flight check.
///
/// # Examples
///
/// ```rust
/// use cilguard::{Policy, PolicyStore};
///
/// let store = PolicyStore::new(Policy::default());
/// let before = store.snapshot();
///
/// store.reload_json(r#"{ "opcodes": [ { "opcode": "localloc" } ] }"#)?;
/// assert!(before.is_empty());
/// assert_eq!(store.snapshot().rule_count(), 1);
/// # Ok::<(), cilguard::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct PolicyStore {
    current: RwLock<Arc<Policy>>,
}

impl PolicyStore {
    /// Create a store holding `policy`.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        PolicyStore {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// The current policy.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Policy> {
        read_lock!(self.current).clone()
    }

    /// Install `policy`, returning the one it replaces.
    pub fn replace(&self, policy: Policy) -> Arc<Policy> {
        let rules = policy.rule_count();
        let previous = std::mem::replace(&mut *write_lock!(self.current), Arc::new(policy));
        log::debug!(
            "replaced policy of {} rules with {} rules",
            previous.rule_count(),
            rules
        );
        previous
    }

    /// Compile a JSON document and install it. On error the current policy stays in place.
    ///
    /// # Errors
    /// See [`Policy::from_json`].
    pub fn reload_json(&self, json: &str) -> Result<Arc<Policy>> {
        match Policy::from_json(json) {
            Ok(policy) => Ok(self.replace(policy)),
            Err(error) => {
                log::warn!("policy reload rejected, keeping current policy: {}", error);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyBuilder;

    #[test]
    fn snapshots_survive_replacement() {
        let store = PolicyStore::new(PolicyBuilder::new().deny_opcode("calli").build().unwrap());
        let first = store.snapshot();

        let previous = store.replace(Policy::default());
        assert!(Arc::ptr_eq(&first, &previous));
        assert_eq!(first.rule_count(), 1);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn failed_reload_keeps_current_policy() {
        let store = PolicyStore::new(PolicyBuilder::new().deny_opcode("calli").build().unwrap());
        assert!(store.reload_json(r#"{ "opcodes": [ { "opcode": "bogus" } ] }"#).is_err());
        assert!(store.reload_json("[").is_err());
        assert_eq!(store.snapshot().rule_count(), 1);
    }

    #[test]
    fn concurrent_readers() {
        let store = Arc::new(PolicyStore::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let policy = store.snapshot();
                        assert!(policy.rule_count() <= 1);
                    }
                })
            })
            .collect();

        store.replace(PolicyBuilder::new().deny_opcode("localloc").build().unwrap());
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.snapshot().rule_count(), 1);
    }

    #[test]
    fn concurrent_replacements_hand_back_each_policy_once() {
        let store = Arc::new(PolicyStore::default());
        let handles: Vec<_> = (1..=8)
            .map(|rules| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut builder = PolicyBuilder::new();
                    for index in 0..rules {
                        builder = builder.deny_type(format!("Denied.Type{}", index));
                    }
                    store.replace(builder.build().unwrap()).rule_count()
                })
            })
            .collect();

        let mut seen: Vec<usize> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        seen.push(store.snapshot().rule_count());
        seen.sort_unstable();
        assert_eq!(seen, (0..=8).collect::<Vec<_>>());
    }
}
