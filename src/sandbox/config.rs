//! Resource limits for a verification run.

use std::time::Duration;

/// Limits applied while scanning one module.
///
/// Exceeding a limit never passes a module: an oversized body or an exhausted budget makes
/// the result [`crate::CheckResult::Unverifiable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Largest method body, in bytes of code, that is decoded (`None`: no limit)
    pub max_body_size: Option<usize>,

    /// Wall-clock budget for one module (`None`: no limit)
    /// Checked before every method and every 1024 instructions
    pub time_budget: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_body_size: Some(16 * 1024 * 1024),
            time_budget: None,
        }
    }
}

impl ScanConfig {
    /// Tight limits for hosts that load plugins on a latency-sensitive path
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_body_size: Some(64 * 1024),
            time_budget: Some(Duration::from_secs(2)),
        }
    }

    /// No limits at all
    ///
    /// **Warning**: a crafted module with huge bodies will be decoded in full.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_body_size: None,
            time_budget: None,
        }
    }

    /// Replace the body size limit.
    #[must_use]
    pub fn with_max_body_size(mut self, limit: Option<usize>) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Replace the time budget.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = ScanConfig::default();
        assert!(default.max_body_size.is_some());
        assert!(default.time_budget.is_none());

        let strict = ScanConfig::strict();
        assert!(strict.max_body_size < default.max_body_size);
        assert!(strict.time_budget.is_some());

        assert_eq!(
            ScanConfig::unbounded(),
            ScanConfig {
                max_body_size: None,
                time_budget: None
            }
        );
    }

    #[test]
    fn overrides() {
        let config = ScanConfig::unbounded()
            .with_max_body_size(Some(10))
            .with_time_budget(Some(Duration::from_millis(5)));
        assert_eq!(config.max_body_size, Some(10));
        assert_eq!(config.time_budget, Some(Duration::from_millis(5)));
    }
}
