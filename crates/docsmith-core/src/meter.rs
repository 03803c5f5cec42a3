//! Usage meter
//!
//! Counters only grow through explicit increments and are never clamped
//! to the plan limits: a ratio above 100% is a valid state to display.

use crate::error::CoreError;
use crate::models::{PlanLimits, UsageIncrement, UsageStats};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageMeter {
    stats: UsageStats,
}

impl UsageMeter {
    pub fn new(stats: UsageStats) -> Self {
        Self { stats }
    }

    /// Add to a counter, with no admission control against the limit
    pub fn increment(&mut self, increment: UsageIncrement) -> Result<(), CoreError> {
        match increment {
            UsageIncrement::ApiCalls(calls) => {
                self.stats.api_calls = self.stats.api_calls.saturating_add(calls);
            }
            UsageIncrement::Storage(gb) => {
                if !gb.is_finite() || gb < 0.0 {
                    return Err(CoreError::InvalidUsageAmount { amount: gb });
                }
                self.stats.storage += gb;
            }
        }
        Ok(())
    }

    /// A project was created through generation
    pub(crate) fn record_project_created(&mut self) {
        self.stats.projects += 1;
        self.stats.documents_generated += 1;
    }

    /// A project was removed; floored at zero
    pub(crate) fn record_project_deleted(&mut self) {
        self.stats.projects = self.stats.projects.saturating_sub(1);
    }

    /// Align the project counter with the registry
    pub(crate) fn set_project_count(&mut self, count: u64) {
        self.stats.projects = count;
    }

    pub(crate) fn apply_limits(&mut self, limits: PlanLimits) {
        self.stats.set_limits(limits);
    }

    /// Current counters (side-effect free)
    pub fn snapshot(&self) -> UsageStats {
        self.stats.clone()
    }

    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }
}
