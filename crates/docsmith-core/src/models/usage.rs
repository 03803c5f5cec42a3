//! Usage counters metered against the active plan

use super::plan::{Plan, PlanLimits};
use serde::{Deserialize, Serialize};

/// Consumption counters and the limits of the current plan
///
/// Counters may exceed their limits; metering is advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub api_calls: u64,
    pub max_api_calls: u64,
    /// Storage used in GB
    pub storage: f64,
    pub max_storage: f64,
    /// Mirrors the project registry's cardinality
    pub projects: u64,
    pub documents_generated: u64,
}

impl Default for UsageStats {
    /// First-run figures shown alongside the demo projects
    fn default() -> Self {
        let limits = Plan::Free.limits();
        Self {
            api_calls: 23,
            max_api_calls: limits.max_api_calls,
            storage: 2.3,
            max_storage: limits.max_storage,
            projects: 4,
            documents_generated: 12,
        }
    }
}

impl UsageStats {
    /// Zeroed counters under the given plan
    pub fn empty(plan: Plan) -> Self {
        let limits = plan.limits();
        Self {
            api_calls: 0,
            max_api_calls: limits.max_api_calls,
            storage: 0.0,
            max_storage: limits.max_storage,
            projects: 0,
            documents_generated: 0,
        }
    }

    pub fn limits(&self) -> PlanLimits {
        PlanLimits {
            max_api_calls: self.max_api_calls,
            max_storage: self.max_storage,
        }
    }

    /// Overwrite limits without touching counters
    pub(crate) fn set_limits(&mut self, limits: PlanLimits) {
        self.max_api_calls = limits.max_api_calls;
        self.max_storage = limits.max_storage;
    }

    pub fn is_over_quota(&self) -> bool {
        self.api_calls > self.max_api_calls || self.storage > self.max_storage
    }
}

/// A metered increment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsageIncrement {
    ApiCalls(u64),
    /// Storage in GB
    Storage(f64),
}

impl UsageIncrement {
    pub fn kind(&self) -> &'static str {
        match self {
            UsageIncrement::ApiCalls(_) => "apiCalls",
            UsageIncrement::Storage(_) => "storage",
        }
    }
}
