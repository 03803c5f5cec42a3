//! Subscription tiers and their quota limits

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription tier controlling quota limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

/// Quota limits granted by a plan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub max_api_calls: u64,
    /// Storage ceiling in GB
    pub max_storage: f64,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Free, Plan::Pro, Plan::Enterprise];

    /// Fixed quota table
    pub fn limits(self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                max_api_calls: 50,
                max_storage: 10.0,
            },
            Plan::Pro => PlanLimits {
                max_api_calls: 5000,
                max_storage: 50.0,
            },
            Plan::Enterprise => PlanLimits {
                max_api_calls: 999_999,
                max_storage: 500.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Pro => "Pro",
            Plan::Enterprise => "Enterprise",
        }
    }

    /// List price in USD per month
    pub fn monthly_price_usd(self) -> u32 {
        match self {
            Plan::Free => 0,
            Plan::Pro => 29,
            Plan::Enterprise => 99,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            _ => Err(CoreError::UnknownPlan {
                name: s.to_string(),
            }),
        }
    }
}
