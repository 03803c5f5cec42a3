//! Quota status and alert levels
//!
//! Percentages are not clamped: a user who downgraded while over the new
//! limit legitimately shows more than 100%. Only `bar_pct` is clamped, for
//! progress bars.

use crate::config::CoreConfig;
use crate::models::UsageStats;

/// Alert level based on quota usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// Usage < warning threshold (green)
    Safe,
    /// Usage >= warning threshold (yellow)
    Warning,
    /// Usage >= critical threshold (red)
    Critical,
    /// Usage >= 100% (magenta)
    Exceeded,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Safe => "safe",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
            AlertLevel::Exceeded => "exceeded",
        }
    }
}

/// Usage of one metered resource against its limit
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuota {
    pub used: f64,
    pub limit: f64,
    /// Usage percentage, unclamped
    pub usage_pct: f64,
    /// Usage percentage clamped to 0-100 for bar rendering
    pub bar_pct: f64,
    pub alert_level: AlertLevel,
}

impl ResourceQuota {
    fn new(used: f64, limit: f64, config: &CoreConfig) -> Self {
        let usage_pct = if limit > 0.0 {
            used / limit * 100.0
        } else {
            0.0
        };

        Self {
            used,
            limit,
            usage_pct,
            bar_pct: usage_pct.clamp(0.0, 100.0),
            alert_level: determine_alert_level(usage_pct, config),
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.limit - self.used).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuotaStatus {
    pub api_calls: ResourceQuota,
    pub storage: ResourceQuota,
}

impl QuotaStatus {
    /// The worse of the two alert levels
    pub fn worst(&self) -> AlertLevel {
        let rank = |level: AlertLevel| match level {
            AlertLevel::Safe => 0,
            AlertLevel::Warning => 1,
            AlertLevel::Critical => 2,
            AlertLevel::Exceeded => 3,
        };
        if rank(self.api_calls.alert_level) >= rank(self.storage.alert_level) {
            self.api_calls.alert_level
        } else {
            self.storage.alert_level
        }
    }
}

/// Calculate quota status from usage counters
pub fn calculate_quota_status(usage: &UsageStats, config: &CoreConfig) -> QuotaStatus {
    QuotaStatus {
        api_calls: ResourceQuota::new(
            usage.api_calls as f64,
            usage.max_api_calls as f64,
            config,
        ),
        storage: ResourceQuota::new(usage.storage, usage.max_storage, config),
    }
}

/// Determine alert level from usage percentage and thresholds
fn determine_alert_level(usage_pct: f64, config: &CoreConfig) -> AlertLevel {
    if usage_pct >= 100.0 {
        AlertLevel::Exceeded
    } else if usage_pct >= config.critical_threshold {
        AlertLevel::Critical
    } else if usage_pct >= config.warning_threshold {
        AlertLevel::Warning
    } else {
        AlertLevel::Safe
    }
}
