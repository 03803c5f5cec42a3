//! Plan manager: the free / pro / enterprise state machine
//!
//! Every transition is total and immediate. Switching plans rewrites the
//! meter's limits but never resets or clamps the counters.

use crate::meter::UsageMeter;
use crate::models::Plan;

/// Record of a completed plan change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTransition {
    pub from: Plan,
    pub to: Plan,
}

impl PlanTransition {
    pub fn is_upgrade(&self) -> bool {
        self.to.limits().max_api_calls > self.from.limits().max_api_calls
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanManager {
    plan: Plan,
}

impl PlanManager {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }

    pub fn current(&self) -> Plan {
        self.plan
    }

    /// Switch to `target` and rewrite the meter's limits from the plan table
    pub fn upgrade(&mut self, target: Plan, meter: &mut UsageMeter) -> PlanTransition {
        let from = self.plan;
        self.plan = target;
        meter.apply_limits(target.limits());
        PlanTransition { from, to: target }
    }

    /// Force the meter's limits to match the current plan; true if they differed
    pub fn reconcile(&self, meter: &mut UsageMeter) -> bool {
        let expected = self.plan.limits();
        if meter.stats().limits() == expected {
            return false;
        }
        meter.apply_limits(expected);
        true
    }
}
