use crate::error::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;

/// A purchased tier: how many recruiters each wave targets, how many may be
/// contacted per day and how long to pause between two sends.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub name: String,
    pub recruiter_target: i32,
    pub daily_quota: i32,
    pub send_delay: Duration,
}

impl Plan {
    pub fn days_per_wave(&self) -> i64 {
        crate::services::wave_clock::days_per_wave(self.recruiter_target, self.daily_quota)
    }
}

const DEFAULT_PLANS: &[(&str, i32, u64)] = &[
    ("starter", 250, 2000),
    ("basic", 500, 2500),
    ("professional", 750, 3000),
    ("growth", 1000, 3500),
    ("advanced", 1250, 4000),
    ("premium", 1500, 4500),
];

#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: HashMap<String, Plan>,
    default_plan: String,
}

impl PlanCatalog {
    /// Builds a catalog from explicit plans. `default_plan` must be one of them.
    pub fn new(plans: Vec<Plan>, default_plan: &str) -> Result<Self> {
        let plans: HashMap<String, Plan> = plans
            .into_iter()
            .map(|p| (p.name.to_lowercase(), p))
            .collect();
        let default_plan = default_plan.to_lowercase();
        if !plans.contains_key(&default_plan) {
            return Err(Error::Config(format!(
                "default plan '{}' is not in the plan catalog",
                default_plan
            )));
        }
        if let Some(bad) = plans
            .values()
            .find(|p| p.recruiter_target <= 0 || p.daily_quota <= 0)
        {
            return Err(Error::Config(format!(
                "plan '{}' needs a positive target and quota",
                bad.name
            )));
        }
        Ok(Self {
            plans,
            default_plan,
        })
    }

    /// The built-in plan table with every plan sharing `daily_quota`.
    pub fn with_defaults(daily_quota: i32, default_plan: &str) -> Result<Self> {
        let plans = DEFAULT_PLANS
            .iter()
            .map(|(name, target, delay_ms)| Plan {
                name: name.to_string(),
                recruiter_target: *target,
                daily_quota,
                send_delay: Duration::from_millis(*delay_ms),
            })
            .collect();
        Self::new(plans, default_plan)
    }

    /// Looks up a plan by name. Unknown names fall back to the default plan so
    /// a missing plan record never stalls a paid campaign.
    pub fn resolve(&self, plan_name: &str) -> &Plan {
        match self.get(plan_name) {
            Some(plan) => plan,
            None => {
                tracing::warn!(
                    plan = %plan_name,
                    fallback = %self.default_plan,
                    "Unknown plan name, using default plan"
                );
                &self.plans[&self.default_plan]
            }
        }
    }

    pub fn get(&self, plan_name: &str) -> Option<&Plan> {
        self.plans.get(&plan_name.trim().to_lowercase())
    }

    pub fn default_plan(&self) -> &Plan {
        &self.plans[&self.default_plan]
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::with_defaults(50, "starter").expect("built-in plan table is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_plans_case_insensitively() {
        let catalog = PlanCatalog::default();
        let plan = catalog.resolve("Professional");
        assert_eq!(plan.recruiter_target, 750);
        assert_eq!(plan.daily_quota, 50);
        assert_eq!(plan.send_delay, Duration::from_millis(3000));
        assert_eq!(plan.days_per_wave(), 15);
    }

    #[test]
    fn unknown_plan_falls_back_to_default() {
        let catalog = PlanCatalog::default();
        let plan = catalog.resolve("platinum");
        assert_eq!(plan.name, "starter");
        assert_eq!(plan.recruiter_target, 250);
        assert!(catalog.get("platinum").is_none());
        assert_eq!(catalog.get(" Growth ").map(|p| p.recruiter_target), Some(1000));
    }

    #[test]
    fn rejects_default_outside_catalog() {
        let err = PlanCatalog::with_defaults(50, "enterprise").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_non_positive_quota() {
        assert!(PlanCatalog::with_defaults(0, "starter").is_err());
    }
}
