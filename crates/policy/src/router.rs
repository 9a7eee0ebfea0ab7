use {serde::Serialize, tracing::debug};

use crate::error::{Error, Result};

pub const COST_FIRST: &str = "cost-first";
pub const QUALITY_FIRST: &str = "quality-first";
pub const BALANCED: &str = "balanced";

pub const LOW_COST_MODEL: &str = "gpt-4.1-mini";
pub const HIGH_QUALITY_MODEL: &str = "gpt-4.1";

/// Budget value that makes `balanced` pick the low-cost model.
const LOW_BUDGET: &str = "low";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    AlwaysLowCost,
    AlwaysHighQuality,
    /// Low-cost model iff the budget is `low`.
    BudgetAware,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyPack {
    pub name: String,
    pub description: String,
    pub strategy: Strategy,
    pub low_cost_model: String,
    pub high_quality_model: String,
}

impl PolicyPack {
    fn new(name: &str, description: &str, strategy: Strategy) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            strategy,
            low_cost_model: LOW_COST_MODEL.to_string(),
            high_quality_model: HIGH_QUALITY_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct RouteRequest {
    pub use_case: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub policy_pack: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub policy_pack: String,
    pub model: String,
    pub reason: String,
}

/// Maps a use case and budget to a model through a named policy pack.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    packs: Vec<PolicyPack>,
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self {
            packs: vec![
                PolicyPack::new(
                    COST_FIRST,
                    "Always use the lower-cost model",
                    Strategy::AlwaysLowCost,
                ),
                PolicyPack::new(
                    QUALITY_FIRST,
                    "Always use the highest-quality model",
                    Strategy::AlwaysHighQuality,
                ),
                PolicyPack::new(
                    BALANCED,
                    "Lower-cost model on a low budget, otherwise highest quality",
                    Strategy::BudgetAware,
                ),
            ],
        }
    }
}

impl ModelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned copy of the configured packs.
    #[must_use]
    pub fn packs(&self) -> Vec<PolicyPack> {
        self.packs.clone()
    }

    pub fn decide(&self, request: &RouteRequest) -> Result<RouteDecision> {
        let use_case = request.use_case.trim();
        if use_case.is_empty() {
            return Err(Error::EmptyUseCase);
        }
        let pack_name = match request.policy_pack.trim() {
            "" => BALANCED,
            name => name,
        };
        let pack = self
            .packs
            .iter()
            .find(|p| p.name == pack_name)
            .ok_or_else(|| Error::UnknownPack(pack_name.to_string()))?;

        let low_budget = request.budget.trim().eq_ignore_ascii_case(LOW_BUDGET);
        let (model, reason) = match pack.strategy {
            Strategy::AlwaysLowCost => (
                &pack.low_cost_model,
                format!("{} prefers the lower-cost model", pack.name),
            ),
            Strategy::AlwaysHighQuality => (
                &pack.high_quality_model,
                format!("{} prefers the highest-quality model", pack.name),
            ),
            Strategy::BudgetAware if low_budget => (
                &pack.low_cost_model,
                format!("{} with a low budget uses the lower-cost model", pack.name),
            ),
            Strategy::BudgetAware => (
                &pack.high_quality_model,
                format!("{} without a low budget uses the highest-quality model", pack.name),
            ),
        };
        debug!(use_case, policy_pack = %pack.name, model = %model, "routed model");
        Ok(RouteDecision {
            policy_pack: pack.name.clone(),
            model: model.clone(),
            reason,
        })
    }
}
