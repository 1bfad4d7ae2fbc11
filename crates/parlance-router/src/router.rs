// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory model selection under a per-query cost budget.
//!
//! Orchestrates model selection: global force > classify > cheapest eligible
//! model that fits the budget. The router never calls a model.

use parlance_config::model::{ModelProfile, RouterConfig};
use parlance_core::{ComplexityTier, ParlanceError};
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{ClassificationResult, QueryClassifier};

/// Prompt tokens estimated per whitespace-separated word.
const TOKENS_PER_WORD: f64 = 1.3;

/// Two estimated costs closer than this are a tie.
const COST_EPSILON: f64 = 1e-12;

/// The router's recommendation for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub tier: ComplexityTier,
    pub model: String,
    /// Prompt estimate plus the configured expected completion size.
    pub estimated_tokens: u32,
    /// Estimated USD cost of one call.
    pub estimated_cost: f64,
    /// False when no eligible model fits the budget and the cheapest was chosen.
    pub within_budget: bool,
    /// `0.7 * accuracy + 0.3 / cost_per_1k` of the chosen model.
    pub selection_score: f64,
    pub reason: String,
    /// Whether `router.force_model` decided the model.
    pub forced: bool,
}

/// Classifies queries and picks a model for them.
pub struct ModelRouter {
    classifier: QueryClassifier,
    models: Vec<ModelProfile>,
    force_model: Option<String>,
    expected_output_tokens: u32,
}

impl ModelRouter {
    /// Build a router, checking that every tier has a model and that a
    /// forced model is one of the configured profiles.
    pub fn new(config: &RouterConfig) -> Result<Self, ParlanceError> {
        for profile in &config.models {
            if profile.cost_per_1k_tokens.is_nan() || profile.cost_per_1k_tokens < 0.0 {
                return Err(ParlanceError::Config(format!(
                    "router model `{}` has a negative or invalid cost",
                    profile.name
                )));
            }
            if !(0.0..=1.0).contains(&profile.accuracy) {
                return Err(ParlanceError::Config(format!(
                    "router model `{}` accuracy must be within [0, 1]",
                    profile.name
                )));
            }
        }
        for tier in [
            ComplexityTier::Simple,
            ComplexityTier::Medium,
            ComplexityTier::Complex,
        ] {
            if !config.models.iter().any(|m| m.tiers.contains(&tier)) {
                return Err(ParlanceError::Config(format!(
                    "no router model is whitelisted for the {tier} tier"
                )));
            }
        }
        if let Some(forced) = &config.force_model
            && !config.models.iter().any(|m| &m.name == forced)
        {
            return Err(ParlanceError::Config(format!(
                "router.force_model `{forced}` is not a configured model"
            )));
        }

        Ok(Self {
            classifier: QueryClassifier::new(config),
            models: config.models.clone(),
            force_model: config.force_model.clone(),
            expected_output_tokens: config.expected_output_tokens,
        })
    }

    /// Classify `query` into a complexity tier.
    pub fn analyze_query_complexity(&self, query: &str) -> ClassificationResult {
        self.classifier.classify(query)
    }

    /// Recommend a model for `query`, optionally within `budget` USD.
    ///
    /// Picks the lowest-cost model whitelisted for the query's tier whose
    /// estimate fits the budget; equal costs go to the higher selection
    /// score. When nothing fits, the cheapest eligible model is returned
    /// with `within_budget = false`.
    pub fn select_model(
        &self,
        query: &str,
        budget: Option<f64>,
    ) -> Result<RoutingDecision, ParlanceError> {
        let classification = self.analyze_query_complexity(query);
        let estimated_tokens = self.estimate_tokens(query);
        let fits = |cost: f64| budget.is_none_or(|limit| cost <= limit);

        if let Some(forced) = &self.force_model {
            let profile = self
                .models
                .iter()
                .find(|m| &m.name == forced)
                .ok_or_else(|| {
                    ParlanceError::Internal(format!("forced model `{forced}` vanished"))
                })?;
            let estimated_cost = estimate_cost(profile, estimated_tokens);
            let decision = RoutingDecision {
                tier: classification.tier,
                model: profile.name.clone(),
                estimated_tokens,
                estimated_cost,
                within_budget: fits(estimated_cost),
                selection_score: selection_score(profile),
                reason: "forced by router.force_model".to_string(),
                forced: true,
            };
            record(&decision);
            return Ok(decision);
        }

        let eligible: Vec<(&ModelProfile, f64)> = self
            .models
            .iter()
            .filter(|m| m.tiers.contains(&classification.tier))
            .map(|m| (m, estimate_cost(m, estimated_tokens)))
            .collect();

        let affordable: Vec<(&ModelProfile, f64)> =
            eligible.iter().copied().filter(|(_, cost)| fits(*cost)).collect();
        let within_budget = !affordable.is_empty();
        let pool = if within_budget { &affordable } else { &eligible };

        let (profile, estimated_cost) = cheapest(pool).ok_or_else(|| {
            ParlanceError::Config(format!(
                "no router model is whitelisted for the {} tier",
                classification.tier
            ))
        })?;

        let reason = if within_budget {
            classification.reason
        } else {
            format!(
                "{}; nothing fits the budget, using the cheapest eligible model",
                classification.reason
            )
        };

        debug!(
            tier = %classification.tier,
            candidates = eligible.len(),
            affordable = affordable.len(),
            "router candidates"
        );

        let decision = RoutingDecision {
            tier: classification.tier,
            model: profile.name.clone(),
            estimated_tokens,
            estimated_cost,
            within_budget,
            selection_score: selection_score(profile),
            reason,
            forced: false,
        };
        record(&decision);
        Ok(decision)
    }

    /// Configured model profiles, in declaration order.
    pub fn models(&self) -> &[ModelProfile] {
        &self.models
    }

    fn estimate_tokens(&self, query: &str) -> u32 {
        let words = query.split_whitespace().count() as f64;
        let prompt = (words * TOKENS_PER_WORD).ceil();
        // Saturates on absurd input instead of wrapping.
        let prompt = if prompt >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            prompt as u32
        };
        prompt.saturating_add(self.expected_output_tokens)
    }
}

fn estimate_cost(profile: &ModelProfile, tokens: u32) -> f64 {
    f64::from(tokens) / 1000.0 * profile.cost_per_1k_tokens
}

fn selection_score(profile: &ModelProfile) -> f64 {
    let value = if profile.cost_per_1k_tokens > 0.0 {
        1.0 / profile.cost_per_1k_tokens
    } else {
        f64::MAX
    };
    0.7 * profile.accuracy + 0.3 * value
}

/// Lowest cost wins; equal costs go to the higher selection score, then to
/// the first declared.
fn cheapest<'a>(pool: &[(&'a ModelProfile, f64)]) -> Option<(&'a ModelProfile, f64)> {
    let mut best: Option<(&ModelProfile, f64)> = None;
    for &(profile, cost) in pool {
        let better = best.is_none_or(|(current, current_cost)| {
            if (cost - current_cost).abs() <= COST_EPSILON {
                selection_score(profile) > selection_score(current)
            } else {
                cost < current_cost
            }
        });
        if better {
            best = Some((profile, cost));
        }
    }
    best
}

fn record(decision: &RoutingDecision) {
    metrics::counter!(
        "parlance_router_decisions_total",
        "tier" => decision.tier.to_string(),
        "model" => decision.model.clone()
    )
    .increment(1);
    info!(
        tier = %decision.tier,
        model = decision.model.as_str(),
        estimated_tokens = decision.estimated_tokens,
        estimated_cost = decision.estimated_cost,
        within_budget = decision.within_budget,
        forced = decision.forced,
        "model routed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ModelRouter {
        ModelRouter::new(&RouterConfig::default()).unwrap()
    }

    #[tracing_test::traced_test]
    #[test]
    fn decisions_are_logged_with_the_model() {
        router().select_model("show nps", None).unwrap();
        assert!(logs_contain("model routed"));
        assert!(logs_contain("claude-haiku-4-5"));
    }

    #[test]
    fn simple_query_gets_the_cheapest_model() {
        let decision = router().select_model("show nps", None).unwrap();
        assert_eq!(decision.tier, ComplexityTier::Simple);
        assert_eq!(decision.model, "claude-haiku-4-5");
        assert!(decision.within_budget);
        assert!(!decision.forced);
    }

    #[test]
    fn equal_cost_goes_to_higher_accuracy() {
        let decision = router()
            .select_model(
                "compare churn across enterprise and smb segments over the last two quarters and explain why it changed",
                None,
            )
            .unwrap();
        assert_eq!(decision.tier, ComplexityTier::Complex);
        // Both sonnets cost the same; the more accurate one wins.
        assert_eq!(decision.model, "claude-sonnet-4-5");
    }

    #[test]
    fn token_and_cost_estimates() {
        let decision = router().select_model("show nps", None).unwrap();
        // ceil(2 * 1.3) + 256
        assert_eq!(decision.estimated_tokens, 259);
        assert!((decision.estimated_cost - 0.000259).abs() < 1e-9);
    }

    #[test]
    fn nothing_within_budget_falls_back_to_cheapest() {
        let decision = router().select_model("show nps", Some(0.0)).unwrap();
        assert_eq!(decision.model, "claude-haiku-4-5");
        assert!(!decision.within_budget);
        assert!(decision.reason.contains("nothing fits the budget"));
    }

    #[test]
    fn budget_excludes_expensive_models() {
        let mut config = RouterConfig::default();
        config.models = vec![
            ModelProfile {
                name: "big".into(),
                cost_per_1k_tokens: 1.0,
                accuracy: 0.99,
                tiers: vec![ComplexityTier::Simple, ComplexityTier::Medium, ComplexityTier::Complex],
            },
            ModelProfile {
                name: "small".into(),
                cost_per_1k_tokens: 0.01,
                accuracy: 0.5,
                tiers: vec![ComplexityTier::Simple, ComplexityTier::Medium, ComplexityTier::Complex],
            },
        ];
        let router = ModelRouter::new(&config).unwrap();
        let decision = router.select_model("show nps", Some(0.01)).unwrap();
        assert_eq!(decision.model, "small");
        assert!(decision.within_budget);
    }

    #[test]
    fn force_model_overrides_classification() {
        let mut config = RouterConfig::default();
        config.force_model = Some("claude-opus-4".into());
        let decision = ModelRouter::new(&config)
            .unwrap()
            .select_model("show nps", None)
            .unwrap();
        assert_eq!(decision.model, "claude-opus-4");
        assert_eq!(decision.tier, ComplexityTier::Simple);
        assert!(decision.forced);
    }

    #[test]
    fn unknown_forced_model_is_rejected() {
        let mut config = RouterConfig::default();
        config.force_model = Some("gpt-nothing".into());
        assert!(matches!(
            ModelRouter::new(&config),
            Err(ParlanceError::Config(_))
        ));
    }

    #[test]
    fn uncovered_tier_is_rejected() {
        let mut config = RouterConfig::default();
        config.models.retain(|m| !m.tiers.contains(&ComplexityTier::Complex));
        let err = ModelRouter::new(&config).err().unwrap();
        assert!(err.to_string().contains("complex"));
    }

    #[test]
    fn invalid_accuracy_is_rejected() {
        let mut config = RouterConfig::default();
        config.models[0].accuracy = 1.5;
        assert!(ModelRouter::new(&config).is_err());
    }

    #[test]
    fn selection_score_weights_accuracy_and_price() {
        let profile = ModelProfile {
            name: "m".into(),
            cost_per_1k_tokens: 0.5,
            accuracy: 1.0,
            tiers: vec![],
        };
        assert!((selection_score(&profile) - (0.7 + 0.6)).abs() < 1e-9);
    }
}
