//! Recommendation rules.
//!
//! Each resource is checked against an ordered rule list and the first rule
//! that matches decides the outcome. A matching rule may still produce no
//! recommendation (an underutilized subtype with no smaller size), in which
//! case evaluation stops there.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{NegativeSavingsPolicy, RulesConfig};
use crate::model::{Recommendation, RecommendationCategory, ResourceRecord};
use crate::pricing::PricingResolver;

/// Region-level advisories appended to every analysis.
pub const GENERAL_RECOMMENDATIONS: [&str; 4] = [
    "Consider Reserved Instances for steady-state workloads",
    "Evaluate Spot Instances for fault-tolerant workloads",
    "Review unattached EBS volumes",
    "Check for obsolete snapshots",
];

/// A per-resource recommendation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationRule {
    /// Non-running instance: terminate it.
    StoppedResource,
    /// Running with low utilization: move to the next smaller subtype.
    Underutilized,
    /// Running with high utilization: advisory only.
    Overutilized,
}

impl RecommendationRule {
    pub fn id(&self) -> &'static str {
        match self {
            RecommendationRule::StoppedResource => "stopped-resource",
            RecommendationRule::Underutilized => "underutilized",
            RecommendationRule::Overutilized => "overutilized",
        }
    }

    /// The default evaluation order.
    pub fn standard_order() -> Vec<Self> {
        vec![
            RecommendationRule::StoppedResource,
            RecommendationRule::Underutilized,
            RecommendationRule::Overutilized,
        ]
    }
}

/// Outcome of checking one rule against one resource.
#[derive(Debug, Clone, PartialEq)]
enum RuleOutcome {
    /// The rule does not apply; try the next one.
    Skip,
    /// The rule applies; evaluation stops.
    Matched(Option<Recommendation>),
}

/// Evaluates resources against the ordered rule list.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<RecommendationRule>,
    underutilized_below: f64,
    overutilized_above: f64,
    negative_savings: NegativeSavingsPolicy,
    downsize: BTreeMap<String, String>,
}

impl RuleEngine {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            rules: RecommendationRule::standard_order(),
            underutilized_below: config.underutilized_below,
            overutilized_above: config.overutilized_above,
            negative_savings: config.negative_savings,
            downsize: config.downsize.clone(),
        }
    }

    /// Engine with the default thresholds and downsize table.
    pub fn standard() -> Self {
        Self::new(&RulesConfig::default())
    }

    pub fn rules(&self) -> &[RecommendationRule] {
        &self.rules
    }

    /// Next smaller subtype, if the family has one.
    pub fn smaller_subtype(&self, subtype: &str) -> Option<&str> {
        self.downsize.get(subtype).map(String::as_str)
    }

    /// Evaluate one resource. Returns at most one recommendation.
    pub async fn evaluate(
        &self,
        resource: &ResourceRecord,
        pricing: &PricingResolver,
    ) -> Option<Recommendation> {
        for rule in &self.rules {
            if let RuleOutcome::Matched(recommendation) = self.apply(*rule, resource, pricing).await {
                debug!("Rule {} matched {}", rule.id(), resource.id);
                return recommendation;
            }
        }
        None
    }

    /// The fixed region-level advisories, in order.
    pub fn general_recommendations(&self) -> Vec<Recommendation> {
        GENERAL_RECOMMENDATIONS
            .iter()
            .map(|text| Recommendation::general(*text))
            .collect()
    }

    async fn apply(
        &self,
        rule: RecommendationRule,
        resource: &ResourceRecord,
        pricing: &PricingResolver,
    ) -> RuleOutcome {
        match rule {
            RecommendationRule::StoppedResource => {
                if !resource.kind.has_run_lifecycle() || resource.is_running() {
                    return RuleOutcome::Skip;
                }
                let cost = resource.monthly_cost_estimate;
                RuleOutcome::Matched(Some(Recommendation::for_resource(
                    RecommendationCategory::Terminate,
                    &resource.id,
                    format!("Terminate stopped instance {} (saves ${:.2}/month)", resource.id, cost),
                    cost,
                )))
            }
            RecommendationRule::Underutilized => match resource.utilization_pct {
                Some(pct) if pct < self.underutilized_below => {
                    RuleOutcome::Matched(self.downsize(resource, pct, pricing).await)
                }
                _ => RuleOutcome::Skip,
            },
            RecommendationRule::Overutilized => match resource.utilization_pct {
                Some(pct) if pct > self.overutilized_above => {
                    RuleOutcome::Matched(Some(Recommendation::for_resource(
                        RecommendationCategory::Investigate,
                        &resource.id,
                        format!("Investigate high CPU usage on {} ({:.1}%)", resource.id, pct),
                        0.0,
                    )))
                }
                _ => RuleOutcome::Skip,
            },
        }
    }

    async fn downsize(
        &self,
        resource: &ResourceRecord,
        pct: f64,
        pricing: &PricingResolver,
    ) -> Option<Recommendation> {
        let Some(smaller) = self.smaller_subtype(&resource.subtype) else {
            debug!("No smaller subtype for {} ({})", resource.subtype, resource.id);
            return None;
        };

        let smaller_cost = pricing
            .monthly_cost(resource.kind, smaller, &resource.region)
            .await;
        let mut savings = resource.monthly_cost_estimate - smaller_cost;

        if savings < 0.0 {
            warn!(
                "Downsizing {} from {} to {} increases cost by ${:.2}/month",
                resource.id, resource.subtype, smaller, -savings
            );
            match self.negative_savings {
                NegativeSavingsPolicy::Surface => {}
                NegativeSavingsPolicy::Clamp => savings = 0.0,
                NegativeSavingsPolicy::Suppress => return None,
            }
        }

        Some(Recommendation::for_resource(
            RecommendationCategory::Downsize,
            &resource.id,
            format!(
                "Downsize {} ({}) to {} (current CPU: {:.1}%, saves ${:.2}/month)",
                resource.subtype, resource.id, smaller, pct, savings
            ),
            savings,
        ))
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LifecycleState, ResourceKind};
    use crate::pricing::PriceTable;
    use std::sync::Arc;

    use cloudtrim_provider::MockProvider;

    fn instance(id: &str, subtype: &str, state: LifecycleState, pct: f64, cost: f64) -> ResourceRecord {
        ResourceRecord::new(id, ResourceKind::ComputeInstance, subtype, state, "us-east-1")
            .with_utilization(pct)
            .with_monthly_cost(cost)
    }

    fn running(id: &str, subtype: &str, pct: f64, cost: f64) -> ResourceRecord {
        instance(id, subtype, LifecycleState::Running, pct, cost)
    }

    fn offline() -> PricingResolver {
        PricingResolver::offline(PriceTable::reference())
    }

    #[test]
    fn test_standard_order() {
        let engine = RuleEngine::standard();
        assert_eq!(
            engine.rules(),
            &[
                RecommendationRule::StoppedResource,
                RecommendationRule::Underutilized,
                RecommendationRule::Overutilized,
            ]
        );
        assert_eq!(engine.smaller_subtype("t2.small"), Some("t2.micro"));
        assert_eq!(engine.smaller_subtype("t3.small"), None);
    }

    #[tokio::test]
    async fn test_stopped_instance_is_terminated() {
        let engine = RuleEngine::standard();
        let resource = instance("i-0abc", "t3.small", LifecycleState::Stopped, 0.0, 15.0);

        let rec = engine.evaluate(&resource, &offline()).await.unwrap();
        assert_eq!(rec.category, RecommendationCategory::Terminate);
        assert_eq!(rec.message, "Terminate stopped instance i-0abc (saves $15.00/month)");
        assert_eq!(rec.estimated_monthly_savings, 15.0);
        assert_eq!(rec.resource_id.as_deref(), Some("i-0abc"));
    }

    #[tokio::test]
    async fn test_any_non_running_state_is_terminated() {
        let engine = RuleEngine::standard();
        for state in [
            LifecycleState::Pending,
            LifecycleState::Stopping,
            LifecycleState::Unknown("hibernated".to_string()),
        ] {
            let resource = instance("i-1", "m5.large", state, 95.0, 70.08);
            let rec = engine.evaluate(&resource, &offline()).await.unwrap();
            assert_eq!(rec.category, RecommendationCategory::Terminate);
        }
    }

    #[tokio::test]
    async fn test_stopped_rule_wins_over_utilization() {
        let engine = RuleEngine::standard();
        let resource = instance("i-1", "t2.small", LifecycleState::Stopped, 2.0, 16.79);

        let rec = engine.evaluate(&resource, &offline()).await.unwrap();
        assert_eq!(rec.category, RecommendationCategory::Terminate);
        assert_eq!(rec.estimated_monthly_savings, 16.79);
    }

    #[tokio::test]
    async fn test_normal_utilization_has_no_recommendation() {
        let engine = RuleEngine::standard();
        for pct in [15.0, 42.0, 80.0] {
            let resource = running("i-1", "m5.large", pct, 70.08);
            assert!(engine.evaluate(&resource, &offline()).await.is_none(), "pct {pct}");
        }
    }

    #[tokio::test]
    async fn test_overutilized_is_advisory() {
        let engine = RuleEngine::standard();
        let resource = running("i-hot", "t3.small", 93.4, 15.18);

        let rec = engine.evaluate(&resource, &offline()).await.unwrap();
        assert_eq!(rec.category, RecommendationCategory::Investigate);
        assert_eq!(rec.message, "Investigate high CPU usage on i-hot (93.4%)");
        assert_eq!(rec.estimated_monthly_savings, 0.0);
    }

    #[tokio::test]
    async fn test_underutilized_without_smaller_subtype_stops() {
        let engine = RuleEngine::standard();
        let resource = running("i-1", "t3.small", 5.0, 15.18);

        assert!(engine.evaluate(&resource, &offline()).await.is_none());
    }

    #[tokio::test]
    async fn test_downsize_savings_is_price_difference() {
        let engine = RuleEngine::standard();
        let pricing = offline();
        let resource = running("i-small", "t2.small", 4.0, 0.023 * 730.0);

        let rec = engine.evaluate(&resource, &pricing).await.unwrap();
        let expected = 0.023 * 730.0 - 0.0116 * 730.0;
        assert_eq!(rec.category, RecommendationCategory::Downsize);
        assert!((rec.estimated_monthly_savings - expected).abs() < 1e-9);
        assert_eq!(
            rec.message,
            "Downsize t2.small (i-small) to t2.micro (current CPU: 4.0%, saves $8.32/month)"
        );
    }

    fn catalog_with_xlarge() -> PricingResolver {
        let provider = MockProvider::new()
            .with_hourly_price("m5.large", 0.096)
            .with_hourly_price("m5.xlarge", 0.192);
        PricingResolver::new(Arc::new(provider), PriceTable::reference())
    }

    #[tokio::test]
    async fn test_negative_savings_surfaced_by_default() {
        let engine = RuleEngine::standard();
        let resource = running("i-m5", "m5.large", 5.0, 0.096 * 730.0);

        let rec = engine.evaluate(&resource, &catalog_with_xlarge()).await.unwrap();
        assert!((rec.estimated_monthly_savings + 70.08).abs() < 1e-9);
        assert!(rec.message.starts_with("Downsize m5.large (i-m5) to m5.xlarge"));
    }

    #[tokio::test]
    async fn test_negative_savings_clamp_and_suppress() {
        let resource = running("i-m5", "m5.large", 5.0, 0.096 * 730.0);
        let pricing = catalog_with_xlarge();

        let clamp = RuleEngine::new(&RulesConfig {
            negative_savings: NegativeSavingsPolicy::Clamp,
            ..RulesConfig::default()
        });
        let rec = clamp.evaluate(&resource, &pricing).await.unwrap();
        assert_eq!(rec.estimated_monthly_savings, 0.0);
        assert!(rec.message.ends_with("saves $0.00/month)"));

        let suppress = RuleEngine::new(&RulesConfig {
            negative_savings: NegativeSavingsPolicy::Suppress,
            ..RulesConfig::default()
        });
        assert!(suppress.evaluate(&resource, &pricing).await.is_none());
    }

    #[tokio::test]
    async fn test_object_store_has_no_recommendation() {
        let engine = RuleEngine::standard();
        let bucket = ResourceRecord::new(
            "app-logs",
            ResourceKind::ObjectStore,
            "S3",
            LifecycleState::Active,
            "us-east-1",
        );

        assert!(engine.evaluate(&bucket, &offline()).await.is_none());
    }

    #[tokio::test]
    async fn test_custom_thresholds() {
        let engine = RuleEngine::new(&RulesConfig {
            underutilized_below: 30.0,
            overutilized_above: 60.0,
            ..RulesConfig::default()
        });

        let low = running("i-1", "t2.small", 25.0, 16.79);
        assert_eq!(
            engine.evaluate(&low, &offline()).await.unwrap().category,
            RecommendationCategory::Downsize
        );

        let high = running("i-2", "t2.small", 65.0, 16.79);
        assert_eq!(
            engine.evaluate(&high, &offline()).await.unwrap().category,
            RecommendationCategory::Investigate
        );
    }

    #[test]
    fn test_general_recommendations() {
        let general = RuleEngine::standard().general_recommendations();

        assert_eq!(general.len(), 4);
        assert!(general.iter().all(|r| r.is_general() && r.estimated_monthly_savings == 0.0));
        assert_eq!(general[0].message, "Consider Reserved Instances for steady-state workloads");
        assert_eq!(general[3].message, "Check for obsolete snapshots");
    }
}
