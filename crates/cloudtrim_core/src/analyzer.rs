//! Analysis orchestrator.
//!
//! One run: resolve the region, collect the inventory, evaluate every
//! resource, append the general advisories and total the savings.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use cloudtrim_provider::ProviderClients;

use crate::config::AnalyzerConfig;
use crate::error::CoreResult;
use crate::inventory::InventoryCollector;
use crate::model::AnalysisResult;
use crate::pricing::{PriceTable, PricingResolver};
use crate::rules::RuleEngine;
use crate::savings;
use crate::utilization::UtilizationSampler;

/// Runs cost analyses against a set of provider clients.
///
/// Holds only configuration and shared clients, so one analyzer can serve
/// concurrent runs.
pub struct Analyzer {
    config: AnalyzerConfig,
    pricing: Arc<PricingResolver>,
    collector: InventoryCollector,
    rules: RuleEngine,
}

impl Analyzer {
    /// Create an analyzer. Fails if the configuration does not validate.
    pub fn new(clients: ProviderClients, config: AnalyzerConfig) -> CoreResult<Self> {
        config.validate()?;

        let table = PriceTable::new(config.pricing.fallback.clone());
        let resolver = if config.pricing.catalog_enabled {
            PricingResolver::new(clients.pricing.clone(), table)
        } else {
            PricingResolver::offline(table)
        };
        let pricing = Arc::new(resolver.with_hours_per_month(config.hours_per_month));

        let sampler = UtilizationSampler::new(clients.metrics.clone(), &config.utilization);
        let collector = InventoryCollector::new(clients.compute, clients.storage, sampler, pricing.clone())
            .with_max_concurrency(config.inventory.max_concurrency);
        let rules = RuleEngine::new(&config.rules);

        Ok(Self {
            config,
            pricing,
            collector,
            rules,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn pricing(&self) -> &PricingResolver {
        &self.pricing
    }

    /// The region a request actually runs in: the configured default when
    /// none or an empty one is given.
    pub fn resolve_region(&self, region: Option<&str>) -> String {
        match region.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => self.config.default_region.clone(),
        }
    }

    /// Run one analysis. Any inventory collection failure fails the run.
    pub async fn analyze(&self, region: Option<&str>) -> CoreResult<AnalysisResult> {
        let region = self.resolve_region(region);
        info!("Analyzing costs in {}", region);

        let resources = self.collector.collect(&region).await?;

        let mut recommendations = Vec::new();
        for resource in &resources {
            if let Some(rec) = self.rules.evaluate(resource, &self.pricing).await {
                recommendations.push(rec);
            }
        }
        debug!(
            "{} resource recommendations for {} resources",
            recommendations.len(),
            resources.len()
        );
        recommendations.extend(self.rules.general_recommendations());

        let total_estimated_savings = savings::aggregate(&recommendations);
        info!(
            "Analysis of {} complete: {} resources, estimated savings ${:.2}/month",
            region,
            resources.len(),
            total_estimated_savings
        );

        Ok(AnalysisResult {
            region,
            resources,
            recommendations,
            total_estimated_savings,
            generated_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("pricing", &self.pricing)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
