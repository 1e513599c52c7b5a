//! # cloudtrim_core
//!
//! Cost analysis and recommendation engine for cloudtrim.
//!
//! This crate inspects a region's compute and storage inventory, attaches
//! utilization and price facts to every resource, applies the recommendation
//! rules and totals the estimated monthly savings.
//!
//! # Architecture
//!
//! - **Pricing**: live price catalog first, static reference table on failure
//! - **Utilization**: 14-day mean of daily CPU averages
//! - **Inventory**: paged listing per resource kind, optional ordered fan-out
//! - **Rules**: ordered first-match rule list plus fixed general advisories
//! - **Analyzer**: composes the above into one run
//! - **Service**: request boundary with an injectable result cache
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cloudtrim_core::{AnalysisRequest, AnalysisService, Analyzer, AnalyzerConfig, MemoryCache};
//! use cloudtrim_provider::{ProviderClients, SnapshotProvider};
//!
//! let clients = ProviderClients::from_provider(SnapshotProvider::load("inventory.yaml")?);
//! let analyzer = Analyzer::new(clients, AnalyzerConfig::default())?;
//! let service = AnalysisService::new(analyzer).with_cache(Arc::new(MemoryCache::new()));
//!
//! let result = service.analyze(&AnalysisRequest::new("find idle instances")).await?;
//! println!("Estimated savings: ${:.2}/month", result.total_estimated_savings);
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod inventory;
pub mod model;
pub mod pricing;
pub mod rules;
pub mod savings;
pub mod service;
pub mod utilization;

// Re-export main types for convenience
pub use analyzer::Analyzer;
pub use cache::{cache_key, fingerprint, FileCache, MemoryCache, ResultCache, CACHE_FILE_SUFFIX};
pub use config::{
    AnalyzerConfig, CacheConfig, InventoryConfig, NegativeSavingsPolicy, PricingConfig,
    RulesConfig, UtilizationConfig, DEFAULT_REGION, HOURS_PER_MONTH,
};
pub use error::{CoreError, CoreResult, KindFailure};
pub use inventory::{InventoryCollector, OBJECT_STORE_SUBTYPE};
pub use model::{
    AnalysisRequest, AnalysisResponse, AnalysisResult, LifecycleState, Recommendation,
    RecommendationCategory, ResourceKind, ResourceRecord, ResourceSummary,
};
pub use pricing::{catalog_location, region_name, PriceLookup, PriceTable, PricingResolver};
pub use rules::{RecommendationRule, RuleEngine, GENERAL_RECOMMENDATIONS};
pub use savings::{aggregate, round_currency};
pub use service::AnalysisService;
pub use utilization::{mean_utilization, UtilizationSampler};
