//! Analyzer configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides:
//!
//! ```toml
//! default_region = "us-west-2"
//!
//! [rules]
//! negative_savings = "clamp"
//!
//! [rules.downsize]
//! "m5.xlarge" = "m5.large"
//!
//! [pricing.fallback.us-west-2]
//! "m5.large" = 0.096
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Average number of hours in a month.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Region used when a request names none.
pub const DEFAULT_REGION: &str = "us-east-1";

/// What to do with a downsize recommendation whose savings come out negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeSavingsPolicy {
    /// Emit the recommendation with the raw difference.
    #[default]
    Surface,
    /// Emit the recommendation with savings set to 0.
    Clamp,
    /// Drop the recommendation.
    Suppress,
}

/// Utilization sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilizationConfig {
    /// Trailing window length in days
    pub lookback_days: u32,
    /// Aggregation bucket length in seconds
    pub period_seconds: u32,
}

impl Default for UtilizationConfig {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            period_seconds: 86_400,
        }
    }
}

/// Recommendation rule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Running resources below this utilization are downsize candidates
    pub underutilized_below: f64,
    /// Running resources above this utilization get an advisory
    pub overutilized_above: f64,
    pub negative_savings: NegativeSavingsPolicy,
    /// Subtype -> next smaller subtype in the same family
    pub downsize: BTreeMap<String, String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        // t2.micro and t3.small have no smaller mapping.
        let downsize = [("t2.small", "t2.micro"), ("m5.large", "m5.xlarge")]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            underutilized_below: 15.0,
            overutilized_above: 80.0,
            negative_savings: NegativeSavingsPolicy::default(),
            downsize,
        }
    }
}

/// Pricing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Query the live price catalog before the fallback table
    pub catalog_enabled: bool,
    /// Region -> subtype -> hourly USD price
    pub fallback: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let us_east_1 = [("t2.micro", 0.0116), ("t3.small", 0.0208), ("m5.large", 0.096)]
            .into_iter()
            .map(|(subtype, price)| (subtype.to_string(), price))
            .collect();

        let mut fallback = BTreeMap::new();
        fallback.insert(DEFAULT_REGION.to_string(), us_east_1);

        Self {
            catalog_enabled: true,
            fallback,
        }
    }
}

/// Inventory collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Per-resource lookups in flight at once (1 = sequential)
    pub max_concurrency: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
        }
    }
}

/// Complete analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_region: String,
    pub hours_per_month: f64,
    pub utilization: UtilizationConfig,
    pub rules: RulesConfig,
    pub pricing: PricingConfig,
    pub inventory: InventoryConfig,
    pub cache: CacheConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            hours_per_month: HOURS_PER_MONTH,
            utilization: UtilizationConfig::default(),
            rules: RulesConfig::default(),
            pricing: PricingConfig::default(),
            inventory: InventoryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load a configuration file (`.toml`, `.yaml`/`.yml` or `.json`).
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))?
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))?
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))?
            }
            other => {
                return Err(CoreError::Config(format!(
                    "unsupported config format: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_region.trim().is_empty() {
            return Err(CoreError::Config("default_region must not be empty".to_string()));
        }
        if !(self.hours_per_month > 0.0) {
            return Err(CoreError::Config("hours_per_month must be positive".to_string()));
        }
        if self.utilization.lookback_days == 0 || self.utilization.period_seconds == 0 {
            return Err(CoreError::Config(
                "utilization window and period must be non-zero".to_string(),
            ));
        }

        let rules = &self.rules;
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(rules.underutilized_below) || !in_range(rules.overutilized_above) {
            return Err(CoreError::Config(
                "utilization thresholds must be within 0-100".to_string(),
            ));
        }
        if rules.underutilized_below >= rules.overutilized_above {
            return Err(CoreError::Config(format!(
                "underutilized threshold ({}) must be below overutilized threshold ({})",
                rules.underutilized_below, rules.overutilized_above
            )));
        }

        if self.inventory.max_concurrency == 0 {
            return Err(CoreError::Config("max_concurrency must be at least 1".to_string()));
        }

        for (region, prices) in &self.pricing.fallback {
            if let Some((subtype, price)) = prices.iter().find(|(_, p)| !(**p >= 0.0)) {
                return Err(CoreError::Config(format!(
                    "fallback price for {} in {} must be non-negative, got {}",
                    subtype, region, price
                )));
            }
        }

        Ok(())
    }

    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.inventory.max_concurrency = max;
        self
    }

    pub fn with_negative_savings(mut self, policy: NegativeSavingsPolicy) -> Self {
        self.rules.negative_savings = policy;
        self
    }

    pub fn with_thresholds(mut self, underutilized_below: f64, overutilized_above: f64) -> Self {
        self.rules.underutilized_below = underutilized_below;
        self.rules.overutilized_above = overutilized_above;
        self
    }

    pub fn with_downsize(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rules.downsize.insert(from.into(), to.into());
        self
    }

    pub fn with_fallback_price(
        mut self,
        region: impl Into<String>,
        subtype: impl Into<String>,
        usd_per_hour: f64,
    ) -> Self {
        self.pricing
            .fallback
            .entry(region.into())
            .or_default()
            .insert(subtype.into(), usd_per_hour);
        self
    }

    pub fn without_catalog(mut self) -> Self {
        self.pricing.catalog_enabled = false;
        self
    }

    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache.ttl_seconds = seconds;
        self
    }
}
