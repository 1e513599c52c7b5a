//! Pricing resolver.
//!
//! Prices come from the live price catalog when it answers with a usable
//! on-demand price, and from a static reference table otherwise. Resolution
//! never fails: a resource with no pricing data anywhere costs 0.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use cloudtrim_provider::{PriceCatalogApi, PriceQuery};

use crate::config::{PricingConfig, HOURS_PER_MONTH};
use crate::model::ResourceKind;

/// Catalog location names for region codes.
const REGION_NAMES: &[(&str, &str)] = &[
    ("us-east-1", "US East (N. Virginia)"),
    ("us-east-2", "US East (Ohio)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
    ("ca-central-1", "Canada (Central)"),
    ("eu-west-1", "EU (Ireland)"),
    ("eu-west-2", "EU (London)"),
    ("eu-west-3", "EU (Paris)"),
    ("eu-central-1", "EU (Frankfurt)"),
    ("eu-north-1", "EU (Stockholm)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ap-northeast-2", "Asia Pacific (Seoul)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("sa-east-1", "South America (Sao Paulo)"),
];

/// Look up the catalog location name of a region code.
pub fn region_name(region: &str) -> Option<&'static str> {
    REGION_NAMES
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(_, name)| *name)
}

/// Catalog location for a region; unmapped codes are used as-is.
pub fn catalog_location(region: &str) -> &str {
    region_name(region).unwrap_or(region)
}

/// Outcome of a live catalog lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceLookup {
    Found(f64),
    /// The catalog could not produce a price; the reason is for logging only.
    Unavailable(String),
}

/// Extract the hourly USD price from an on-demand price document.
///
/// Takes the first on-demand term and its first price dimension.
pub fn parse_on_demand_price(document: &str) -> Result<f64, String> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| format!("malformed price document: {}", e))?;

    let term = value
        .pointer("/terms/OnDemand")
        .and_then(Value::as_object)
        .and_then(|terms| terms.values().next())
        .ok_or("no on-demand term")?;

    let usd = term
        .get("priceDimensions")
        .and_then(Value::as_object)
        .and_then(|dims| dims.values().next())
        .and_then(|dim| dim.pointer("/pricePerUnit/USD"))
        .and_then(Value::as_str)
        .ok_or("no USD price dimension")?;

    let price: f64 = usd
        .parse()
        .map_err(|_| format!("non-numeric price: {}", usd))?;

    if !price.is_finite() || price < 0.0 {
        return Err(format!("invalid price: {}", price));
    }
    Ok(price)
}

/// Static reference prices: region -> subtype -> hourly USD.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PriceTable {
    pub fn new(prices: BTreeMap<String, BTreeMap<String, f64>>) -> Self {
        Self { prices }
    }

    /// The built-in reference table.
    pub fn reference() -> Self {
        Self::new(PricingConfig::default().fallback)
    }

    pub fn get(&self, region: &str, subtype: &str) -> Option<f64> {
        self.prices.get(region).and_then(|p| p.get(subtype)).copied()
    }
}

/// Resolves hourly and monthly prices for resources.
pub struct PricingResolver {
    catalog: Option<Arc<dyn PriceCatalogApi>>,
    fallback: PriceTable,
    hours_per_month: f64,
}

impl PricingResolver {
    pub fn new(catalog: Arc<dyn PriceCatalogApi>, fallback: PriceTable) -> Self {
        Self {
            catalog: Some(catalog),
            fallback,
            hours_per_month: HOURS_PER_MONTH,
        }
    }

    /// A resolver that only consults the fallback table.
    pub fn offline(fallback: PriceTable) -> Self {
        Self {
            catalog: None,
            fallback,
            hours_per_month: HOURS_PER_MONTH,
        }
    }

    pub fn with_hours_per_month(mut self, hours: f64) -> Self {
        self.hours_per_month = hours;
        self
    }

    pub fn hours_per_month(&self) -> f64 {
        self.hours_per_month
    }

    /// Build the catalog query for a subtype in a region.
    pub fn catalog_query(subtype: &str, region: &str) -> PriceQuery {
        PriceQuery::new("AmazonEC2")
            .term_match("instanceType", subtype)
            .term_match("location", catalog_location(region))
            .term_match("operatingSystem", "Linux")
            .term_match("tenancy", "Shared")
            .term_match("preInstalledSw", "NA")
            .term_match("capacitystatus", "Used")
            .max_results(1)
    }

    /// Ask the live catalog for an hourly price. Single attempt, no retry.
    pub async fn lookup_catalog(&self, subtype: &str, region: &str) -> PriceLookup {
        let Some(catalog) = &self.catalog else {
            return PriceLookup::Unavailable("catalog disabled".to_string());
        };

        let query = Self::catalog_query(subtype, region);
        let documents = match catalog.get_products(&query).await {
            Ok(docs) => docs,
            Err(e) => return PriceLookup::Unavailable(e.to_string()),
        };

        match documents.first() {
            None => PriceLookup::Unavailable("no matching price".to_string()),
            Some(doc) => match parse_on_demand_price(doc) {
                Ok(price) => PriceLookup::Found(price),
                Err(reason) => PriceLookup::Unavailable(reason),
            },
        }
    }

    /// Look up the static reference table; 0 when absent.
    pub fn fallback_price(&self, subtype: &str, region: &str) -> f64 {
        match self.fallback.get(region, subtype) {
            Some(price) => price,
            None => {
                debug!("No pricing data for {} in {}", subtype, region);
                0.0
            }
        }
    }

    /// Resolve the hourly price of a resource.
    pub async fn resolve_price(&self, kind: ResourceKind, subtype: &str, region: &str) -> f64 {
        if !kind.has_subtype_pricing() {
            return 0.0;
        }

        match self.lookup_catalog(subtype, region).await {
            PriceLookup::Found(price) => {
                debug!("Catalog price for {} in {}: {}", subtype, region, price);
                price
            }
            PriceLookup::Unavailable(reason) => {
                if self.catalog.is_some() {
                    debug!(
                        "Price catalog unavailable for {} in {} ({}), using reference table",
                        subtype, region, reason
                    );
                }
                self.fallback_price(subtype, region)
            }
        }
    }

    /// Resolve the monthly cost of a resource.
    pub async fn monthly_cost(&self, kind: ResourceKind, subtype: &str, region: &str) -> f64 {
        self.resolve_price(kind, subtype, region).await * self.hours_per_month
    }
}

impl std::fmt::Debug for PricingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingResolver")
            .field("catalog", &self.catalog.is_some())
            .field("fallback", &self.fallback)
            .field("hours_per_month", &self.hours_per_month)
            .finish()
    }
}
