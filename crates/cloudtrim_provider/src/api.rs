//! Provider API traits and wire types.
//!
//! Each trait covers one outbound service: instance listing, bucket listing,
//! metric statistics and the price catalog. Listings are paged; callers keep
//! passing `next_token` back until it comes back as `None`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

/// One compute instance as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub instance_id: String,
    pub instance_type: String,
    /// Raw lifecycle state name (e.g. "running", "stopped").
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

impl InstanceDescription {
    pub fn new(
        instance_id: impl Into<String>,
        instance_type: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            instance_type: instance_type.into(),
            state: state.into(),
            availability_zone: None,
        }
    }

    pub fn availability_zone(mut self, zone: impl Into<String>) -> Self {
        self.availability_zone = Some(zone.into());
        self
    }
}

/// A page of instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstancePage {
    pub instances: Vec<InstanceDescription>,
    pub next_token: Option<String>,
}

/// One object-storage bucket as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
}

impl BucketDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_date: None,
        }
    }
}

/// A page of buckets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketPage {
    pub buckets: Vec<BucketDescription>,
    pub next_token: Option<String>,
}

/// Metric statistics query for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimension_name: String,
    pub dimension_value: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Aggregation bucket length in seconds
    pub period_seconds: u32,
    pub statistic: String,
}

impl MetricQuery {
    /// Average CPU utilization of an instance, bucketed by `period_seconds`.
    pub fn cpu_utilization(
        instance_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        period_seconds: u32,
    ) -> Self {
        Self {
            namespace: "AWS/EC2".to_string(),
            metric_name: "CPUUtilization".to_string(),
            dimension_name: "InstanceId".to_string(),
            dimension_value: instance_id.into(),
            start_time,
            end_time,
            period_seconds,
            statistic: "Average".to_string(),
        }
    }
}

/// A single aggregated metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub average: f64,
}

/// A price catalog filter, serialized the way the catalog expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFilter {
    #[serde(rename = "Type")]
    pub filter_type: String,
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// Price catalog product query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceQuery {
    pub service_code: String,
    pub filters: Vec<PriceFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

impl PriceQuery {
    pub fn new(service_code: impl Into<String>) -> Self {
        Self {
            service_code: service_code.into(),
            filters: Vec::new(),
            max_results: None,
        }
    }

    /// Add an exact-match filter.
    pub fn term_match(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(PriceFilter {
            filter_type: "TERM_MATCH".to_string(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Get the value of the filter on `field`, if any.
    pub fn filter_value(&self, field: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.value.as_str())
    }
}

/// Build an on-demand price document in the catalog's JSON layout.
///
/// Price documents are returned as raw JSON strings by the catalog; this
/// produces one with a single term and a single hourly price dimension.
pub fn on_demand_price_document(instance_type: &str, location: &str, usd_per_hour: f64) -> String {
    let sku = format!("SKU-{}", instance_type.replace('.', "-").to_uppercase());
    let term_key = format!("{}.JRTCKXETXF", sku);
    let dimension_key = format!("{}.6YS6EN2CT7", term_key);
    serde_json::json!({
        "product": {
            "sku": sku,
            "attributes": {
                "instanceType": instance_type,
                "location": location,
                "operatingSystem": "Linux",
                "tenancy": "Shared",
            }
        },
        "terms": {
            "OnDemand": {
                term_key: {
                    "priceDimensions": {
                        dimension_key: {
                            "unit": "Hrs",
                            "pricePerUnit": { "USD": format!("{:.10}", usd_per_hour) }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

/// Compute instance listing.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// List one page of instances in a region.
    async fn describe_instances(
        &self,
        region: &str,
        next_token: Option<&str>,
    ) -> ProviderResult<InstancePage>;
}

/// Object-storage bucket listing.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// List one page of buckets in a region.
    async fn list_buckets(&self, region: &str, next_token: Option<&str>)
        -> ProviderResult<BucketPage>;
}

/// Utilization telemetry.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Fetch aggregated datapoints for a query. An empty vector means no data,
    /// an error means the telemetry source could not be reached.
    async fn get_metric_statistics(&self, query: &MetricQuery) -> ProviderResult<Vec<Datapoint>>;
}

/// Price catalog.
#[async_trait]
pub trait PriceCatalogApi: Send + Sync {
    /// Fetch raw JSON price documents matching the query.
    async fn get_products(&self, query: &PriceQuery) -> ProviderResult<Vec<String>>;
}

/// The set of provider clients an analysis runs against.
///
/// Built once at startup and handed to the analyzer explicitly.
#[derive(Clone)]
pub struct ProviderClients {
    pub compute: Arc<dyn ComputeApi>,
    pub storage: Arc<dyn StorageApi>,
    pub metrics: Arc<dyn MetricsApi>,
    pub pricing: Arc<dyn PriceCatalogApi>,
}

impl ProviderClients {
    pub fn new(
        compute: Arc<dyn ComputeApi>,
        storage: Arc<dyn StorageApi>,
        metrics: Arc<dyn MetricsApi>,
        pricing: Arc<dyn PriceCatalogApi>,
    ) -> Self {
        Self {
            compute,
            storage,
            metrics,
            pricing,
        }
    }

    /// Use a single provider for every API.
    pub fn from_provider<P>(provider: P) -> Self
    where
        P: ComputeApi + StorageApi + MetricsApi + PriceCatalogApi + 'static,
    {
        let provider = Arc::new(provider);
        Self {
            compute: provider.clone(),
            storage: provider.clone(),
            metrics: provider.clone(),
            pricing: provider,
        }
    }

    /// Replace the price catalog client.
    pub fn with_price_catalog(mut self, pricing: Arc<dyn PriceCatalogApi>) -> Self {
        self.pricing = pricing;
        self
    }
}

impl std::fmt::Debug for ProviderClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClients").finish_non_exhaustive()
    }
}
