//! File-backed inventory snapshot provider.
//!
//! A snapshot captures an account's inventory, utilization series and price
//! catalog entries in a single YAML or JSON file, so an audit can run offline.
//!
//! ```yaml
//! page_size: 50
//! instances:
//!   - instance_id: i-0abc
//!     instance_type: m5.large
//!     state: running
//!     region: us-east-1
//!     availability_zone: us-east-1a
//!     cpu_daily_averages: [4.2, 3.9, 5.1]
//! buckets:
//!   - name: app-logs
//!     region: us-east-1
//! prices:
//!   - instance_type: m5.large
//!     location: US East (N. Virginia)
//!     usd_per_hour: 0.096
//! ```

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{
    on_demand_price_document, BucketDescription, BucketPage, ComputeApi, Datapoint,
    InstanceDescription, InstancePage, MetricQuery, MetricsApi, PriceCatalogApi, PriceQuery,
    StorageApi,
};
use crate::error::{ProviderError, ProviderResult};

fn default_page_size() -> usize {
    50
}

/// An instance entry in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInstance {
    pub instance_id: String,
    pub instance_type: String,
    pub state: String,
    /// Region the instance lives in; `None` matches every region.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// Daily average CPU utilization, oldest first.
    #[serde(default)]
    pub cpu_daily_averages: Vec<f64>,
}

/// A bucket entry in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBucket {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

/// A price catalog entry in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPrice {
    pub instance_type: String,
    /// Catalog location name (e.g. "US East (N. Virginia)").
    pub location: String,
    pub usd_per_hour: f64,
}

/// Snapshot file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub instances: Vec<SnapshotInstance>,
    #[serde(default)]
    pub buckets: Vec<SnapshotBucket>,
    #[serde(default)]
    pub prices: Vec<SnapshotPrice>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            instances: Vec::new(),
            buckets: Vec::new(),
            prices: Vec::new(),
        }
    }
}

/// Provider that serves a [`Snapshot`] through the provider APIs.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    snapshot: Snapshot,
}

impl SnapshotProvider {
    pub fn new(snapshot: Snapshot) -> ProviderResult<Self> {
        if snapshot.page_size == 0 {
            return Err(ProviderError::InvalidSnapshot(
                "page_size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { snapshot })
    }

    /// Load a snapshot from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let snapshot: Snapshot = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            other => {
                return Err(ProviderError::InvalidSnapshot(format!(
                    "unsupported snapshot format: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };

        debug!(
            "Loaded snapshot {} ({} instances, {} buckets, {} prices)",
            path.display(),
            snapshot.instances.len(),
            snapshot.buckets.len(),
            snapshot.prices.len()
        );
        Self::new(snapshot)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Slice one page out of `items` starting at the offset encoded in `token`.
    fn page<T: Clone>(&self, items: &[T], token: Option<&str>) -> ProviderResult<(Vec<T>, Option<String>)> {
        let offset = match token {
            None => 0,
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| ProviderError::api("snapshot", format!("invalid page token: {}", t)))?,
        };

        let end = (offset + self.snapshot.page_size).min(items.len());
        let page = items.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
        let next = (end < items.len()).then(|| end.to_string());
        Ok((page, next))
    }
}

fn in_region(entry_region: &Option<String>, region: &str) -> bool {
    entry_region.as_deref().map_or(true, |r| r == region)
}

#[async_trait]
impl ComputeApi for SnapshotProvider {
    async fn describe_instances(
        &self,
        region: &str,
        next_token: Option<&str>,
    ) -> ProviderResult<InstancePage> {
        let matching: Vec<InstanceDescription> = self
            .snapshot
            .instances
            .iter()
            .filter(|i| in_region(&i.region, region))
            .map(|i| InstanceDescription {
                instance_id: i.instance_id.clone(),
                instance_type: i.instance_type.clone(),
                state: i.state.clone(),
                availability_zone: i.availability_zone.clone(),
            })
            .collect();

        let (instances, next_token) = self.page(&matching, next_token)?;
        Ok(InstancePage {
            instances,
            next_token,
        })
    }
}

#[async_trait]
impl StorageApi for SnapshotProvider {
    async fn list_buckets(&self, region: &str, next_token: Option<&str>) -> ProviderResult<BucketPage> {
        let matching: Vec<BucketDescription> = self
            .snapshot
            .buckets
            .iter()
            .filter(|b| in_region(&b.region, region))
            .map(|b| BucketDescription {
                name: b.name.clone(),
                creation_date: b.creation_date,
            })
            .collect();

        let (buckets, next_token) = self.page(&matching, next_token)?;
        Ok(BucketPage { buckets, next_token })
    }
}

#[async_trait]
impl MetricsApi for SnapshotProvider {
    async fn get_metric_statistics(&self, query: &MetricQuery) -> ProviderResult<Vec<Datapoint>> {
        let Some(instance) = self
            .snapshot
            .instances
            .iter()
            .find(|i| i.instance_id == query.dimension_value)
        else {
            return Ok(Vec::new());
        };

        // The series is oldest first; the newest value belongs to the last
        // bucket before `end_time`. Values older than the window are dropped.
        let period = Duration::seconds(i64::from(query.period_seconds.max(1)));
        let series = &instance.cpu_daily_averages;
        Ok(series
            .iter()
            .rev()
            .enumerate()
            .map(|(i, average)| Datapoint {
                timestamp: query.end_time - period * (i as i32 + 1),
                average: *average,
            })
            .filter(|d| d.timestamp >= query.start_time)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect())
    }
}

#[async_trait]
impl PriceCatalogApi for SnapshotProvider {
    async fn get_products(&self, query: &PriceQuery) -> ProviderResult<Vec<String>> {
        let instance_type = query.filter_value("instanceType");
        let location = query.filter_value("location");

        let limit = query.max_results.map(|m| m as usize).unwrap_or(usize::MAX);
        Ok(self
            .snapshot
            .prices
            .iter()
            .filter(|p| instance_type.map_or(true, |t| t == p.instance_type))
            .filter(|p| location.map_or(true, |l| l == p.location))
            .take(limit)
            .map(|p| on_demand_price_document(&p.instance_type, &p.location, p.usd_per_hour))
            .collect())
    }
}
