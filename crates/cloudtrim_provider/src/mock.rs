//! Mock provider for testing.
//!
//! Provides a scriptable in-memory implementation of every provider API
//! for use in tests without network access.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::RwLock;

use crate::api::{
    on_demand_price_document, BucketDescription, BucketPage, ComputeApi, Datapoint,
    InstanceDescription, InstancePage, MetricQuery, MetricsApi, PriceCatalogApi, PriceQuery,
    StorageApi,
};
use crate::error::{ProviderError, ProviderResult};

/// The provider APIs a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockApi {
    Compute,
    Storage,
    Metrics,
    Pricing,
}

impl MockApi {
    fn service(&self) -> &'static str {
        match self {
            MockApi::Compute => "compute",
            MockApi::Storage => "storage",
            MockApi::Metrics => "metrics",
            MockApi::Pricing => "pricing",
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub region: Option<String>,
    /// Resource id, subtype, or page token depending on the method.
    pub target: Option<String>,
}

/// Mock provider for testing.
///
/// Listings are served in the pages they were added in. Datapoints are keyed
/// by resource id and price documents by instance type.
#[derive(Clone, Default)]
pub struct MockProvider {
    instance_pages: Arc<RwLock<Vec<Vec<InstanceDescription>>>>,
    bucket_pages: Arc<RwLock<Vec<Vec<BucketDescription>>>>,
    datapoints: Arc<RwLock<HashMap<String, Vec<f64>>>>,
    price_documents: Arc<RwLock<HashMap<String, Vec<String>>>>,
    failures: Arc<RwLock<HashMap<MockApi, String>>>,
    metric_failures: Arc<RwLock<HashSet<String>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl MockProvider {
    /// Create a new, empty mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance to the last listing page.
    pub fn with_instance(self, instance: InstanceDescription) -> Self {
        {
            let mut pages = self.instance_pages.write();
            match pages.last_mut() {
                Some(page) => page.push(instance),
                None => pages.push(vec![instance]),
            }
        }
        self
    }

    /// Start a new listing page holding these instances.
    pub fn with_instance_page(self, instances: Vec<InstanceDescription>) -> Self {
        self.instance_pages.write().push(instances);
        self
    }

    /// Add a bucket to the last listing page.
    pub fn with_bucket(self, bucket: BucketDescription) -> Self {
        {
            let mut pages = self.bucket_pages.write();
            match pages.last_mut() {
                Some(page) => page.push(bucket),
                None => pages.push(vec![bucket]),
            }
        }
        self
    }

    /// Start a new bucket listing page.
    pub fn with_bucket_page(self, buckets: Vec<BucketDescription>) -> Self {
        self.bucket_pages.write().push(buckets);
        self
    }

    /// Set the daily average utilization series for a resource.
    pub fn with_utilization(self, resource_id: impl Into<String>, daily_averages: &[f64]) -> Self {
        self.datapoints
            .write()
            .insert(resource_id.into(), daily_averages.to_vec());
        self
    }

    /// Add a raw price document for an instance type.
    pub fn with_price_document(self, instance_type: impl Into<String>, document: impl Into<String>) -> Self {
        self.price_documents
            .write()
            .entry(instance_type.into())
            .or_default()
            .push(document.into());
        self
    }

    /// Add a well-formed on-demand hourly price for an instance type.
    pub fn with_hourly_price(self, instance_type: impl Into<String>, usd_per_hour: f64) -> Self {
        let instance_type = instance_type.into();
        let document = on_demand_price_document(&instance_type, "mock", usd_per_hour);
        self.with_price_document(instance_type, document)
    }

    /// Make every call to an API fail.
    pub fn fail(self, api: MockApi, message: impl Into<String>) -> Self {
        self.failures.write().insert(api, message.into());
        self
    }

    /// Make metric queries for one resource fail.
    pub fn fail_metrics_for(self, resource_id: impl Into<String>) -> Self {
        self.metric_failures.write().insert(resource_id.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method == method)
    }

    fn record_call(&self, method: &str, region: Option<&str>, target: Option<&str>) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            region: region.map(str::to_string),
            target: target.map(str::to_string),
        });
    }

    fn check_failure(&self, api: MockApi) -> ProviderResult<()> {
        if let Some(msg) = self.failures.read().get(&api).cloned() {
            return Err(ProviderError::unavailable(api.service(), msg));
        }
        Ok(())
    }
}

/// Resolve a page token into a page index and the token for the page after it.
fn page_at<T: Clone>(pages: &[Vec<T>], token: Option<&str>) -> ProviderResult<(Vec<T>, Option<String>)> {
    let index = match token {
        None => 0,
        Some(t) => t
            .strip_prefix("page-")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| ProviderError::api("mock", format!("invalid page token: {}", t)))?,
    };

    let items = pages.get(index).cloned().unwrap_or_default();
    let next = if index + 1 < pages.len() {
        Some(format!("page-{}", index + 1))
    } else {
        None
    };
    Ok((items, next))
}

#[async_trait]
impl ComputeApi for MockProvider {
    async fn describe_instances(
        &self,
        region: &str,
        next_token: Option<&str>,
    ) -> ProviderResult<InstancePage> {
        self.record_call("describe_instances", Some(region), next_token);
        self.check_failure(MockApi::Compute)?;

        let (instances, next_token) = page_at(&self.instance_pages.read(), next_token)?;
        Ok(InstancePage {
            instances,
            next_token,
        })
    }
}

#[async_trait]
impl StorageApi for MockProvider {
    async fn list_buckets(&self, region: &str, next_token: Option<&str>) -> ProviderResult<BucketPage> {
        self.record_call("list_buckets", Some(region), next_token);
        self.check_failure(MockApi::Storage)?;

        let (buckets, next_token) = page_at(&self.bucket_pages.read(), next_token)?;
        Ok(BucketPage { buckets, next_token })
    }
}

#[async_trait]
impl MetricsApi for MockProvider {
    async fn get_metric_statistics(&self, query: &MetricQuery) -> ProviderResult<Vec<Datapoint>> {
        self.record_call("get_metric_statistics", None, Some(&query.dimension_value));
        self.check_failure(MockApi::Metrics)?;

        if self.metric_failures.read().contains(&query.dimension_value) {
            return Err(ProviderError::unavailable(
                "metrics",
                format!("no route to telemetry for {}", query.dimension_value),
            ));
        }

        let averages = self
            .datapoints
            .read()
            .get(&query.dimension_value)
            .cloned()
            .unwrap_or_default();

        let period = Duration::seconds(i64::from(query.period_seconds));
        Ok(averages
            .into_iter()
            .enumerate()
            .map(|(i, average)| Datapoint {
                timestamp: query.start_time + period * i as i32,
                average,
            })
            .collect())
    }
}

#[async_trait]
impl PriceCatalogApi for MockProvider {
    async fn get_products(&self, query: &PriceQuery) -> ProviderResult<Vec<String>> {
        let instance_type = query.filter_value("instanceType");
        self.record_call("get_products", query.filter_value("location"), instance_type);
        self.check_failure(MockApi::Pricing)?;

        let documents = instance_type
            .and_then(|t| self.price_documents.read().get(t).cloned())
            .unwrap_or_default();

        let limit = query.max_results.map(|m| m as usize).unwrap_or(usize::MAX);
        Ok(documents.into_iter().take(limit).collect())
    }
}
