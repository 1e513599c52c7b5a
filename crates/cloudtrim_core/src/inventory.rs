//! Resource inventory collection.
//!
//! Resource kinds are collected one after another. Within a kind, every
//! listing page is consumed before per-resource lookups start. A failure
//! aborts that kind only; the remaining kinds are still attempted so the
//! final error can name every kind that failed.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use cloudtrim_provider::{BucketDescription, ComputeApi, InstanceDescription, StorageApi};

use crate::error::{CoreError, CoreResult, KindFailure};
use crate::model::{LifecycleState, ResourceKind, ResourceRecord};
use crate::pricing::PricingResolver;
use crate::utilization::UtilizationSampler;

/// Subtype label given to object-storage buckets.
pub const OBJECT_STORE_SUBTYPE: &str = "S3";

/// Builds the resource inventory of a region.
pub struct InventoryCollector {
    compute: Arc<dyn ComputeApi>,
    storage: Arc<dyn StorageApi>,
    sampler: UtilizationSampler,
    pricing: Arc<PricingResolver>,
    max_concurrency: usize,
}

impl InventoryCollector {
    pub fn new(
        compute: Arc<dyn ComputeApi>,
        storage: Arc<dyn StorageApi>,
        sampler: UtilizationSampler,
        pricing: Arc<PricingResolver>,
    ) -> Self {
        Self {
            compute,
            storage,
            sampler,
            pricing,
            max_concurrency: 1,
        }
    }

    /// Allow up to `max` per-resource lookups in flight. Output order is
    /// unaffected.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Collect every supported resource kind in a region.
    pub async fn collect(&self, region: &str) -> CoreResult<Vec<ResourceRecord>> {
        info!("Collecting inventory in {}", region);

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for kind in ResourceKind::all() {
            match self.collect_kind(kind, region).await {
                Ok(mut batch) => {
                    debug!("Collected {} {} resources", batch.len(), kind);
                    records.append(&mut batch);
                }
                Err(e) => {
                    warn!("{} collection failed in {}: {}", kind, region, e);
                    failures.push(KindFailure {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(CoreError::Collection(failures));
        }
        Ok(records)
    }

    /// Collect one resource kind.
    pub async fn collect_kind(&self, kind: ResourceKind, region: &str) -> CoreResult<Vec<ResourceRecord>> {
        match kind {
            ResourceKind::ComputeInstance => self.collect_instances(region).await,
            ResourceKind::ObjectStore => self.collect_buckets(region).await,
        }
    }

    async fn collect_instances(&self, region: &str) -> CoreResult<Vec<ResourceRecord>> {
        let instances = self.list_instances(region).await?;

        stream::iter(instances)
            .map(|instance| self.instance_record(instance, region))
            .buffered(self.max_concurrency)
            .try_collect()
            .await
    }

    async fn collect_buckets(&self, region: &str) -> CoreResult<Vec<ResourceRecord>> {
        let buckets = self.list_buckets(region).await?;

        stream::iter(buckets)
            .map(|bucket| self.bucket_record(bucket, region))
            .buffered(self.max_concurrency)
            .try_collect()
            .await
    }

    async fn list_instances(&self, region: &str) -> CoreResult<Vec<InstanceDescription>> {
        let mut instances = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.compute.describe_instances(region, token.as_deref()).await?;
            instances.extend(page.instances);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(instances)
    }

    async fn list_buckets(&self, region: &str) -> CoreResult<Vec<BucketDescription>> {
        let mut buckets = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.storage.list_buckets(region, token.as_deref()).await?;
            buckets.extend(page.buckets);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(buckets)
    }

    async fn instance_record(&self, instance: InstanceDescription, region: &str) -> CoreResult<ResourceRecord> {
        let kind = ResourceKind::ComputeInstance;
        let utilization = self.sampler.sample_utilization(&instance.instance_id).await?;
        let monthly_cost = self
            .pricing
            .monthly_cost(kind, &instance.instance_type, region)
            .await;

        let record = ResourceRecord::new(
            instance.instance_id,
            kind,
            instance.instance_type,
            LifecycleState::from_provider(&instance.state),
            region,
        )
        .with_utilization(utilization)
        .with_monthly_cost(monthly_cost);

        Ok(match instance.availability_zone {
            Some(zone) => record.with_availability_zone(zone),
            None => record,
        })
    }

    async fn bucket_record(&self, bucket: BucketDescription, region: &str) -> CoreResult<ResourceRecord> {
        let kind = ResourceKind::ObjectStore;
        let monthly_cost = self
            .pricing
            .monthly_cost(kind, OBJECT_STORE_SUBTYPE, region)
            .await;

        Ok(ResourceRecord::new(
            bucket.name,
            kind,
            OBJECT_STORE_SUBTYPE,
            LifecycleState::Active,
            region,
        )
        .with_monthly_cost(monthly_cost))
    }
}
