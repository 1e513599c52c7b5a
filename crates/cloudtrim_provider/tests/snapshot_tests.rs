//! Integration tests for snapshot loading and provider bundling.

use std::fs;

use chrono::{Duration, Utc};
use cloudtrim_provider::{
    ComputeApi, MetricQuery, MetricsApi, MockProvider, PriceCatalogApi, PriceQuery,
    ProviderClients, ProviderError, SnapshotProvider, StorageApi,
};
use tempfile::tempdir;

const SNAPSHOT_YAML: &str = r#"
page_size: 1
instances:
  - instance_id: i-0aaa
    instance_type: m5.large
    state: running
    region: us-east-1
    availability_zone: us-east-1a
    cpu_daily_averages: [4.0, 6.0]
  - instance_id: i-0bbb
    instance_type: t3.small
    state: stopped
    region: us-east-1
buckets:
  - name: app-logs
    region: us-east-1
  - name: eu-archive
    region: eu-west-1
prices:
  - instance_type: m5.large
    location: US East (N. Virginia)
    usd_per_hour: 0.096
"#;

#[tokio::test]
async fn test_load_yaml_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.yaml");
    fs::write(&path, SNAPSHOT_YAML).unwrap();

    let provider = SnapshotProvider::load(&path).unwrap();
    assert_eq!(provider.snapshot().instances.len(), 2);

    let first = provider.describe_instances("us-east-1", None).await.unwrap();
    assert_eq!(first.instances.len(), 1);
    assert_eq!(first.instances[0].availability_zone.as_deref(), Some("us-east-1a"));
    assert!(first.next_token.is_some());

    let buckets = provider.list_buckets("us-east-1", None).await.unwrap();
    assert_eq!(buckets.buckets.len(), 1);
    assert_eq!(buckets.buckets[0].name, "app-logs");
}

#[tokio::test]
async fn test_load_json_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    fs::write(
        &path,
        r#"{"instances":[{"instance_id":"i-1","instance_type":"t2.micro","state":"running"}]}"#,
    )
    .unwrap();

    let provider = SnapshotProvider::load(&path).unwrap();
    let page = provider.describe_instances("ap-south-1", None).await.unwrap();
    assert_eq!(page.instances.len(), 1);
    assert!(page.next_token.is_none());
}

#[test]
fn test_load_rejects_unknown_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.txt");
    fs::write(&path, "instances: []").unwrap();

    let result = SnapshotProvider::load(&path);
    assert!(matches!(result, Err(ProviderError::InvalidSnapshot(_))));
}

#[test]
fn test_load_missing_file() {
    let result = SnapshotProvider::load("/nonexistent/inventory.yaml");
    assert!(matches!(result, Err(ProviderError::Io(_))));
}

#[tokio::test]
async fn test_provider_clients_share_one_provider() {
    let mock = MockProvider::new().with_utilization("i-1", &[12.0]);
    let clients = ProviderClients::from_provider(mock.clone());

    let now = Utc::now();
    let query = MetricQuery::cpu_utilization("i-1", now - Duration::days(14), now, 86400);
    let points = clients.metrics.get_metric_statistics(&query).await.unwrap();
    assert_eq!(points.len(), 1);

    clients
        .pricing
        .get_products(&PriceQuery::new("AmazonEC2").term_match("instanceType", "t3.small"))
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_provider_clients_price_catalog_override() {
    let inventory = MockProvider::new();
    let catalog = MockProvider::new().with_hourly_price("m5.large", 0.096);
    let clients = ProviderClients::from_provider(inventory.clone())
        .with_price_catalog(std::sync::Arc::new(catalog.clone()));

    let query = PriceQuery::new("AmazonEC2").term_match("instanceType", "m5.large");
    let docs = clients.pricing.get_products(&query).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert!(!inventory.was_called("get_products"));
    assert!(catalog.was_called("get_products"));
}
