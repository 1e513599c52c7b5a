//! Utilization sampler.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use cloudtrim_provider::{Datapoint, MetricQuery, MetricsApi};

use crate::config::UtilizationConfig;
use crate::error::{CoreError, CoreResult};

/// Arithmetic mean of the datapoint averages; 0 for an empty series.
pub fn mean_utilization(points: &[Datapoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|d| d.average).sum::<f64>() / points.len() as f64
}

/// Reduces a resource's recent CPU utilization to one percentage.
pub struct UtilizationSampler {
    metrics: Arc<dyn MetricsApi>,
    lookback: Duration,
    period_seconds: u32,
}

impl UtilizationSampler {
    pub fn new(metrics: Arc<dyn MetricsApi>, config: &UtilizationConfig) -> Self {
        Self {
            metrics,
            lookback: Duration::days(i64::from(config.lookback_days)),
            period_seconds: config.period_seconds,
        }
    }

    /// Sample utilization over the window ending now.
    pub async fn sample_utilization(&self, resource_id: &str) -> CoreResult<f64> {
        self.sample_at(resource_id, Utc::now()).await
    }

    /// Sample utilization over the window ending at `now`.
    ///
    /// No datapoints yields 0. A telemetry error is returned as
    /// [`CoreError::TelemetryUnavailable`].
    pub async fn sample_at(&self, resource_id: &str, now: DateTime<Utc>) -> CoreResult<f64> {
        let query = MetricQuery::cpu_utilization(resource_id, now - self.lookback, now, self.period_seconds);

        let points = self
            .metrics
            .get_metric_statistics(&query)
            .await
            .map_err(|e| CoreError::TelemetryUnavailable {
                resource_id: resource_id.to_string(),
                message: e.to_string(),
            })?;

        let utilization = mean_utilization(&points);
        debug!(
            "Utilization of {}: {:.2}% over {} datapoints",
            resource_id,
            utilization,
            points.len()
        );
        Ok(utilization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudtrim_provider::{MockApi, MockProvider};

    fn sampler(provider: MockProvider) -> UtilizationSampler {
        UtilizationSampler::new(Arc::new(provider), &UtilizationConfig::default())
    }

    #[tokio::test]
    async fn test_mean_of_daily_averages() {
        let provider = MockProvider::new().with_utilization("i-1", &[10.0, 20.0, 30.0]);

        let pct = sampler(provider).sample_utilization("i-1").await.unwrap();
        assert!((pct - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_datapoints_is_zero() {
        let pct = sampler(MockProvider::new()).sample_utilization("i-idle").await.unwrap();
        assert_eq!(pct, 0.0);
    }

    #[tokio::test]
    async fn test_telemetry_failure_propagates() {
        let provider = MockProvider::new().fail(MockApi::Metrics, "endpoint unreachable");

        let err = sampler(provider).sample_utilization("i-1").await.unwrap_err();
        match err {
            CoreError::TelemetryUnavailable { resource_id, message } => {
                assert_eq!(resource_id, "i-1");
                assert!(message.contains("endpoint unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[derive(Default)]
    struct RecordingMetrics {
        queries: parking_lot::Mutex<Vec<MetricQuery>>,
    }

    #[async_trait::async_trait]
    impl MetricsApi for RecordingMetrics {
        async fn get_metric_statistics(
            &self,
            query: &MetricQuery,
        ) -> cloudtrim_provider::ProviderResult<Vec<Datapoint>> {
            self.queries.lock().push(query.clone());
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_query_window_and_period() {
        let metrics = Arc::new(RecordingMetrics::default());
        let sampler = UtilizationSampler::new(metrics.clone(), &UtilizationConfig::default());
        let now = Utc::now();

        sampler.sample_at("i-1", now).await.unwrap();

        let queries = metrics.queries.lock();
        assert_eq!(queries.len(), 1);
        let query = &queries[0];
        assert_eq!(query.dimension_value, "i-1");
        assert_eq!(query.metric_name, "CPUUtilization");
        assert_eq!(query.statistic, "Average");
        assert_eq!(query.period_seconds, 86_400);
        assert_eq!(query.end_time, now);
        assert_eq!(query.end_time - query.start_time, Duration::days(14));
    }

    #[test]
    fn test_mean_utilization_empty() {
        assert_eq!(mean_utilization(&[]), 0.0);
    }
}
