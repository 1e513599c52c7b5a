//! Inbound analysis boundary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::cache::{cache_key, ResultCache};
use crate::error::CoreResult;
use crate::model::{AnalysisRequest, AnalysisResult};

/// Serves analysis requests, consulting an optional result cache first.
///
/// Cache failures never fail a request: a read error counts as a miss and a
/// write error is logged.
#[derive(Clone)]
pub struct AnalysisService {
    analyzer: Arc<Analyzer>,
    cache: Option<Arc<dyn ResultCache>>,
    cache_scope: String,
    ttl: Duration,
}

impl AnalysisService {
    pub fn new(analyzer: Analyzer) -> Self {
        let ttl = Duration::from_secs(analyzer.config().cache.ttl_seconds);
        Self {
            analyzer: Arc::new(analyzer),
            cache: None,
            cache_scope: String::new(),
            ttl,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Tag cache keys with the inputs behind this service's analyzer, such as
    /// a [`fingerprint`](crate::cache::fingerprint) of its inventory source.
    ///
    /// Services sharing one cache must use distinct scopes unless they
    /// analyze the same inventory with the same configuration.
    pub fn with_cache_scope(mut self, scope: impl Into<String>) -> Self {
        self.cache_scope = scope.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// The cache key this service uses for a request.
    pub fn key_for(&self, request: &AnalysisRequest) -> String {
        cache_key(
            request,
            &self.analyzer.config().default_region,
            &self.cache_scope,
        )
    }

    /// Answer one request.
    pub async fn analyze(&self, request: &AnalysisRequest) -> CoreResult<AnalysisResult> {
        let Some(cache) = &self.cache else {
            return self.analyzer.analyze(request.region.as_deref()).await;
        };

        let key = self.key_for(request);
        match cache.get(&key).await {
            Ok(Some(result)) => {
                info!("Serving cached analysis for {}", result.region);
                return Ok(result);
            }
            Ok(None) => debug!("Cache miss: {}", key),
            Err(e) => warn!("Cache read failed, running analysis: {}", e),
        }

        let result = self.analyzer.analyze(request.region.as_deref()).await?;

        if let Err(e) = cache.set(&key, &result, self.ttl).await {
            warn!("Failed to cache analysis result: {}", e);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("cached", &self.cache.is_some())
            .field("cache_scope", &self.cache_scope)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::AnalyzerConfig;
    use crate::error::CoreError;
    use async_trait::async_trait;
    use cloudtrim_provider::{InstanceDescription, MockApi, MockProvider, ProviderClients};

    fn service(provider: MockProvider) -> AnalysisService {
        let analyzer =
            Analyzer::new(ProviderClients::from_provider(provider), AnalyzerConfig::default()).unwrap();
        AnalysisService::new(analyzer)
    }

    #[test]
    fn test_ttl_from_config() {
        let analyzer = Analyzer::new(
            ProviderClients::from_provider(MockProvider::new()),
            AnalyzerConfig::default().with_cache_ttl(120),
        )
        .unwrap();
        let service = AnalysisService::new(analyzer);
        assert_eq!(service.ttl, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_uncached_runs_every_time() {
        let provider = MockProvider::new();
        let service = service(provider.clone());
        let request = AnalysisRequest::new("audit");

        service.analyze(&request).await.unwrap();
        service.analyze(&request).await.unwrap();
        assert_eq!(provider.get_method_calls("describe_instances").len(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_analysis() {
        let provider = MockProvider::new();
        let cache = Arc::new(MemoryCache::new());
        let service = service(provider.clone()).with_cache(cache.clone());

        let first = service.analyze(&AnalysisRequest::new("audit")).await.unwrap();
        let second = service
            .analyze(&AnalysisRequest::new("audit").with_region("us-east-1"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.get_method_calls("describe_instances").len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_scope_separates_inventories() {
        let cache = Arc::new(MemoryCache::new());
        let busy = MockProvider::new()
            .with_instance(InstanceDescription::new("i-1", "m5.large", "stopped"));
        let empty = MockProvider::new();

        let first = service(busy)
            .with_cache(cache.clone())
            .with_cache_scope("inventory-a");
        let second = service(empty.clone())
            .with_cache(cache.clone())
            .with_cache_scope("inventory-b");

        let request = AnalysisRequest::new("audit");
        assert_eq!(first.analyze(&request).await.unwrap().resources.len(), 1);
        assert!(second.analyze(&request).await.unwrap().resources.is_empty());

        assert_eq!(empty.get_method_calls("describe_instances").len(), 1);
        assert_eq!(cache.len(), 2);
        assert_ne!(first.key_for(&request), second.key_for(&request));
    }

    #[tokio::test]
    async fn test_failed_analysis_is_not_cached() {
        let provider = MockProvider::new().fail(MockApi::Storage, "denied");
        let cache = Arc::new(MemoryCache::new());
        let service = service(provider).with_cache(cache.clone());

        assert!(service.analyze(&AnalysisRequest::new("audit")).await.is_err());
        assert!(cache.is_empty());
    }

    struct BrokenCache;

    #[async_trait]
    impl ResultCache for BrokenCache {
        async fn get(&self, _key: &str) -> CoreResult<Option<AnalysisResult>> {
            Err(CoreError::Cache("disk on fire".to_string()))
        }

        async fn set(&self, _key: &str, _value: &AnalysisResult, _ttl: Duration) -> CoreResult<()> {
            Err(CoreError::Cache("disk on fire".to_string()))
        }

        async fn clear(&self) -> CoreResult<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_cache_errors_do_not_fail_request() {
        let service = service(MockProvider::new()).with_cache(Arc::new(BrokenCache));

        let result = service.analyze(&AnalysisRequest::new("audit")).await.unwrap();
        assert_eq!(result.general_recommendations().count(), 4);
    }
}
