//! Caching decorator for the ECS inventory API.
//!
//! Each operation has its own TTL and stale-fallback policy:
//!
//! | Operation | Key | TTL | Stale on error |
//! |---|---|---|---|
//! | describe clusters | fixed | 1 hour | yes |
//! | list services | cluster ARN | 5 minutes | yes |
//! | list tasks | - | not cached | no |
//! | describe tasks | task ARN | 1 minute | no |
//! | list tags | resource ARN | default (15 minutes) | yes |

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use ecs_sd_cache::{CacheConfig, Lookup, TtlCache};
use ecs_sd_core::constants::{
    CACHE_JANITOR_INTERVAL, CLUSTERS_TTL, DEFAULT_CACHE_TTL, OP_DESCRIBE_CLUSTERS,
    OP_LIST_SERVICES, OP_LIST_TAGS_FOR_RESOURCE, SERVICES_TTL, TASK_TTL,
};
use ecs_sd_core::error::Result;
use ecs_sd_core::traits::EcsApi;
use ecs_sd_core::types::{Cluster, Tag, Task};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum CacheKey {
    Clusters,
    Services(String),
    Task(String),
    Tags(String),
}

#[derive(Clone, Debug)]
enum CachedValue {
    Clusters(Vec<Cluster>),
    Services(Vec<String>),
    Task(Task),
    Tags(Vec<Tag>),
}

/// Default cache settings for [`CachedEcsClient`].
pub fn default_cache_config() -> CacheConfig {
    CacheConfig::default()
        .with_default_ttl(DEFAULT_CACHE_TTL)
        .with_janitor(CACHE_JANITOR_INTERVAL)
        .with_stale_reads()
}

/// [`EcsApi`] decorator that serves repeated lookups from a TTL cache and
/// falls back to stale data when the upstream call fails.
pub struct CachedEcsClient<C> {
    inner: C,
    cache: TtlCache<CacheKey, CachedValue>,
}

impl<C: EcsApi> CachedEcsClient<C> {
    /// Wraps `inner` with the default cache settings.
    ///
    /// Must be called within a tokio runtime (the cache janitor is spawned).
    pub fn new(inner: C) -> Result<Self> {
        Self::with_cache_config(inner, default_cache_config())
    }

    /// Wraps `inner` with custom cache settings.
    pub fn with_cache_config(inner: C, config: CacheConfig) -> Result<Self> {
        Ok(Self {
            inner,
            cache: TtlCache::with_config(config)?,
        })
    }

    /// Returns the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Stops the cache janitor and drops all cached responses.
    pub fn close(&self) {
        self.cache.close();
    }

    /// Serves `key` from the cache, or calls upstream and caches the result.
    ///
    /// On upstream failure a stale entry is returned instead of the error.
    /// `ttl` of `None` uses the cache's default TTL.
    async fn fetch_with_fallback<T, F, Fut>(
        &self,
        operation: &'static str,
        key: CacheKey,
        ttl: Option<Duration>,
        unwrap: fn(CachedValue) -> Option<T>,
        wrap: fn(T) -> CachedValue,
        fetch: F,
    ) -> Result<T>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let stale = match self.cache.get(&key) {
            Lookup::Fresh(value) => {
                if let Some(v) = unwrap(value) {
                    debug!(operation, key = ?key, "ECS cache hit");
                    return Ok(v);
                }
                None
            }
            Lookup::Stale(value) => unwrap(value),
            Lookup::Absent => None,
        };

        match fetch().await {
            Ok(value) => {
                let cached = wrap(value.clone());
                match ttl {
                    Some(ttl) => self.cache.set(key, cached, ttl),
                    None => self.cache.set_default(key, cached),
                }
                Ok(value)
            }
            Err(err) => match stale {
                Some(value) => {
                    warn!(operation, key = ?key, error = %err, "ECS call failed, stale cache response used");
                    Ok(value)
                }
                None => Err(err),
            },
        }
    }
}

#[async_trait]
impl<C: EcsApi> EcsApi for CachedEcsClient<C> {
    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<Cluster>> {
        self.fetch_with_fallback(
            OP_DESCRIBE_CLUSTERS,
            CacheKey::Clusters,
            Some(CLUSTERS_TTL),
            |v| match v {
                CachedValue::Clusters(c) => Some(c),
                _ => None,
            },
            CachedValue::Clusters,
            || self.inner.describe_clusters(names),
        )
        .await
    }

    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>> {
        self.fetch_with_fallback(
            OP_LIST_SERVICES,
            CacheKey::Services(cluster_arn.to_owned()),
            Some(SERVICES_TTL),
            |v| match v {
                CachedValue::Services(s) => Some(s),
                _ => None,
            },
            CachedValue::Services,
            || self.inner.list_services(cluster_arn),
        )
        .await
    }

    async fn list_tasks(&self, cluster_arn: &str, service_name: &str) -> Result<Vec<String>> {
        self.inner.list_tasks(cluster_arn, service_name).await
    }

    async fn describe_tasks(&self, cluster_arn: &str, task_arns: &[String]) -> Result<Vec<Task>> {
        let mut cached = Vec::new();
        let mut uncached = Vec::new();

        for arn in task_arns {
            match self.cache.get(&CacheKey::Task(arn.clone())).fresh() {
                Some(CachedValue::Task(task)) => {
                    debug!(cluster = cluster_arn, task = %arn, "ECS DescribeTasks cache hit");
                    cached.push(task);
                }
                _ => uncached.push(arn.clone()),
            }
        }

        if uncached.is_empty() {
            return Ok(cached);
        }

        let mut tasks = self.inner.describe_tasks(cluster_arn, &uncached).await?;
        for task in &tasks {
            self.cache
                .set(CacheKey::Task(task.arn.clone()), CachedValue::Task(task.clone()), TASK_TTL);
        }

        tasks.extend(cached);
        Ok(tasks)
    }

    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>> {
        self.fetch_with_fallback(
            OP_LIST_TAGS_FOR_RESOURCE,
            CacheKey::Tags(resource_arn.to_owned()),
            None,
            |v| match v {
                CachedValue::Tags(t) => Some(t),
                _ => None,
            },
            CachedValue::Tags,
            || self.inner.list_tags_for_resource(resource_arn),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ClusterInventory, Inventory, MemoryEcs, ServiceInventory};
    use ecs_sd_core::constants::{OP_DESCRIBE_TASKS, OP_LIST_TASKS};
    use ecs_sd_core::types::HealthStatus;

    const CLUSTER_ARN: &str = "arn:aws:ecs:us-east-1:123:cluster/prod";
    const SERVICE_ARN: &str = "arn:aws:ecs:us-east-1:123:service/prod/api";

    fn task_arn(id: &str) -> String {
        format!("arn:aws:ecs:us-east-1:123:task/prod/{}", id)
    }

    fn inventory() -> Inventory {
        Inventory {
            clusters: vec![ClusterInventory {
                name: "prod".into(),
                arn: CLUSTER_ARN.into(),
                services: vec![ServiceInventory {
                    arn: SERVICE_ARN.into(),
                    tags: vec![Tag::new("team", "core")],
                    tasks: ["a", "b", "c"]
                        .iter()
                        .map(|id| Task::new(task_arn(id), HealthStatus::Healthy).with_private_ip("10.0.0.1"))
                        .collect(),
                }],
            }],
        }
    }

    // No janitor: a sweep while the clock jumps forward would evict the
    // expired entries the stale-fallback tests rely on.
    fn client() -> CachedEcsClient<MemoryEcs> {
        let config = CacheConfig::default()
            .with_default_ttl(DEFAULT_CACHE_TTL)
            .with_stale_reads();
        CachedEcsClient::with_cache_config(MemoryEcs::new(inventory()), config).unwrap()
    }

    fn names() -> Vec<String> {
        vec!["prod".to_string()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_clusters_cached_for_an_hour() {
        let client = client();

        client.describe_clusters(&names()).await.unwrap();
        client.describe_clusters(&names()).await.unwrap();
        assert_eq!(client.inner().calls(OP_DESCRIBE_CLUSTERS), 1);

        tokio::time::advance(CLUSTERS_TTL + Duration::from_secs(1)).await;
        client.describe_clusters(&names()).await.unwrap();
        assert_eq!(client.inner().calls(OP_DESCRIBE_CLUSTERS), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_clusters_stale_fallback() {
        let client = client();
        let fresh = client.describe_clusters(&names()).await.unwrap();

        tokio::time::advance(CLUSTERS_TTL + Duration::from_secs(1)).await;
        client.inner().fail(OP_DESCRIBE_CLUSTERS, "throttled");

        let stale = client.describe_clusters(&names()).await.unwrap();
        assert_eq!(stale, fresh);
        assert_eq!(client.inner().calls(OP_DESCRIBE_CLUSTERS), 2);
    }

    #[tokio::test]
    async fn test_describe_clusters_error_without_cache_propagates() {
        let client = client();
        client.inner().fail(OP_DESCRIBE_CLUSTERS, "throttled");
        assert!(client.describe_clusters(&names()).await.is_err());

        // A failed call must not poison the cache.
        client.inner().recover(OP_DESCRIBE_CLUSTERS);
        assert_eq!(client.describe_clusters(&names()).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_services_ttl_and_stale_fallback() {
        let client = client();
        let fresh = client.list_services(CLUSTER_ARN).await.unwrap();

        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        client.list_services(CLUSTER_ARN).await.unwrap();
        assert_eq!(client.inner().calls(OP_LIST_SERVICES), 1);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        client.inner().fail(OP_LIST_SERVICES, "unavailable");
        assert_eq!(client.list_services(CLUSTER_ARN).await.unwrap(), fresh);
        assert_eq!(client.inner().calls(OP_LIST_SERVICES), 2);
    }

    #[tokio::test]
    async fn test_list_services_error_without_cache_propagates() {
        let client = client();
        client.inner().fail(OP_LIST_SERVICES, "unavailable");
        assert!(client.list_services(CLUSTER_ARN).await.is_err());
    }

    #[tokio::test]
    async fn test_list_tasks_never_cached() {
        let client = client();
        client.list_tasks(CLUSTER_ARN, "api").await.unwrap();
        client.list_tasks(CLUSTER_ARN, "api").await.unwrap();
        assert_eq!(client.inner().calls(OP_LIST_TASKS), 2);

        client.inner().fail(OP_LIST_TASKS, "boom");
        assert!(client.list_tasks(CLUSTER_ARN, "api").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_tags_uses_default_ttl_and_stale_fallback() {
        let client = client();
        let fresh = client.list_tags_for_resource(SERVICE_ARN).await.unwrap();

        tokio::time::advance(DEFAULT_CACHE_TTL - Duration::from_secs(1)).await;
        client.list_tags_for_resource(SERVICE_ARN).await.unwrap();
        assert_eq!(client.inner().calls(OP_LIST_TAGS_FOR_RESOURCE), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        client.inner().fail(OP_LIST_TAGS_FOR_RESOURCE, "denied");
        assert_eq!(client.list_tags_for_resource(SERVICE_ARN).await.unwrap(), fresh);
        assert_eq!(client.inner().calls(OP_LIST_TAGS_FOR_RESOURCE), 2);
    }

    #[tokio::test]
    async fn test_list_tags_error_without_cache_propagates() {
        let client = client();
        client.inner().fail(OP_LIST_TAGS_FOR_RESOURCE, "denied");
        assert!(client.list_tags_for_resource(SERVICE_ARN).await.is_err());
    }

    #[tokio::test]
    async fn test_describe_tasks_partial_hit() {
        let client = client();

        let first = client.describe_tasks(CLUSTER_ARN, &[task_arn("a")]).await.unwrap();
        assert_eq!(first.len(), 1);

        let all = vec![task_arn("a"), task_arn("b"), task_arn("c")];
        let tasks = client.describe_tasks(CLUSTER_ARN, &all).await.unwrap();

        let mut ids: Vec<&str> = tasks.iter().map(|t| t.id()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // Only the uncached subset went upstream.
        let requests = client.inner().describe_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], vec![task_arn("b"), task_arn("c")]);

        // Freshly fetched tasks are now cached individually.
        let again = client.describe_tasks(CLUSTER_ARN, &all).await.unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(client.inner().calls(OP_DESCRIBE_TASKS), 2);
    }

    #[tokio::test]
    async fn test_describe_tasks_fresh_before_cached() {
        let client = client();
        client.describe_tasks(CLUSTER_ARN, &[task_arn("a")]).await.unwrap();

        let tasks = client
            .describe_tasks(CLUSTER_ARN, &[task_arn("a"), task_arn("b")])
            .await
            .unwrap();
        assert_eq!(tasks[0].id(), "b");
        assert_eq!(tasks[1].id(), "a");
    }

    #[tokio::test]
    async fn test_describe_tasks_empty_request_skips_upstream() {
        let client = client();
        assert!(client.describe_tasks(CLUSTER_ARN, &[]).await.unwrap().is_empty());
        assert_eq!(client.inner().calls(OP_DESCRIBE_TASKS), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_tasks_expired_entries_refetched() {
        let client = client();
        client.describe_tasks(CLUSTER_ARN, &[task_arn("a")]).await.unwrap();

        tokio::time::advance(TASK_TTL + Duration::from_secs(1)).await;
        client.describe_tasks(CLUSTER_ARN, &[task_arn("a")]).await.unwrap();
        assert_eq!(client.inner().calls(OP_DESCRIBE_TASKS), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_tasks_has_no_stale_fallback() {
        let client = client();
        client.describe_tasks(CLUSTER_ARN, &[task_arn("a")]).await.unwrap();

        tokio::time::advance(TASK_TTL + Duration::from_secs(1)).await;
        client.inner().fail(OP_DESCRIBE_TASKS, "boom");
        assert!(client.describe_tasks(CLUSTER_ARN, &[task_arn("a")]).await.is_err());
    }

    #[tokio::test]
    async fn test_default_config_caches() {
        let client = CachedEcsClient::new(MemoryEcs::new(inventory())).unwrap();
        client.list_services(CLUSTER_ARN).await.unwrap();
        client.list_services(CLUSTER_ARN).await.unwrap();
        assert_eq!(client.inner().calls(OP_LIST_SERVICES), 1);
    }

    #[test]
    fn test_default_config_requires_runtime() {
        assert!(CachedEcsClient::new(MemoryEcs::new(inventory())).is_err());
    }

    #[tokio::test]
    async fn test_close_drops_cached_responses() {
        let client = client();
        client.list_services(CLUSTER_ARN).await.unwrap();
        client.close();
        client.list_services(CLUSTER_ARN).await.unwrap();
        assert_eq!(client.inner().calls(OP_LIST_SERVICES), 2);
    }
}
