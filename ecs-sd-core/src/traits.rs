//! Common traits for ECS-SD.
//!
//! The aggregator only sees the inventory API through [`EcsApi`], so the
//! caching decorator and the AWS-backed client are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Cluster, Tag, Task};

// ═══════════════════════════════════════════════════════════════════════════════
// INVENTORY API TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the ECS inventory API.
///
/// Implementations return best-effort data or fail; retries and backoff are
/// their own concern.
#[async_trait]
pub trait EcsApi: Send + Sync {
    /// Describes clusters by name. Unknown names are silently omitted.
    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<Cluster>>;

    /// Lists the ARNs of the services running in a cluster.
    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>>;

    /// Lists the ARNs of a service's tasks.
    async fn list_tasks(&self, cluster_arn: &str, service_name: &str) -> Result<Vec<String>>;

    /// Describes tasks by ARN.
    async fn describe_tasks(&self, cluster_arn: &str, task_arns: &[String]) -> Result<Vec<Task>>;

    /// Lists the tags attached to a resource.
    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>>;
}

#[async_trait]
impl<T: EcsApi + ?Sized> EcsApi for Arc<T> {
    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<Cluster>> {
        (**self).describe_clusters(names).await
    }

    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>> {
        (**self).list_services(cluster_arn).await
    }

    async fn list_tasks(&self, cluster_arn: &str, service_name: &str) -> Result<Vec<String>> {
        (**self).list_tasks(cluster_arn, service_name).await
    }

    async fn describe_tasks(&self, cluster_arn: &str, task_arns: &[String]) -> Result<Vec<Task>> {
        (**self).describe_tasks(cluster_arn, task_arns).await
    }

    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>> {
        (**self).list_tags_for_resource(resource_arn).await
    }
}
