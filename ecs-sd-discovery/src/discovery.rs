//! Aggregation pass over the ECS inventory.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use ecs_sd_core::constants::{LABEL_CLUSTER_NAME, LABEL_SERVICE_NAME, LABEL_TASK_ID};
use ecs_sd_core::error::{EcsSdError, Result};
use ecs_sd_core::traits::EcsApi;
use ecs_sd_core::types::{arn_resource_name, Cluster, TargetGroup};

use crate::labels::{metrics_port, tags_to_labels};

/// Builds Prometheus target groups from the configured ECS clusters.
///
/// Each call to [`Discovery::build_targets`] is an independent pass; caching
/// is the concern of the injected [`EcsApi`] implementation.
#[derive(Clone)]
pub struct Discovery {
    client: Arc<dyn EcsApi>,
    clusters: Vec<String>,
}

impl Discovery {
    /// Creates a discovery over the given cluster names.
    ///
    /// Blank names are dropped; an empty list is a configuration error.
    pub fn new(client: Arc<dyn EcsApi>, clusters: Vec<String>) -> Result<Self> {
        let clusters: Vec<String> = clusters
            .into_iter()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect();

        if clusters.is_empty() {
            return Err(EcsSdError::ConfigError("ecs clusters must not be empty".into()));
        }

        Ok(Self { client, clusters })
    }

    /// Configured cluster names.
    pub fn clusters(&self) -> &[String] {
        &self.clusters
    }

    /// Runs one aggregation pass.
    ///
    /// Fails if no configured cluster resolves, or if any upstream call fails
    /// without a cached fallback.
    #[instrument(skip(self), fields(clusters = ?self.clusters))]
    pub async fn build_targets(&self) -> Result<Vec<TargetGroup>> {
        info!("scraping ECS targets");

        let clusters = self
            .client
            .describe_clusters(&self.clusters)
            .await
            .map_err(|e| EcsSdError::DescribeClusters {
                clusters: self.clusters.clone(),
                source: Box::new(e),
            })?;

        if clusters.is_empty() {
            return Err(EcsSdError::NoValidClusters(self.clusters.clone()));
        }

        let mut groups = Vec::new();
        for cluster in &clusters {
            groups.extend(self.cluster_targets(cluster).await?);
        }

        info!(targets = groups.len(), "scraped ECS targets");
        Ok(groups)
    }

    async fn cluster_targets(&self, cluster: &Cluster) -> Result<Vec<TargetGroup>> {
        info!(cluster = %cluster.name, "listing ECS services");

        let services = self
            .client
            .list_services(&cluster.arn)
            .await
            .map_err(|e| EcsSdError::ListServices {
                cluster: cluster.name.clone(),
                source: Box::new(e),
            })?;

        let per_service = try_join_all(
            services
                .iter()
                .map(|service_arn| self.service_targets(cluster, service_arn)),
        )
        .await?;

        Ok(per_service.into_iter().flatten().collect())
    }

    async fn service_targets(&self, cluster: &Cluster, service_arn: &str) -> Result<Vec<TargetGroup>> {
        let service_name = arn_resource_name(service_arn);
        debug!(cluster = %cluster.name, service = service_name, "listing ECS tasks");

        let tasks = async {
            let arns = self
                .client
                .list_tasks(&cluster.arn, service_name)
                .await
                .map_err(|e| EcsSdError::ListTasks {
                    cluster: cluster.name.clone(),
                    service: service_name.to_owned(),
                    source: Box::new(e),
                })?;

            self.client
                .describe_tasks(&cluster.arn, &arns)
                .await
                .map_err(|e| EcsSdError::DescribeTasks {
                    cluster: cluster.name.clone(),
                    service: service_name.to_owned(),
                    source: Box::new(e),
                })
        };

        let tags = async {
            self.client
                .list_tags_for_resource(service_arn)
                .await
                .map_err(|e| EcsSdError::ListTags {
                    cluster: cluster.name.clone(),
                    service: service_name.to_owned(),
                    source: Box::new(e),
                })
        };

        let (tasks, tags) = futures::try_join!(tasks, tags)?;

        let port = metrics_port(&tags);
        let tag_labels = tags_to_labels(&tags);
        let source = format!("{}/{}", cluster.name, service_name);

        let mut groups = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let Some(ip) = task.scrape_ip() else {
                if task.private_ipv4().is_none() {
                    debug!(cluster = %cluster.name, service = service_name, task = %task.arn, "ECS task has no network interfaces");
                } else {
                    debug!(
                        cluster = %cluster.name,
                        service = service_name,
                        task = %task.arn,
                        health = %task.health_status,
                        "ECS task is unhealthy"
                    );
                }
                continue;
            };

            let group = TargetGroup::new(source.clone(), vec![format!("{}:{}", ip, port)])
                .with_labels(tag_labels.clone())
                .with_labels([
                    (LABEL_CLUSTER_NAME, cluster.name.as_str()),
                    (LABEL_SERVICE_NAME, service_name),
                    (LABEL_TASK_ID, task.id()),
                ]);
            groups.push(group);
        }

        Ok(groups)
    }
}
