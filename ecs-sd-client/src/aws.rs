//! AWS SDK backed inventory client.
//!
//! A thin pass-through: it converts SDK shapes into domain types and SDK
//! errors into [`EcsSdError::Upstream`]. Retries and credential resolution
//! are left to the SDK.

use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types as ecs;
use aws_sdk_ecs::Client;
use tracing::{debug, instrument};

use ecs_sd_core::constants::{
    DESCRIBE_TASKS_BATCH_SIZE, OP_DESCRIBE_CLUSTERS, OP_DESCRIBE_TASKS, OP_LIST_SERVICES,
    OP_LIST_TAGS_FOR_RESOURCE, OP_LIST_TASKS,
};
use ecs_sd_core::error::{EcsSdError, Result};
use ecs_sd_core::traits::EcsApi;
use ecs_sd_core::types::{Cluster, Container, HealthStatus, NetworkInterface, Tag, Task};

/// [`EcsApi`] implementation calling the real ECS API.
#[derive(Clone, Debug)]
pub struct AwsEcsClient {
    client: Client,
}

impl AwsEcsClient {
    /// Wraps an existing SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default credential and region chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config))
    }
}

fn upstream<E>(operation: &'static str, err: E) -> EcsSdError
where
    E: std::error::Error + 'static,
{
    EcsSdError::upstream(operation, DisplayErrorContext(err).to_string())
}

fn convert_task(task: &ecs::Task) -> Option<Task> {
    let arn = task.task_arn()?;
    let health_status = task
        .health_status()
        .map(|h| HealthStatus::from_wire(h.as_str()))
        .unwrap_or_default();
    let containers = task
        .containers()
        .iter()
        .map(|c| Container {
            network_interfaces: c
                .network_interfaces()
                .iter()
                .map(|ni| NetworkInterface {
                    private_ipv4: ni.private_ipv4_address().map(str::to_owned),
                })
                .collect(),
        })
        .collect();

    Some(Task {
        arn: arn.to_owned(),
        health_status,
        containers,
    })
}

#[async_trait]
impl EcsApi for AwsEcsClient {
    #[instrument(skip(self))]
    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<Cluster>> {
        let out = self
            .client
            .describe_clusters()
            .set_clusters(Some(names.to_vec()))
            .send()
            .await
            .map_err(|e| upstream(OP_DESCRIBE_CLUSTERS, e))?;

        for failure in out.failures() {
            debug!(arn = ?failure.arn(), reason = ?failure.reason(), "cluster not described");
        }

        Ok(out
            .clusters()
            .iter()
            .filter_map(|c| Some(Cluster::new(c.cluster_name()?, c.cluster_arn()?)))
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next_token = None;

        loop {
            let out = self
                .client
                .list_services()
                .cluster(cluster_arn)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| upstream(OP_LIST_SERVICES, e))?;

            arns.extend(out.service_arns().iter().cloned());
            next_token = out.next_token().map(str::to_owned);
            if next_token.is_none() {
                break;
            }
        }

        Ok(arns)
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, cluster_arn: &str, service_name: &str) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next_token = None;

        loop {
            let out = self
                .client
                .list_tasks()
                .cluster(cluster_arn)
                .service_name(service_name)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| upstream(OP_LIST_TASKS, e))?;

            arns.extend(out.task_arns().iter().cloned());
            next_token = out.next_token().map(str::to_owned);
            if next_token.is_none() {
                break;
            }
        }

        Ok(arns)
    }

    #[instrument(skip(self, task_arns), fields(tasks = task_arns.len()))]
    async fn describe_tasks(&self, cluster_arn: &str, task_arns: &[String]) -> Result<Vec<Task>> {
        let mut tasks = Vec::with_capacity(task_arns.len());

        // The API rejects empty requests and caps each call at 100 ARNs.
        for chunk in task_arns.chunks(DESCRIBE_TASKS_BATCH_SIZE) {
            let out = self
                .client
                .describe_tasks()
                .cluster(cluster_arn)
                .set_tasks(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| upstream(OP_DESCRIBE_TASKS, e))?;

            tasks.extend(out.tasks().iter().filter_map(convert_task));
        }

        Ok(tasks)
    }

    #[instrument(skip(self))]
    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>> {
        let out = self
            .client
            .list_tags_for_resource()
            .resource_arn(resource_arn)
            .send()
            .await
            .map_err(|e| upstream(OP_LIST_TAGS_FOR_RESOURCE, e))?;

        Ok(out
            .tags()
            .iter()
            .filter_map(|t| Some(Tag::new(t.key()?, t.value().unwrap_or_default())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_task() {
        let sdk_task = ecs::Task::builder()
            .task_arn("arn:aws:ecs:us-east-1:123:task/prod/abc")
            .health_status(ecs::HealthStatus::Healthy)
            .containers(
                ecs::Container::builder()
                    .network_interfaces(
                        ecs::NetworkInterface::builder()
                            .private_ipv4_address("10.0.0.5")
                            .build(),
                    )
                    .build(),
            )
            .build();

        let task = convert_task(&sdk_task).unwrap();
        assert_eq!(task.id(), "abc");
        assert_eq!(task.scrape_ip(), Some("10.0.0.5"));
    }

    #[test]
    fn test_convert_task_without_arn() {
        let sdk_task = ecs::Task::builder().build();
        assert!(convert_task(&sdk_task).is_none());
    }

    #[test]
    fn test_convert_task_unknown_health() {
        let sdk_task = ecs::Task::builder()
            .task_arn("arn:aws:ecs:us-east-1:123:task/prod/abc")
            .build();
        let task = convert_task(&sdk_task).unwrap();
        assert_eq!(task.health_status, HealthStatus::Unknown);
        assert!(task.containers.is_empty());
    }
}
