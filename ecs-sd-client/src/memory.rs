//! In-memory inventory.
//!
//! Serves a fixed cluster/service/task/tag tree, suitable for local
//! development (loaded from a JSON file) and testing. Every call is counted,
//! and any operation can be made to fail on demand.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ecs_sd_core::constants::{
    OP_DESCRIBE_CLUSTERS, OP_DESCRIBE_TASKS, OP_LIST_SERVICES, OP_LIST_TAGS_FOR_RESOURCE,
    OP_LIST_TASKS,
};
use ecs_sd_core::error::{EcsSdError, Result};
use ecs_sd_core::traits::EcsApi;
use ecs_sd_core::types::{arn_resource_name, Cluster, Tag, Task};

/// A service and everything the aggregator reads about it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceInventory {
    /// Service ARN
    pub arn: String,
    /// Tags attached to the service
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Tasks belonging to the service
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A cluster and its services.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClusterInventory {
    /// Cluster name
    pub name: String,
    /// Cluster ARN
    pub arn: String,
    /// Services running in the cluster
    #[serde(default)]
    pub services: Vec<ServiceInventory>,
}

/// Full inventory tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Inventory {
    /// Known clusters
    #[serde(default)]
    pub clusters: Vec<ClusterInventory>,
}

impl Inventory {
    fn cluster_by_arn(&self, arn: &str) -> Option<&ClusterInventory> {
        self.clusters.iter().find(|c| c.arn == arn || c.name == arn)
    }
}

/// In-memory [`EcsApi`] implementation.
#[derive(Debug, Default)]
pub struct MemoryEcs {
    inventory: RwLock<Inventory>,
    /// Operation → number of calls
    calls: DashMap<&'static str, u64>,
    /// Operation → injected failure reason
    failures: DashMap<&'static str, String>,
    /// ARN lists received by `describe_tasks`, in call order
    describe_requests: Mutex<Vec<Vec<String>>>,
}

impl MemoryEcs {
    /// Creates a client serving the given inventory.
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: RwLock::new(inventory),
            ..Self::default()
        }
    }

    /// Loads an inventory from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let inventory: Inventory = serde_json::from_str(&data)?;
        Ok(Self::new(inventory))
    }

    /// Replaces the served inventory.
    pub fn set_inventory(&self, inventory: Inventory) {
        *self.inventory.write() = inventory;
    }

    /// Makes every subsequent call of `operation` fail.
    pub fn fail(&self, operation: &'static str, reason: impl Into<String>) {
        self.failures.insert(operation, reason.into());
    }

    /// Clears an injected failure.
    pub fn recover(&self, operation: &'static str) {
        self.failures.remove(operation);
    }

    /// Number of calls made to `operation`.
    pub fn calls(&self, operation: &'static str) -> u64 {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    /// ARN lists received by `describe_tasks`.
    pub fn describe_requests(&self) -> Vec<Vec<String>> {
        self.describe_requests.lock().clone()
    }

    fn enter(&self, operation: &'static str) -> Result<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        match self.failures.get(operation) {
            Some(reason) => Err(EcsSdError::upstream(operation, reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EcsApi for MemoryEcs {
    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<Cluster>> {
        self.enter(OP_DESCRIBE_CLUSTERS)?;
        let inventory = self.inventory.read();
        Ok(names
            .iter()
            .filter_map(|name| inventory.cluster_by_arn(name))
            .map(|c| Cluster::new(&c.name, &c.arn))
            .collect())
    }

    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>> {
        self.enter(OP_LIST_SERVICES)?;
        let inventory = self.inventory.read();
        let cluster = inventory.cluster_by_arn(cluster_arn).ok_or_else(|| {
            EcsSdError::upstream(OP_LIST_SERVICES, format!("cluster not found: {}", cluster_arn))
        })?;
        Ok(cluster.services.iter().map(|s| s.arn.clone()).collect())
    }

    async fn list_tasks(&self, cluster_arn: &str, service_name: &str) -> Result<Vec<String>> {
        self.enter(OP_LIST_TASKS)?;
        let inventory = self.inventory.read();
        let cluster = inventory.cluster_by_arn(cluster_arn).ok_or_else(|| {
            EcsSdError::upstream(OP_LIST_TASKS, format!("cluster not found: {}", cluster_arn))
        })?;
        Ok(cluster
            .services
            .iter()
            .filter(|s| s.arn == service_name || arn_resource_name(&s.arn) == service_name)
            .flat_map(|s| s.tasks.iter().map(|t| t.arn.clone()))
            .collect())
    }

    async fn describe_tasks(&self, cluster_arn: &str, task_arns: &[String]) -> Result<Vec<Task>> {
        self.enter(OP_DESCRIBE_TASKS)?;
        self.describe_requests.lock().push(task_arns.to_vec());

        let inventory = self.inventory.read();
        let Some(cluster) = inventory.cluster_by_arn(cluster_arn) else {
            return Ok(Vec::new());
        };
        let tasks: Vec<Task> = task_arns
            .iter()
            .filter_map(|arn| {
                cluster
                    .services
                    .iter()
                    .flat_map(|s| s.tasks.iter())
                    .find(|t| &t.arn == arn)
                    .cloned()
            })
            .collect();

        debug!(cluster = %cluster.name, requested = task_arns.len(), found = tasks.len(), "described tasks");
        Ok(tasks)
    }

    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>> {
        self.enter(OP_LIST_TAGS_FOR_RESOURCE)?;
        let inventory = self.inventory.read();
        Ok(inventory
            .clusters
            .iter()
            .flat_map(|c| c.services.iter())
            .find(|s| s.arn == resource_arn)
            .map(|s| s.tags.clone())
            .unwrap_or_default())
    }
}
