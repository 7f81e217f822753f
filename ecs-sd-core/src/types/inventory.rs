//! Inventory records read from the ECS API.
//!
//! Only the fields the aggregator needs are modeled. Every record is rebuilt
//! on each discovery pass and never mutated after it is read.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Returns the path segment after the last `/` of an ARN.
///
/// `arn:aws:ecs:us-east-1:123:service/prod/api` yields `api`. Input without a
/// `/` is returned unchanged.
pub fn arn_resource_name(arn: &str) -> &str {
    match arn.rfind('/') {
        Some(idx) => &arn[idx + 1..],
        None => arn,
    }
}

/// An ECS cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster name
    pub name: String,
    /// Cluster ARN
    pub arn: String,
}

impl Cluster {
    /// Creates a cluster record.
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
        }
    }
}

/// Health of a task as reported by its container health checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// All essential containers report healthy.
    Healthy,
    /// At least one essential container reports unhealthy.
    Unhealthy,
    /// No health check result yet, or no health check defined.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Parses the ECS wire value. Anything unrecognized is `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "HEALTHY" => HealthStatus::Healthy,
            "UNHEALTHY" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("HEALTHY"),
            HealthStatus::Unhealthy => f.write_str("UNHEALTHY"),
            HealthStatus::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// A network interface attached to a container (awsvpc mode).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Private IPv4 address, if one has been assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ipv4: Option<String>,
}

/// A container inside a task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Network interfaces attached to the container
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// A running ECS task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task ARN
    pub arn: String,
    /// Aggregated container health
    #[serde(default)]
    pub health_status: HealthStatus,
    /// Containers of the task
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Task {
    /// Creates a task with no containers.
    pub fn new(arn: impl Into<String>, health_status: HealthStatus) -> Self {
        Self {
            arn: arn.into(),
            health_status,
            containers: Vec::new(),
        }
    }

    /// Adds a container exposing a single interface with the given address.
    pub fn with_private_ip(mut self, ip: impl Into<String>) -> Self {
        self.containers.push(Container {
            network_interfaces: vec![NetworkInterface {
                private_ipv4: Some(ip.into()),
            }],
        });
        self
    }

    /// Task id: the final segment of the ARN.
    pub fn id(&self) -> &str {
        arn_resource_name(&self.arn)
    }

    /// First private IPv4 address found across containers and interfaces.
    pub fn private_ipv4(&self) -> Option<&str> {
        self.containers
            .iter()
            .flat_map(|c| c.network_interfaces.iter())
            .find_map(|ni| ni.private_ipv4.as_deref())
    }

    /// Returns true if the task is healthy.
    pub fn is_healthy(&self) -> bool {
        self.health_status == HealthStatus::Healthy
    }

    /// Returns the scrape address if the task may be published.
    pub fn scrape_ip(&self) -> Option<&str> {
        if self.is_healthy() {
            self.private_ipv4()
        } else {
            None
        }
    }
}

/// A key/value tag attached to an ECS resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Returns the value of the first tag with the given key.
pub fn find_tag<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter().find(|t| t.key == key).map(|t| t.value.as_str())
}
