//! Discovery constants.
//!
//! Label names follow the Prometheus `__meta_` convention so they are dropped
//! after relabeling unless a scrape config keeps them explicitly.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// PROMETHEUS LABELS
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix for every label this service emits.
pub const LABEL_ECS_PREFIX: &str = "__meta_ecs_";

/// Prefix for labels derived from service tags.
pub const LABEL_SERVICE_TAG_PREFIX: &str = "__meta_ecs_service_tag_";

/// Label carrying the cluster name.
pub const LABEL_CLUSTER_NAME: &str = "__meta_ecs_cluster_name";

/// Label carrying the service name.
pub const LABEL_SERVICE_NAME: &str = "__meta_ecs_service_name";

/// Label carrying the task id (final segment of the task ARN).
pub const LABEL_TASK_ID: &str = "__meta_ecs_task_id";

// ═══════════════════════════════════════════════════════════════════════════════
// SCRAPE PORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Service tag that overrides the scrape port.
pub const METRICS_PORT_TAG: &str = "metrics_port";

/// Scrape port used when a service has no `metrics_port` tag.
pub const DEFAULT_METRICS_PORT: &str = "80";

// ═══════════════════════════════════════════════════════════════════════════════
// INVENTORY OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// `DescribeClusters` operation name.
pub const OP_DESCRIBE_CLUSTERS: &str = "DescribeClusters";

/// `ListServices` operation name.
pub const OP_LIST_SERVICES: &str = "ListServices";

/// `ListTasks` operation name.
pub const OP_LIST_TASKS: &str = "ListTasks";

/// `DescribeTasks` operation name.
pub const OP_DESCRIBE_TASKS: &str = "DescribeTasks";

/// `ListTagsForResource` operation name.
pub const OP_LIST_TAGS_FOR_RESOURCE: &str = "ListTagsForResource";

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE POLICY
// ═══════════════════════════════════════════════════════════════════════════════
// Rarely changing results live long and fall back to stale data on upstream
// errors. Task descriptions live briefly and are cached per task.

/// TTL for the describe-clusters result.
pub const CLUSTERS_TTL: Duration = Duration::from_secs(60 * 60);

/// TTL for a cluster's service list.
pub const SERVICES_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for a single described task.
pub const TASK_TTL: Duration = Duration::from_secs(60);

/// Default TTL, applied to tag lists.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Interval between background sweeps of expired cache entries.
pub const CACHE_JANITOR_INTERVAL: Duration = Duration::from_secs(30 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════════════════════════════

/// Path of the Prometheus HTTP SD endpoint.
pub const TARGETS_PATH: &str = "/prometheus-targets";

/// Default listen address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:10101";

/// How long in-flight requests may run after a shutdown signal.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(15);

/// Maximum number of task ARNs accepted by a single describe-tasks call.
pub const DESCRIBE_TASKS_BATCH_SIZE: usize = 100;
