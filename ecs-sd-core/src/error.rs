//! Error types for ECS-SD.
//!
//! This module provides the error hierarchy using `thiserror`. Errors raised
//! while walking the inventory are wrapped with the cluster and service being
//! processed, so a single log line locates the failure.

use thiserror::Error;

/// Result type alias using `EcsSdError`.
pub type Result<T> = std::result::Result<T, EcsSdError>;

/// Main error type for all ECS-SD operations.
#[derive(Debug, Error)]
pub enum EcsSdError {
    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An inventory API call failed.
    #[error("ECS {operation} failed: {reason}")]
    Upstream {
        /// Name of the inventory operation, e.g. `DescribeClusters`.
        operation: &'static str,
        /// Error reported by the collaborator.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // AGGREGATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Describing the configured clusters failed.
    #[error("describe clusters failed: clusters={clusters:?}: {source}")]
    DescribeClusters {
        /// Configured cluster names
        clusters: Vec<String>,
        /// Underlying inventory error
        #[source]
        source: Box<EcsSdError>,
    },

    /// None of the configured cluster names resolved to a cluster.
    #[error("no valid clusters found: clusters={0:?}")]
    NoValidClusters(Vec<String>),

    /// Listing a cluster's services failed.
    #[error("listing ECS services failed: cluster={cluster}: {source}")]
    ListServices {
        /// Cluster being listed
        cluster: String,
        /// Underlying inventory error
        #[source]
        source: Box<EcsSdError>,
    },

    /// Listing a service's tasks failed.
    #[error("listing ECS tasks failed: cluster={cluster}, service={service}: {source}")]
    ListTasks {
        /// Cluster the service belongs to
        cluster: String,
        /// Service being processed
        service: String,
        /// Underlying inventory error
        #[source]
        source: Box<EcsSdError>,
    },

    /// Describing a service's tasks failed.
    #[error("describing tasks failed: cluster={cluster}, service={service}: {source}")]
    DescribeTasks {
        /// Cluster the service belongs to
        cluster: String,
        /// Service being processed
        service: String,
        /// Underlying inventory error
        #[source]
        source: Box<EcsSdError>,
    },

    /// Listing a service's tags failed.
    #[error("listing ECS tags failed: cluster={cluster}, service={service}: {source}")]
    ListTags {
        /// Cluster the service belongs to
        cluster: String,
        /// Service being processed
        service: String,
        /// Underlying inventory error
        #[source]
        source: Box<EcsSdError>,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // SERVER LIFECYCLE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The HTTP listener could not be started or failed while serving.
    #[error("service start failed: {0}")]
    ServerStart(#[source] std::io::Error),

    /// In-flight requests did not finish within the grace period.
    #[error("service shutdown timeout after {seconds}s")]
    ShutdownTimeout {
        /// Grace period that elapsed
        seconds: u64,
    },

    /// The server failed while draining connections after a shutdown signal.
    #[error("service forced to shutdown: {0}")]
    ShutdownFailed(#[source] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION / IO ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EcsSdError {
    /// Creates an upstream error for the given operation.
    pub fn upstream(operation: &'static str, reason: impl Into<String>) -> Self {
        EcsSdError::Upstream {
            operation,
            reason: reason.into(),
        }
    }

    /// Returns true if this error came from the inventory API and a later
    /// pass may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EcsSdError::Upstream { .. } => true,
            EcsSdError::DescribeClusters { source, .. }
            | EcsSdError::ListServices { source, .. }
            | EcsSdError::ListTasks { source, .. }
            | EcsSdError::DescribeTasks { source, .. }
            | EcsSdError::ListTags { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, EcsSdError::ConfigError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = EcsSdError::ListTasks {
            cluster: "prod".into(),
            service: "api".into(),
            source: Box::new(EcsSdError::upstream("ListTasks", "throttled")),
        };
        let msg = err.to_string();
        assert!(msg.contains("cluster=prod"));
        assert!(msg.contains("service=api"));
        assert!(msg.contains("throttled"));
    }

    #[test]
    fn test_error_classification() {
        assert!(EcsSdError::upstream("ListTasks", "boom").is_recoverable());
        assert!(EcsSdError::ListServices {
            cluster: "prod".into(),
            source: Box::new(EcsSdError::upstream("ListServices", "boom")),
        }
        .is_recoverable());
        assert!(!EcsSdError::NoValidClusters(vec!["prod".into()]).is_recoverable());
        assert!(!EcsSdError::ShutdownTimeout { seconds: 15 }.is_recoverable());

        assert!(EcsSdError::ConfigError("empty".into()).is_config_error());
        assert!(!EcsSdError::upstream("ListTasks", "boom").is_config_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let result: Result<serde_json::Value> = json_result.map_err(EcsSdError::from);
        assert!(matches!(result, Err(EcsSdError::JsonError(_))));
    }
}
