//! Prometheus HTTP SD target groups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A group of scrape targets sharing a label set.
///
/// # JSON Format
/// ```text
/// { "source": "cluster/service", "labels": { ... }, "targets": ["10.0.0.5:80"] }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    /// Origin of the group, `"<cluster>/<service>"`
    pub source: String,
    /// Labels attached to every target in the group
    pub labels: BTreeMap<String, String>,
    /// `host:port` addresses
    pub targets: Vec<String>,
}

impl TargetGroup {
    /// Creates a group with no labels.
    pub fn new(source: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            source: source.into(),
            labels: BTreeMap::new(),
            targets,
        }
    }

    /// Merges labels into the group. Incoming labels win on collision.
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}
