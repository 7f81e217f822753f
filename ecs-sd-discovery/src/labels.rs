//! Tag → label derivation.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use ecs_sd_core::constants::{DEFAULT_METRICS_PORT, LABEL_SERVICE_TAG_PREFIX, METRICS_PORT_TAG};
use ecs_sd_core::types::{find_tag, Tag};

static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-zA-Z0-9_]").expect("invalid label character pattern"));

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new("([a-z])([A-Z])").expect("invalid camel case pattern"));

/// Converts a tag key into a Prometheus label name.
///
/// Invalid characters become `_`, camelCase boundaries are split with `_`,
/// and the result is lowercased and prefixed.
pub fn label_name(prefix: &str, key: &str) -> String {
    let key = INVALID_CHARS.replace_all(key, "_");
    let key = CAMEL_BOUNDARY.replace_all(&key, "${1}_${2}");
    format!("{}{}", prefix, key.to_lowercase())
}

/// Builds service tag labels. Values are kept unchanged.
pub fn tags_to_labels(tags: &[Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (label_name(LABEL_SERVICE_TAG_PREFIX, &t.key), t.value.clone()))
        .collect()
}

/// Scrape port from the `metrics_port` tag, or the default.
pub fn metrics_port(tags: &[Tag]) -> &str {
    match find_tag(tags, METRICS_PORT_TAG) {
        Some(port) if !port.is_empty() => port,
        _ => DEFAULT_METRICS_PORT,
    }
}
