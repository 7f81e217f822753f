//! # ECS-SD Core
//!
//! Core types, errors, and traits for Prometheus service discovery on AWS ECS.
//!
//! This crate provides the foundational building blocks used by all other ECS-SD crates:
//!
//! - **Types**: Inventory records (clusters, tasks, tags) and the published target groups
//! - **Errors**: A single error hierarchy carrying cluster/service context
//! - **Constants**: Label names and per-operation cache policy
//! - **Traits**: The [`EcsApi`] capability consumed by the aggregator
//!
//! ## Example
//!
//! ```rust
//! use ecs_sd_core::TargetGroup;
//!
//! let group = TargetGroup::new("prod/api", vec!["10.0.0.5:80".into()]);
//! let json = serde_json::to_string(&group).unwrap();
//! assert!(json.contains("\"source\":\"prod/api\""));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{EcsSdError, Result};
pub use traits::*;
pub use types::*;
