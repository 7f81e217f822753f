//! # ECS-SD Discovery
//!
//! Walks the cluster → service → task → tag hierarchy and flattens it into
//! Prometheus target groups.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecs_sd_discovery::Discovery;
//!
//! let discovery = Discovery::new(Arc::new(client), vec!["prod".into()])?;
//! let groups = discovery.build_targets().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod discovery;
pub mod labels;

pub use discovery::Discovery;
