//! # ECS-SD Client
//!
//! Implementations of the [`EcsApi`](ecs_sd_core::EcsApi) inventory interface:
//!
//! - **AWS**: pass-through to the ECS API via the AWS SDK (feature `aws`)
//! - **Memory**: a fixed inventory for local development and testing
//! - **Cached**: a decorator adding per-operation TTL caching and stale
//!   fallback on top of either
//!
//! ## Example
//!
//! ```rust,ignore
//! use ecs_sd_client::{AwsEcsClient, CachedEcsClient};
//!
//! let client = CachedEcsClient::new(AwsEcsClient::from_env().await)?;
//! let clusters = client.describe_clusters(&["prod".into()]).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

#[cfg(feature = "aws")]
mod aws;
mod cached;
mod memory;

#[cfg(feature = "aws")]
pub use aws::AwsEcsClient;
pub use cached::{default_cache_config, CachedEcsClient};
pub use memory::{ClusterInventory, Inventory, MemoryEcs, ServiceInventory};
