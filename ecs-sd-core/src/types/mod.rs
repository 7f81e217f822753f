//! Domain types for ECS-SD.
//!
//! - [`Cluster`], [`Task`], [`Tag`]: inventory records read from the ECS API
//! - [`TargetGroup`]: the unit published to Prometheus

mod inventory;
mod target;

pub use inventory::*;
pub use target::*;
