//! ECS-SD CLI
//!
//! Serves Prometheus HTTP service discovery targets for the tasks running in
//! a set of ECS clusters.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ecs_sd_api::{shutdown_signal, ApiConfig, ApiServer};
use ecs_sd_client::{AwsEcsClient, CachedEcsClient, MemoryEcs};
use ecs_sd_core::constants::{DEFAULT_HTTP_ADDR, TARGETS_PATH};
use ecs_sd_core::traits::EcsApi;
use ecs_sd_discovery::Discovery;

/// ECS-SD - Prometheus HTTP service discovery for AWS ECS
#[derive(Parser, Debug)]
#[command(name = "ecs-sd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "ECS_SD_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    http_addr: SocketAddr,

    /// Comma-separated ECS cluster names
    #[arg(long, env = "ECS_SD_CLUSTERS", value_delimiter = ',', required = true)]
    clusters: Vec<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "ECS_SD_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "ECS_SD_LOG_JSON")]
    log_json: bool,

    /// Serve a static inventory from a JSON file instead of calling AWS
    #[arg(long, env = "ECS_SD_INVENTORY_FILE")]
    inventory_file: Option<PathBuf>,

    /// Seconds in-flight requests may run after a shutdown signal
    #[arg(long, env = "ECS_SD_SHUTDOWN_GRACE", default_value_t = 15)]
    shutdown_grace: u64,
}

impl Cli {
    fn api_config(&self) -> ApiConfig {
        ApiConfig {
            shutdown_grace_period: Duration::from_secs(self.shutdown_grace),
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.log_json.then(|| fmt::layer().json()))
        .with((!cli.log_json).then(fmt::layer))
        .init();
}

async fn inventory_client(cli: &Cli) -> Result<Arc<dyn EcsApi>> {
    match &cli.inventory_file {
        Some(path) => {
            let ecs = MemoryEcs::from_json_file(path)
                .with_context(|| format!("Failed to load inventory from {}", path.display()))?;
            info!(path = %path.display(), "serving static inventory");
            Ok(Arc::new(ecs))
        }
        None => Ok(Arc::new(AwsEcsClient::from_env().await)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli);

    let client = Arc::new(
        CachedEcsClient::new(inventory_client(&cli).await?).context("Failed to set up the inventory cache")?,
    );
    let discovery = Discovery::new(client.clone(), cli.clusters.clone()).context("Invalid cluster list")?;

    info!(
        addr = %cli.http_addr,
        clusters = ?discovery.clusters(),
        path = TARGETS_PATH,
        "service discovery configured"
    );

    let server = ApiServer::new(discovery, cli.api_config());
    let result = server.run(cli.http_addr, shutdown_signal()).await;

    client.close();
    result.context("Service discovery server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ecs-sd", "--clusters", "prod"]).unwrap();
        assert_eq!(cli.http_addr, DEFAULT_HTTP_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(cli.clusters, vec!["prod".to_string()]);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.log_json);
        assert_eq!(cli.api_config().shutdown_grace_period, Duration::from_secs(15));
    }

    #[test]
    fn test_cluster_list_is_comma_separated() {
        let cli = Cli::try_parse_from(["ecs-sd", "--clusters", "prod,staging", "--shutdown-grace", "3"]).unwrap();
        assert_eq!(cli.clusters, vec!["prod".to_string(), "staging".to_string()]);
        assert_eq!(cli.api_config().shutdown_grace_period, Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_bad_listen_address() {
        assert!(Cli::try_parse_from(["ecs-sd", "--clusters", "prod", "--http-addr", "nope"]).is_err());
    }
}
