use crate::cli::{Args, Command};
use anyhow::Context;
use clap::Parser;
use ssp::backend::files::FilesBackendConfig;
use ssp::backend::virtual_sensor::VirtualSensorsConfig;
use ssp::backend::RegistryConfig;
use ssp::cache::CacheConfig;
use ssp::web::ServerConfig;
use ssp::{CacheKind, Gateway, GatewayConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;

const DEFAULT_LOG_FILTER: &str = "info,ssp=debug";

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let matches = Args::parse();
    match matches.command {
        Command::Serve {
            bind,
            cors,
            grace_period_secs,
            accessor_timeout_secs,
            files_directory,
            files_graph_prefix,
            virtual_sensor_period_secs,
            dummy_cache,
        } => {
            let config = GatewayConfig {
                cache: CacheConfig {
                    grace_period: Duration::from_secs(grace_period_secs),
                },
                cache_kind: if dummy_cache {
                    CacheKind::Dummy
                } else {
                    CacheKind::Memory
                },
                registry: RegistryConfig {
                    accessor_timeout: Duration::from_secs(accessor_timeout_secs),
                },
                ..GatewayConfig::default()
            };
            let mut gateway = Gateway::start(config)
                .await
                .context("Could not start the gateway")?;

            if let Some(directory) = files_directory {
                let mut files = FilesBackendConfig::new(directory);
                if let Some(prefix) = files_graph_prefix {
                    files.graph_name_prefix = prefix;
                }
                gateway.start_files_backend(files).await;
            }
            gateway
                .start_virtual_sensors(VirtualSensorsConfig {
                    observation_period: Duration::from_secs(virtual_sensor_period_secs),
                })
                .await
                .context("Could not start the virtual sensors")?;

            gateway.serve(ServerConfig { bind, cors }).await
        }
    }
}
