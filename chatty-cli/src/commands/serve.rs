//! chatty serve command for running the relay server in the foreground

use anyhow::Result;
use chatty_server::{ChattyServer, ServerConfig};
use clap::Args;
use tracing::info;

use crate::config::{ChattyConfig, ConfigLoader};

/// Arguments for the serve command
///
/// Every flag falls back to the merged config file value when omitted.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Seconds between liveness sweeps
    #[arg(long, value_name = "SECS")]
    pub sweep_interval: Option<u64>,

    /// Seconds of silence before a session is evicted
    #[arg(long, value_name = "SECS")]
    pub inactivity_timeout: Option<u64>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let file_config = ConfigLoader::load()?;
    let config = server_config(&args, file_config);

    info!(
        sweep_interval_secs = config.relay.sweep_interval_secs,
        inactivity_timeout_secs = config.relay.inactivity_timeout_secs,
        "Starting chatty server on {}",
        config.addr()
    );

    ChattyServer::new(config).run().await.map_err(Into::into)
}

/// Apply command-line overrides on top of the file config
fn server_config(args: &ServeArgs, file_config: ChattyConfig) -> ServerConfig {
    let mut relay = file_config.relay;
    if let Some(secs) = args.sweep_interval {
        relay.sweep_interval_secs = secs;
    }
    if let Some(secs) = args.inactivity_timeout {
        relay.inactivity_timeout_secs = secs;
    }

    let host = args.host.clone().unwrap_or(file_config.server.host);
    let port = args.port.unwrap_or(file_config.server.port);

    ServerConfig::new(host, port).with_relay(relay)
}
