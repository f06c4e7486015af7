use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use feedbox::config::{Config, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "feedbox", about = "RSS feeds stored as files, served over HTTP")]
struct Args {
    /// Config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory holding the feeds (overrides RSS_FEEDS_PATH and the config file)
    #[arg(long, value_name = "DIR")]
    base_path: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    request_timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = Config::load(&self.config)
            .with_context(|| format!("Failed to load config '{}'", self.config.display()))?;
        config.apply_env();

        if let Some(base_path) = self.base_path {
            config.base_path = base_path;
        }
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    tracing::debug!(?config, "Effective configuration");

    feedbox::server::run_server(&config).await
}
