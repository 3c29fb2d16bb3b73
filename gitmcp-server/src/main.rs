//! gitmcp - MCP server for GitHub issues and pull requests
//!
//! Every tool call is authenticated with a bearer token and checked against
//! the caller's roles before it reaches GitHub.

use anyhow::{Context, Result};
use clap::Parser;
use gitmcp_core::{init_logging, AppConfig, LogFormat, TransportKind};
use gitmcp_server::GitMcpServer;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// MCP server exposing permission gated GitHub tools
#[derive(Parser, Debug)]
#[command(name = "gitmcp")]
#[command(about = "MCP server exposing permission gated GitHub tools")]
#[command(version)]
struct Args {
    /// Transport to serve (stdio, http)
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Host to bind the HTTP transport to
    #[arg(long)]
    host: Option<String>,

    /// Port for the HTTP transport
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file, used instead of the environment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (json, pretty, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AppConfig::from_env().context("reading environment configuration")?,
        };

        if let Some(transport) = self.transport {
            config.server.transport = transport;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = args.load_config()?;
    config.validate().context("invalid configuration")?;

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?;

    info!(
        transport = %config.server.transport,
        version = env!("CARGO_PKG_VERSION"),
        "Starting gitmcp"
    );
    if config.server.transport == TransportKind::Http && config.server.auth_token.is_some() {
        warn!("MCP_AUTH_TOKEN is ignored by the HTTP transport");
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal.cancel();
        }
    });

    let server = GitMcpServer::new(config).context("failed to build server")?;
    server.run(shutdown).await.context("server failed")?;

    info!("Server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["gitmcp"]);
        assert!(args.transport.is_none());
        assert!(args.port.is_none());

        let args = Args::parse_from([
            "gitmcp",
            "--transport",
            "http",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--log-format",
            "json",
        ]);
        assert_eq!(args.transport, Some(TransportKind::Http));
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitmcp.toml");
        std::fs::write(&path, "[server]\nport = 7000\n").unwrap();

        let args = Args::parse_from([
            "gitmcp",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "7100",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.server.port, 7100);
        assert_eq!(config.server.transport, TransportKind::Stdio);
    }
}
