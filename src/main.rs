//! Lyceum engine entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lyceum::{create_rest_router, Config, QueryCoordinator, RestApiConfig};

/// Lyceum: Query Lifecycle & Feedback Engine
#[derive(Parser, Debug)]
#[command(name = "lyceum")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default behavior)
    Serve {
        /// HTTP port. If not specified, uses the config file value.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = match &args.config {
        Some(path) => Config::from_file(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::CheckConfig => {
            config.validate().context("configuration is invalid")?;
            println!("Configuration OK");
            Ok(())
        }
        Command::Serve { port } => serve(config, port).await,
    }
}

async fn serve(mut config: Config, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.server.http_port = port;
    }

    let rest_config = RestApiConfig {
        enable_cors: config.server.enable_cors,
        ..Default::default()
    };
    let addr = format!("{}:{}", config.server.bind_addr, config.server.http_port);

    let coordinator = Arc::new(QueryCoordinator::new(config));
    let router = create_rest_router(coordinator, &rest_config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Lyceum engine listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
