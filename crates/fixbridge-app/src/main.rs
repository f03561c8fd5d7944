//! fixbridge - order dispatch and execution-report reconciliation pipeline.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Order dispatch and execution-report reconciliation pipeline
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FIXBRIDGE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the API listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fixbridge_telemetry::init_logging()?;

    info!("Starting fixbridge v{}", env!("CARGO_PKG_VERSION"));

    let mut config = fixbridge_app::AppConfig::load(args.config)?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    info!(
        port = config.api.port,
        dispatch_policy = ?config.dispatch.policy,
        "Configuration loaded"
    );

    fixbridge_app::Application::new(config).run().await?;

    Ok(())
}
