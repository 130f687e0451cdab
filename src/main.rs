use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use osmnotes_gateway::config::Config;
use osmnotes_gateway::orchestrator::Orchestrator;
use osmnotes_gateway::transport::serial::SerialTransport;
use osmnotes_gateway::{init_logger, log_info};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "osmnotes-gateway")]
#[command(about = "LoRa mesh to OpenStreetMap Notes store-and-forward gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the gateway until a termination signal is received.
    Run,
    /// Opens the configured serial port and reports whether a radio answers.
    ProbeRadio {
        #[arg(long)]
        port: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run => {
            let config = Config::from_env().context("loading configuration from the environment")?;
            log_info(&format!(
                "starting gateway (serial={}, dry_run={})",
                config.serial_port, config.dry_run
            ));
            let transport = Arc::new(SerialTransport::new(config.serial_port.clone()));
            let orchestrator = Orchestrator::new(config, transport)
                .await
                .context("initializing the gateway")?;
            orchestrator.run().await.context("running the gateway")?;
            Ok(())
        }
        Commands::ProbeRadio { port } => {
            let config = Config::from_env().context("loading configuration from the environment")?;
            let port = port.unwrap_or(config.serial_port);
            probe_radio(&port).await
        }
    }
}

async fn probe_radio(port: &str) -> Result<()> {
    use osmnotes_gateway::transport::TransportAdapter;

    let transport = SerialTransport::new(port.to_string());
    transport
        .start()
        .await
        .with_context(|| format!("opening serial port {port}"))?;
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    if transport.is_connected() {
        log_info(&format!("{port}: radio responding"));
    } else {
        log_info(&format!("{port}: no radio detected"));
    }
    transport.stop().await.context("closing serial port")?;
    Ok(())
}
