use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use cf_receiver::app::ports::TelemetrySink;
use cf_receiver::app::{subscriptions, ReceiveUseCase};
use cf_receiver::infra::{NdjsonFileSink, TracingSink};
use cf_receiver::{logging, metrics, Config};

#[derive(Parser)]
#[command(name = "cf_receiver")]
#[command(about = "Cloud Foundry RLP gateway telemetry receiver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream telemetry until interrupted
    Run {
        /// Path to the TOML configuration file
        #[arg(long, short)]
        config: PathBuf,
        /// Append received records to this NDJSON file instead of logging them
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and print the derived subscriptions
    CheckConfig {
        #[arg(long, short)]
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load(path).with_context(|| format!("loading {}", path.display()))?;
    config.validate().context("validating configuration")?;
    Ok(config)
}

async fn run(config: Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    let sink: Arc<dyn TelemetrySink> = match output {
        Some(path) => {
            let sink = NdjsonFileSink::open(&path)
                .await
                .with_context(|| format!("opening output file {}", path.display()))?;
            info!(path = %sink.path().display(), "writing telemetry to file");
            Arc::new(sink)
        }
        None => Arc::new(TracingSink),
    };

    let use_case = ReceiveUseCase::from_config(&config, sink)?;
    use_case.start().await?;
    info!(
        endpoint = %config.rlp_gateway.endpoint,
        kinds = ?config.telemetry,
        "receiving telemetry; press Ctrl-C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "waiting for Ctrl-C failed, shutting down");
    }
    info!("shutdown requested");
    use_case.shutdown().await?;
    Ok(())
}

fn check_config(config: &Config) {
    println!("Configuration OK");
    println!("  RLP gateway: {}", config.rlp_gateway.endpoint);
    println!("  UAA:         {} (user {})", config.uaa.endpoint, config.uaa.username);
    for sub in subscriptions(config) {
        let selectors: Vec<&str> = sub.selectors.iter().map(|s| s.query_flag()).collect();
        let selectors = if selectors.is_empty() {
            "(none)".to_string()
        } else {
            selectors.join(", ")
        };
        println!("  {:<8} shard_id={} selectors={}", sub.kind, sub.shard_id, selectors);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output } => {
            let config = load_config(&config)?;
            metrics::init_metrics();
            run(config, output).await?;
        }
        Commands::CheckConfig { config } => {
            let config = load_config(&config)?;
            check_config(&config);
        }
    }
    Ok(())
}
