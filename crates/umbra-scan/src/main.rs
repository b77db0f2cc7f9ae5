//! CLI entry point for the umbra-scan agent.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use umbra_core::types::SubnetPrefix;
use umbra_store::HistoryStore;

use umbra_scan::alert::{AlertSink, NullAlerter, WebhookAlerter};
use umbra_scan::config::AgentConfig;
use umbra_scan::pipeline::SweepPipeline;
use umbra_scan::probe::NetProber;
use umbra_scan::scheduler::SweepScheduler;

#[derive(Parser)]
#[command(name = "umbra-scan")]
#[command(about = "Network asset discovery and vulnerability audit agent")]
struct Cli {
    /// Subnet prefix to sweep (three octets, e.g. 192.168.1).
    #[arg(short, long)]
    target: Option<String>,

    /// Run a single one-shot sweep and exit.
    #[arg(long)]
    once: bool,

    /// Run as daemon with scheduled sweeps.
    #[arg(long)]
    daemon: bool,

    /// Config file prefix (default: umbra).
    #[arg(short, long, default_value = "umbra")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_agent_config(&cli.config)?;

    let store = HistoryStore::open(&config.store_path)?;

    let alerts: Arc<dyn AlertSink> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookAlerter::new(url)?),
        None => Arc::new(NullAlerter),
    };

    let prober = Arc::new(NetProber::new(&config.sweep));
    let pipeline = SweepPipeline::new(&config, prober, store, alerts)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, draining in-flight probes");
                cancel.cancel();
            }
        }
    });

    if cli.once {
        let target = cli
            .target
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--target is required in --once mode"))?;
        let prefix: SubnetPrefix = target.parse()?;

        let outcome = pipeline.run(prefix, &cancel).await?;
        tracing::info!(
            session_id = %outcome.session.id,
            hosts = outcome.session.host_records.len(),
            events = outcome.events.len(),
            "One-shot sweep finished"
        );
    } else if cli.daemon {
        let scheduler = SweepScheduler::new(config, pipeline, cancel);
        scheduler.run().await?;
    } else {
        anyhow::bail!("Specify --once (one-shot sweep) or --daemon (scheduled sweeping)");
    }

    Ok(())
}

fn load_agent_config(file_prefix: &str) -> anyhow::Result<AgentConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("UMBRA")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.try_deserialize::<AgentConfig>() {
        Ok(c) => Ok(c),
        Err(_) => Ok(AgentConfig::default()),
    }
}
