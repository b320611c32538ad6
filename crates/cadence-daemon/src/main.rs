use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use cadence_campaigns::CampaignStore;
use cadence_channels::{PublisherRegistry, WebhookPublisher};
use cadence_content::HttpGenerator;
use cadence_core::{CadenceConfig, CadenceError, CampaignId, Response};
use cadence_pipeline::{Job, JobManager, Pipeline};

#[derive(Parser)]
#[command(name = "cadenced", about = "Campaign automation backend", version)]
struct Cli {
    /// Path to cadence.toml (defaults to ~/.cadence/cadence.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background job manager until interrupted
    Serve,
    /// Invoke a single pipeline stage and print its responses as JSON
    Run {
        /// Stage name: schedule, generate or publish
        job: String,
    },
    /// Expand a campaign's recurrence rule and print the calendar events
    Expand {
        campaign_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadenced=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config flag > CADENCE_CONFIG env > ~/.cadence/cadence.toml
    let config_path = cli.config.or_else(|| std::env::var("CADENCE_CONFIG").ok());
    let config = CadenceConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        CadenceConfig::default()
    });

    let store = open_store(&config)?;

    match cli.command {
        Command::Serve => serve(config, store).await,
        Command::Run { job } => {
            let job: Job = job.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let pipeline = build_pipeline(&config, Arc::clone(&store));
            let today = chrono::Utc::now().date_naive();
            let responses = pipeline.run_job(job, today).await;
            println!("{}", serde_json::to_string_pretty(&responses)?);
            Ok(())
        }
        Command::Expand { campaign_id } => {
            let outcome = store
                .get_campaign(&CampaignId::from(campaign_id.as_str()))
                .and_then(|campaign| cadence_campaigns::expand(&campaign));
            let response = match outcome {
                Ok(events) => Response::ok(events),
                Err(e) => {
                    let e = CadenceError::from(e);
                    Response::failed(format!("{}: {e}", e.code()))
                }
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

async fn serve(config: CadenceConfig, store: Arc<CampaignStore>) -> anyhow::Result<()> {
    let tick = Duration::from_secs(config.manager.tick_secs);
    let pipeline = build_pipeline(&config, store);
    let manager = JobManager::new(Arc::new(pipeline), tick);

    manager.start().await;
    info!(tick_secs = config.manager.tick_secs, "cadence manager running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    manager.stop().await;
    Ok(())
}

fn open_store(config: &CadenceConfig) -> anyhow::Result<Arc<CampaignStore>> {
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(Arc::new(CampaignStore::new(conn)?))
}

fn build_pipeline(config: &CadenceConfig, store: Arc<CampaignStore>) -> Pipeline {
    let generator = HttpGenerator::new(
        config.generator.base_url.clone(),
        config.generator.api_key.clone(),
        config.generator.timeout_ms,
    );

    let mut registry = PublisherRegistry::new();
    for channel in &config.channels {
        registry.register(Box::new(WebhookPublisher::new(
            channel.name.clone(),
            channel.url.clone(),
            channel.token.clone(),
            channel.timeout_ms,
        )));
    }
    if registry.is_empty() {
        warn!("no publish channels configured");
    }

    Pipeline::new(
        store,
        Arc::new(generator),
        Arc::new(registry),
        Duration::from_millis(config.generator.timeout_ms),
    )
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
