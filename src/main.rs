use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use heal_client::HealClient;
use heal_service::{build_router, LlmProposer, ServiceState};
use postpilot_core_types::{SelectorMap, Version};
use selector_store::{FsStore, MemoryStore, SelectorStore};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postpilot_cli::config::{load_config, Config};
use postpilot_cli::seed::default_selector_set;

#[derive(Parser)]
#[command(
    name = "postpilot",
    version,
    about = "Self-healing posting automation for drifting web UIs"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Shortcut for --log-level debug
    #[arg(long, global = true)]
    debug: bool,

    /// Healing service base URL override
    #[arg(long, global = true)]
    service_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selector healing service
    Serve(ServeArgs),
    /// Check healing service health
    Health,
    /// Selector set administration
    Selectors {
        #[command(subcommand)]
        command: SelectorsCommand,
    },
    /// Compare a captured snapshot against the stored drift baseline
    Validate(ValidateArgs),
    /// Request replacement definitions for failed selector names
    Heal(HealArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address, host:port
    #[arg(long)]
    addr: Option<String>,

    /// Filesystem store root (in-memory store when omitted)
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Completion endpoint for the generative proposer
    #[arg(long)]
    llm_endpoint: Option<String>,
}

#[derive(Subcommand)]
enum SelectorsCommand {
    /// Fetch the current set, or one category of it
    Get {
        #[arg(long)]
        action: Option<String>,
    },
    /// Seed the store with a selector file, or the bundled defaults
    Init {
        /// YAML or JSON file with the category -> name -> definition map
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "1.0.0")]
        version: String,
    },
    /// Administrative update, bypassing healing
    Update {
        file: PathBuf,
        #[arg(long)]
        version: String,
        /// Snapshot file establishing a new drift baseline
        #[arg(long)]
        dom_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ValidateArgs {
    /// File holding the captured page snapshot
    #[arg(long)]
    dom_file: PathBuf,
}

#[derive(Args)]
struct HealArgs {
    /// File holding the captured page snapshot
    #[arg(long)]
    dom_file: PathBuf,

    /// Failed selector names
    #[arg(required = true)]
    names: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.debug)?;

    let mut config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(service_url) = cli.service_url.clone() {
        config.service_url = service_url;
    }

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(args, &config).await,
        Commands::Health => cmd_health(&config).await,
        Commands::Selectors { command } => cmd_selectors(command, &config).await,
        Commands::Validate(args) => cmd_validate(args, &config).await,
        Commands::Heal(args) => cmd_heal(args, &config).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("Command failed: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

async fn cmd_serve(args: ServeArgs, config: &Config) -> Result<()> {
    let store: Arc<dyn SelectorStore> = match args.storage_path.or_else(|| config.storage_path.clone()) {
        Some(path) => {
            info!("Using filesystem store at {}", path.display());
            Arc::new(FsStore::new(path))
        }
        None => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let mut state = ServiceState::new(store)
        .with_api_version(env!("CARGO_PKG_VERSION"))
        .with_environment(
            std::env::var("POSTPILOT_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        );
    if let Some(endpoint) = args.llm_endpoint.or_else(|| config.llm_endpoint.clone()) {
        info!("Generative proposer enabled via {}", endpoint);
        state = state.with_generative(Arc::new(LlmProposer::new(
            endpoint,
            config.llm_model.as_str(),
        )));
    }

    let addr: SocketAddr = args
        .addr
        .unwrap_or_else(|| config.bind_addr.clone())
        .parse()
        .context("Invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Healing service listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .await
        .context("Server error")?;
    Ok(())
}

async fn cmd_health(config: &Config) -> Result<()> {
    let client = HealClient::new(&config.service_url);
    let health = client.health().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "success": health.success,
            "status": health.status,
            "version": health.version,
            "kv": { "connected": health.kv.connected, "currentVersion": health.kv.current_version },
        }))?
    );
    Ok(())
}

async fn cmd_selectors(command: SelectorsCommand, config: &Config) -> Result<()> {
    let client = HealClient::new(&config.service_url);
    match command {
        SelectorsCommand::Get { action } => match action {
            Some(action) => {
                let category = client.fetch_category(&action).await?;
                println!("{}", serde_json::to_string_pretty(&category)?);
            }
            None => {
                let payload = client.fetch_set().await?;
                println!("{}", serde_json::to_string_pretty(&payload.into_set())?);
            }
        },
        SelectorsCommand::Init { file, version } => {
            let selectors = match file {
                Some(path) => read_selector_file(&path)?,
                None => default_selector_set(),
            };
            let version: Version = version.parse().context("Invalid version")?;
            let published = client.update(&selectors, version, None).await?;
            info!("Selector store seeded at version {}", published);
        }
        SelectorsCommand::Update {
            file,
            version,
            dom_file,
        } => {
            let selectors = read_selector_file(&file)?;
            let version: Version = version.parse().context("Invalid version")?;
            let snapshot = dom_file
                .map(|path| std::fs::read_to_string(path))
                .transpose()
                .context("Failed to read snapshot file")?;
            let published = client.update(&selectors, version, snapshot.as_deref()).await?;
            info!("Selector set updated to version {}", published);
        }
    }
    Ok(())
}

async fn cmd_validate(args: ValidateArgs, config: &Config) -> Result<()> {
    let client = HealClient::new(&config.service_url);
    let snapshot = std::fs::read_to_string(&args.dom_file).context("Failed to read snapshot file")?;
    let version = client.fetch_set().await.ok().map(|payload| payload.version);
    let report = client.validate(&snapshot, version, &[]).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "isValid": report.is_valid,
            "hasDOMChange": report.has_dom_change,
            "hasFailedSelectors": report.has_failed_selectors,
            "needsHealing": report.needs_healing,
            "currentVersion": report.current_version,
        }))?
    );
    Ok(())
}

async fn cmd_heal(args: HealArgs, config: &Config) -> Result<()> {
    let client = HealClient::new(&config.service_url);
    let snapshot = std::fs::read_to_string(&args.dom_file).context("Failed to read snapshot file")?;
    let result = client.heal(&snapshot, &args.names).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "version": result.version,
            "newSelectors": result.new_selectors,
        }))?
    );
    Ok(())
}

fn read_selector_file(path: &PathBuf) -> Result<SelectorMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read selector file {}", path.display()))?;
    let selectors = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).context("Failed to parse selector JSON")?
    } else {
        serde_yaml::from_str(&content).context("Failed to parse selector YAML")?
    };
    Ok(selectors)
}
