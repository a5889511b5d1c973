use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use votecalc_core::{config::AppConfig, utils::BlockRef};

mod commands;
use commands::{
    calculate_proposals, fetch_offchain, fetch_onchain, handle_config_command, list_proposals,
    ConfigCommands,
};

#[derive(Parser)]
#[command(name = "votecalc")]
#[command(about = "Fetch governance votes and calculate proposal outcomes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $VOTECALC_CONFIG, then config/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the configured environment name
    #[arg(long, global = true)]
    env: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read governor logs and store on-chain proposals, votes and pools
    FetchOnchain {
        /// First block to read (number, hex or `earliest`); overrides `chain.start_block`
        #[arg(long)]
        from_block: Option<BlockRef>,

        /// Last block to read (number, hex or `latest`); overrides `chain.end_block`
        #[arg(long)]
        to_block: Option<BlockRef>,
    },

    /// Read EAS attestations and store off-chain proposals and citizen votes
    FetchOffchain,

    /// List stored proposals by kind
    ListProposals,

    /// Calculate the outcome of a proposal
    Calculate {
        /// Proposal id; `{onchain}-{offchain}` for hybrids
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Calculate every stored proposal
        #[arg(long)]
        all: bool,
    },

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Installs the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this workspace's crates.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,votecalc_core={level},votecalc={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    if let Some(env) = &cli.env {
        config.environment.clone_from(env);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config);

    if !matches!(cli.command, Commands::Config(_)) {
        config.validate().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    }

    match cli.command {
        Commands::FetchOnchain { from_block, to_block } => fetch_onchain(&config, from_block, to_block).await?,
        Commands::FetchOffchain => fetch_offchain(&config).await?,
        Commands::ListProposals => list_proposals(&config)?,
        Commands::Calculate { id, all: _ } => calculate_proposals(&config, id.as_deref())?,
        Commands::Config(command) => handle_config_command(command, &config)?,
    }

    Ok(())
}
