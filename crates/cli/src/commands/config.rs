use clap::Subcommand;
use votecalc_core::config::AppConfig;

use super::utils::{print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the loaded configuration
    Validate,

    /// Show the effective configuration as TOML
    Show,
}

pub fn handle_config_command(command: ConfigCommands, config: &AppConfig) -> CliResult<()> {
    match command {
        ConfigCommands::Validate => validate_config(config),
        ConfigCommands::Show => show_config(config),
    }
}

fn validate_config(config: &AppConfig) -> CliResult<()> {
    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;
    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Environment: {}", config.environment);
    println!("  Chain: {} ({})", config.chain.chain_id, or_unset(&config.chain.rpc_url));
    println!("  Governor: {}", or_unset(&config.chain.governor_address));
    println!(
        "  Blocks: {}..{}",
        config.chain.start_block,
        config.chain.end_block.map_or_else(|| "head".to_string(), |b| b.to_string())
    );
    println!("  Log window: {} blocks", config.block_span());
    println!("  Proposal types: {}", config.tally.proposal_types.len());
    println!("  Data: {}/{}", config.data.dir, config.environment);

    Ok(())
}

fn show_config(config: &AppConfig) -> CliResult<()> {
    let rendered = toml::to_string_pretty(config).map_err(|e| CliError::Config(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "unset"
    } else {
        value
    }
}
