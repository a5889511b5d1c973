use votecalc_core::{
    config::AppConfig,
    proposal::{calculate, calculate_all, CalculationContext, Proposal, ProposalRegistry, VoteTable},
    store::DataStore,
};

use super::utils::{data_store, print_error, print_info, CliError, CliResult};

fn load_registry(config: &AppConfig, store: &DataStore) -> CliResult<ProposalRegistry> {
    let types = config.proposal_types().map_err(CliError::Config)?;
    Ok(ProposalRegistry::build(&store.load_proposals()?, &types)?)
}

fn load_context(config: &AppConfig, store: &DataStore) -> CliResult<CalculationContext> {
    Ok(CalculationContext {
        onchain_votes: VoteTable::new(store.load_onchain_votes()?),
        offchain_votes: VoteTable::new(store.load_offchain_votes()?),
        onchain_pools: store.load_pools()?,
        citizens: config.tally.citizens,
        weights: config.tally.weights.clone(),
    })
}

/// Prints every known proposal grouped by kind.
pub fn list_proposals(config: &AppConfig) -> CliResult<()> {
    let store = data_store(config);
    let registry = load_registry(config, &store)?;

    if registry.is_empty() {
        print_info(&format!("No proposals stored in {}", store.root().display()));
        return Ok(());
    }

    for (heading, proposals) in [
        ("Off-chain", registry.off_chain()),
        ("On-chain", registry.on_chain()),
        ("Hybrid", registry.hybrid()),
    ] {
        if proposals.is_empty() {
            continue;
        }
        println!("{heading} ({}):", proposals.len());
        for proposal in proposals {
            println!("  {proposal}");
        }
        println!();
    }
    Ok(())
}

/// Calculates one proposal, or every proposal when `id` is `None`.
///
/// With `--all`, a failing proposal is reported and the rest still print; the command then
/// fails once at the end.
pub fn calculate_proposals(config: &AppConfig, id: Option<&str>) -> CliResult<()> {
    let store = data_store(config);
    let registry = load_registry(config, &store)?;
    let ctx = load_context(config, &store)?;

    if let Some(id) = id {
        let outcome = calculate(registry.get(id)?, &ctx)?;
        println!("{outcome}");
        return Ok(());
    }

    let proposals: Vec<Proposal> = registry.iter().cloned().collect();
    let mut failures = 0usize;
    for (proposal, result) in proposals.iter().zip(calculate_all(&proposals, &ctx)) {
        match result {
            Ok(outcome) => println!("{outcome}\n"),
            Err(e) => {
                failures += 1;
                print_error(&format!("{proposal}: {e}"));
            }
        }
    }

    if failures > 0 {
        return Err(CliError::Proposal(format!(
            "{failures} of {} proposals could not be calculated",
            proposals.len()
        )));
    }
    Ok(())
}
