pub mod calculate;
pub mod config;
pub mod fetch;
pub mod utils;

pub use calculate::{calculate_proposals, list_proposals};
pub use config::{handle_config_command, ConfigCommands};
pub use fetch::{fetch_offchain, fetch_onchain};
