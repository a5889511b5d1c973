use std::fmt;

use votecalc_core::{
    config::AppConfig, events::DecodeError, logs::FetchError, proposal::ProposalError,
    store::{DataStore, StoreError},
    upstream::UpstreamError,
};

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Store(String),
    Network(String),
    Proposal(String),
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Store(msg) => write!(f, "Data store error: {msg}"),
            Self::Network(msg) => write!(f, "Network error: {msg}"),
            Self::Proposal(msg) => write!(f, "Proposal error: {msg}"),
            Self::General(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<StoreError> for CliError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<UpstreamError> for CliError {
    fn from(error: UpstreamError) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(error: FetchError) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<ProposalError> for CliError {
    fn from(error: ProposalError) -> Self {
        Self::Proposal(error.to_string())
    }
}

impl From<DecodeError> for CliError {
    fn from(error: DecodeError) -> Self {
        Self::General(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Fails with a config error unless `value` is set.
pub fn require<'a>(name: &str, value: &'a str) -> CliResult<&'a str> {
    if value.is_empty() {
        Err(CliError::Config(format!("{name} is not set")))
    } else {
        Ok(value)
    }
}

#[must_use]
pub fn data_store(config: &AppConfig) -> DataStore {
    DataStore::new(&config.data.dir, &config.environment)
}

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}
