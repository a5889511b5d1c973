//! JSON persistence under `<data_dir>/<environment>/`.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    events::DecodedEvent, proposal::ProposalRecords, types::VoteRecord, upstream::Attestation,
    upstream::OnChainPools,
};

pub const ONCHAIN_VOTES_FILE: &str = "onchain_votes.json";
pub const OFFCHAIN_VOTES_FILE: &str = "offchain_votes.json";
pub const PROPOSALS_FILE: &str = "proposals.json";
pub const POOLS_FILE: &str = "onchain_pools.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One environment's data directory.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>, environment: &str) -> Self {
        Self { root: data_dir.as_ref().join(environment) }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    fn write<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.path(file_name);
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io { path: self.root.clone(), source })?;
        let contents =
            serde_json::to_string_pretty(value).map_err(|source| StoreError::Json { path: path.clone(), source })?;
        fs::write(&path, contents).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        debug!(path = %path.display(), "wrote data file");
        Ok(path)
    }

    fn read<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, StoreError> {
        let path = self.path(file_name);
        let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        serde_json::from_str(&contents).map_err(|source| StoreError::Json { path, source })
    }

    /// Like [`Self::read`] but a missing file yields the default value.
    fn read_or_default<T: DeserializeOwned + Default>(&self, file_name: &str) -> Result<T, StoreError> {
        if self.path(file_name).exists() {
            self.read(file_name)
        } else {
            Ok(T::default())
        }
    }

    /// Writes decoded events grouped by signature, one file per signature.
    pub fn save_events(&self, events: &[DecodedEvent]) -> Result<(), StoreError> {
        let mut by_signature: HashMap<&str, Vec<&DecodedEvent>> = HashMap::new();
        for event in events {
            by_signature.entry(event.signature.as_str()).or_default().push(event);
        }
        for (signature, group) in by_signature {
            self.write(&format!("{signature}.json"), &group)?;
            info!(signature, count = group.len(), "saved events");
        }
        Ok(())
    }

    /// Events of one signature; none when never fetched.
    pub fn load_events(&self, signature: &str) -> Result<Vec<DecodedEvent>, StoreError> {
        self.read_or_default(&format!("{signature}.json"))
    }

    pub fn save_onchain_votes(&self, votes: &[VoteRecord]) -> Result<(), StoreError> {
        self.write(ONCHAIN_VOTES_FILE, votes).map(|_| ())
    }

    pub fn load_onchain_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        self.read_or_default(ONCHAIN_VOTES_FILE)
    }

    pub fn save_offchain_votes(&self, votes: &[VoteRecord]) -> Result<(), StoreError> {
        self.write(OFFCHAIN_VOTES_FILE, votes).map(|_| ())
    }

    pub fn load_offchain_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        self.read_or_default(OFFCHAIN_VOTES_FILE)
    }

    pub fn save_proposals(&self, records: &ProposalRecords) -> Result<(), StoreError> {
        self.write(PROPOSALS_FILE, records).map(|_| ())
    }

    pub fn load_proposals(&self) -> Result<ProposalRecords, StoreError> {
        self.read_or_default(PROPOSALS_FILE)
    }

    pub fn save_pools(&self, pools: &HashMap<String, OnChainPools>) -> Result<(), StoreError> {
        self.write(POOLS_FILE, pools).map(|_| ())
    }

    pub fn load_pools(&self) -> Result<HashMap<String, OnChainPools>, StoreError> {
        self.read_or_default(POOLS_FILE)
    }

    /// Raw attestations of one schema, stored under the schema's name.
    pub fn save_attestations(&self, schema_name: &str, attestations: &[Attestation]) -> Result<(), StoreError> {
        self.write(&format!("{schema_name}.json"), attestations).map(|_| ())
    }

    pub fn load_attestations(&self, schema_name: &str) -> Result<Vec<Attestation>, StoreError> {
        self.read_or_default(&format!("{schema_name}.json"))
    }
}
