use ethabi::{ParamType, Token};
use num::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{http_client::JsonRpcClient, UpstreamError};
use crate::types::Weight;

/// Read-only view of a governor contract's voting parameters.
pub struct GovernorReader<'a> {
    rpc: &'a JsonRpcClient,
    address: String,
}

/// On-chain eligibility figures for one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainPools {
    pub snapshot_block: u64,
    #[serde(with = "crate::types::weight_string")]
    pub votable_supply: Weight,
    #[serde(with = "crate::types::weight_string")]
    pub quorum: Weight,
}

impl<'a> GovernorReader<'a> {
    #[must_use]
    pub fn new(rpc: &'a JsonRpcClient, address: impl Into<String>) -> Self {
        Self { rpc, address: address.into() }
    }

    /// `quorum(uint256)`: the absolute quorum for a proposal.
    pub async fn quorum(&self, proposal_id: &Weight) -> Result<Weight, UpstreamError> {
        self.call_uint("quorum", proposal_id).await
    }

    /// `proposalSnapshot(uint256)`: the block voting power is measured at.
    pub async fn proposal_snapshot(&self, proposal_id: &Weight) -> Result<u64, UpstreamError> {
        let block = self.call_uint("proposalSnapshot", proposal_id).await?;
        u64::try_from(block)
            .map_err(|_| UpstreamError::InvalidResponse("snapshot block exceeds u64".into()))
    }

    /// `votableSupply(uint256)`: supply eligible to vote at `block`.
    pub async fn votable_supply(&self, block: u64) -> Result<Weight, UpstreamError> {
        self.call_uint("votableSupply", &BigUint::from(block)).await
    }

    /// Reads snapshot, votable supply and quorum for a proposal in that order.
    pub async fn pools(&self, proposal_id: &Weight) -> Result<OnChainPools, UpstreamError> {
        let snapshot_block = self.proposal_snapshot(proposal_id).await?;
        let votable_supply = self.votable_supply(snapshot_block).await?;
        let quorum = self.quorum(proposal_id).await?;
        tracing::debug!(snapshot_block, %votable_supply, %quorum, "governor pools read");
        Ok(OnChainPools { snapshot_block, votable_supply, quorum })
    }

    async fn call_uint(&self, function: &str, argument: &Weight) -> Result<Weight, UpstreamError> {
        let calldata = encode_uint_call(function, argument)?;
        let result = self
            .rpc
            .call(
                "eth_call",
                json!([{ "to": self.address, "data": format!("0x{}", hex::encode(calldata)) }, "latest"]),
            )
            .await?;

        let raw = result
            .as_str()
            .ok_or_else(|| UpstreamError::InvalidResponse("eth_call result is not a string".into()))?;
        decode_uint(raw)
    }
}

/// Selector plus a single ABI-encoded `uint256` argument.
fn encode_uint_call(function: &str, argument: &Weight) -> Result<Vec<u8>, UpstreamError> {
    let bytes = argument.to_bytes_be();
    if bytes.len() > 32 {
        return Err(UpstreamError::InvalidResponse(format!("{argument} does not fit in uint256")));
    }
    let selector = ethabi::short_signature(function, &[ParamType::Uint(256)]);
    let mut calldata = selector.to_vec();
    calldata.extend(ethabi::encode(&[Token::Uint(ethabi::Uint::from_big_endian(&bytes))]));
    Ok(calldata)
}

fn decode_uint(raw: &str) -> Result<Weight, UpstreamError> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| UpstreamError::InvalidResponse(format!("eth_call result is not hex: {e}")))?;
    match ethabi::decode(&[ParamType::Uint(256)], &bytes) {
        Ok(tokens) => match tokens.first() {
            Some(Token::Uint(value)) => Ok(crate::events::uint_to_weight(*value)),
            _ => Err(UpstreamError::InvalidResponse("eth_call returned no uint".into())),
        },
        Err(e) => Err(UpstreamError::InvalidResponse(format!("eth_call result undecodable: {e}"))),
    }
}
