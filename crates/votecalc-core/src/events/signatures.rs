use ethabi::{
    param_type::{Reader, Writer},
    ParamType,
};
use sha3::{Digest, Keccak256};

use super::DecodeError;

/// An event signature paired with canonical snake_case names for its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpec {
    pub signature: &'static str,
    pub field_names: &'static [&'static str],
}

pub const VOTE_CAST: EventSpec = EventSpec {
    signature: "VoteCast(address,uint256,uint8,uint256,string)",
    field_names: &["voter", "proposal_id", "support", "weight", "reason"],
};

pub const VOTE_CAST_WITH_PARAMS: EventSpec = EventSpec {
    signature: "VoteCastWithParams(address,uint256,uint8,uint256,string,bytes)",
    field_names: &["voter", "proposal_id", "support", "weight", "reason", "params"],
};

pub const PROPOSAL_CREATED_1: EventSpec = EventSpec {
    signature: "ProposalCreated(uint256,address,address[],uint256[],string[],bytes[],uint256,uint256,string)",
    field_names: &[
        "proposal_id",
        "proposer",
        "targets",
        "values",
        "signatures",
        "calldatas",
        "start_block",
        "end_block",
        "description",
    ],
};

pub const PROPOSAL_CREATED_2: EventSpec = EventSpec {
    signature:
        "ProposalCreated(uint256,address,address[],uint256[],string[],bytes[],uint256,uint256,string,uint8)",
    field_names: &[
        "proposal_id",
        "proposer",
        "targets",
        "values",
        "signatures",
        "calldatas",
        "start_block",
        "end_block",
        "description",
        "proposal_type",
    ],
};

pub const PROPOSAL_CREATED_3: EventSpec = EventSpec {
    signature: "ProposalCreated(uint256,address,address,bytes,uint256,uint256,string)",
    field_names: &[
        "proposal_id",
        "proposer",
        "voting_module",
        "proposal_data",
        "start_block",
        "end_block",
        "description",
    ],
};

pub const PROPOSAL_CREATED_4: EventSpec = EventSpec {
    signature: "ProposalCreated(uint256,address,address,bytes,uint256,uint256,string,uint8)",
    field_names: &[
        "proposal_id",
        "proposer",
        "voting_module",
        "proposal_data",
        "start_block",
        "end_block",
        "description",
        "proposal_type",
    ],
};

pub const VOTE_EVENTS: [EventSpec; 2] = [VOTE_CAST, VOTE_CAST_WITH_PARAMS];

pub const PROPOSAL_EVENTS: [EventSpec; 4] =
    [PROPOSAL_CREATED_1, PROPOSAL_CREATED_2, PROPOSAL_CREATED_3, PROPOSAL_CREATED_4];

/// Every event the governor reader subscribes to.
pub const GOVERNOR_EVENTS: [EventSpec; 6] = [
    VOTE_CAST,
    VOTE_CAST_WITH_PARAMS,
    PROPOSAL_CREATED_1,
    PROPOSAL_CREATED_2,
    PROPOSAL_CREATED_3,
    PROPOSAL_CREATED_4,
];

/// Keccak-256 of the signature as a `0x`-prefixed lower-case topic.
///
/// ```
/// use votecalc_core::events::signatures::topic_hash;
///
/// assert_eq!(
///     topic_hash("Transfer(address,address,uint256)"),
///     "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
/// );
/// ```
#[must_use]
pub fn topic_hash(signature: &str) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(signature.as_bytes())))
}

/// Event name, the part before the parameter list.
#[must_use]
pub fn event_name(signature: &str) -> &str {
    signature.split_once('(').map_or(signature, |(name, _)| name)
}

/// Parses the parameter list of a signature into ABI types.
///
/// Every parameter must be written in canonical form; a type name the ABI reader would
/// reinterpret is rejected.
pub fn param_types(signature: &str) -> Result<Vec<ParamType>, DecodeError> {
    let invalid = || DecodeError::InvalidSignature(signature.to_string());
    let parse = |piece: &str| -> Result<ParamType, DecodeError> {
        let param = Reader::read(piece).map_err(|_| invalid())?;
        if Writer::write(&param) == piece {
            Ok(param)
        } else {
            Err(invalid())
        }
    };

    let inner = signature
        .split_once('(')
        .and_then(|(_, rest)| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or_else(invalid)?,
            ',' if depth == 0 => {
                params.push(parse(&inner[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(parse(&inner[start..])?);
    Ok(params)
}
