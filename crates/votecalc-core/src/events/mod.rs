//! Casting raw logs and attestations into canonical records.
//!
//! Values are normalized the same way everywhere: addresses and byte strings become
//! lower-case `0x` hex, integers become decimal strings so 256-bit values survive JSON.

pub mod attestations;
pub mod caster;
pub mod signatures;

use ethabi::{Token, Uint};
use num::{BigInt, BigUint};
use serde_json::Value;
use thiserror::Error;

use crate::types::{InvalidSupport, Weight};

pub use attestations::{
    citizen_categories, offchain_votes, CitizenAttestation, ProposalAttestation, VoteAttestation,
};
pub use caster::{DecodedEvent, EventCaster};
pub use signatures::{topic_hash, EventSpec};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no event known for topic {0}")]
    UnknownTopic(String),

    #[error("log has no topics")]
    MissingTopic,

    #[error("invalid event signature: {0}")]
    InvalidSignature(String),

    #[error("ABI decode failed for {signature}: {reason}")]
    Abi { signature: String, reason: String },

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("missing field {0}")]
    MissingField(String),

    #[error("invalid {field}: {value}")]
    InvalidField { field: String, value: String },

    #[error(transparent)]
    Support(#[from] InvalidSupport),
}

/// Decodes `0x`-prefixed (or bare) hex.
pub fn decode_hex(raw: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(trimmed).map_err(|e| DecodeError::Hex(format!("{e}: {raw}")))
}

#[must_use]
pub fn uint_to_weight(value: Uint) -> Weight {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigUint::from_bytes_be(&buf)
}

fn int_to_decimal(value: Uint) -> String {
    let magnitude = uint_to_weight(value);
    if value.bit(255) {
        let modulus: BigInt = BigInt::from(1u8) << 256;
        (BigInt::from(magnitude) - modulus).to_string()
    } else {
        magnitude.to_string()
    }
}

/// Renders an ABI token as normalized JSON.
#[must_use]
pub fn token_to_json(token: Token) -> Value {
    match token {
        Token::Address(address) => Value::String(format!("0x{}", hex::encode(address.as_bytes()))),
        Token::FixedBytes(bytes) | Token::Bytes(bytes) => {
            Value::String(format!("0x{}", hex::encode(bytes)))
        }
        Token::Uint(value) => Value::String(uint_to_weight(value).to_string()),
        Token::Int(value) => Value::String(int_to_decimal(value)),
        Token::Bool(flag) => Value::Bool(flag),
        Token::String(text) => Value::String(text),
        Token::FixedArray(items) | Token::Array(items) | Token::Tuple(items) => {
            Value::Array(items.into_iter().map(token_to_json).collect())
        }
    }
}
