//! Block parameter parsing and formatting.
//!
//! Log positions arrive from providers as hex quantities; block bounds given on the command
//! line are tags, hex, or decimal. Everything is normalized to integers here so that ordering downstream
//! is numeric.

use thiserror::Error;

/// Error types for block parameter parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

/// Block reference supplied by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    /// Specific block number
    Number(u64),
    /// Block tag (latest, earliest, etc.)
    Tag(BlockTag),
}

/// Block tags accepted as range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// The chain head at the time of reading
    Latest,
    /// Genesis
    Earliest,
}

impl BlockRef {
    /// Concrete block number, or `None` for `latest`, which readers resolve to the head.
    #[must_use]
    pub fn number(self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Tag(BlockTag::Earliest) => Some(0),
            Self::Tag(BlockTag::Latest) => None,
        }
    }
}

impl TryFrom<&str> for BlockRef {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        BlockParameter::parse(value)
    }
}

impl std::str::FromStr for BlockRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockParameter::parse(s)
    }
}

/// Centralized block parameter parsing
pub struct BlockParameter;

impl BlockParameter {
    /// Parse a block parameter from a string.
    ///
    /// Handles hex strings with a `0x` prefix, decimal strings, `latest` and `earliest`.
    ///
    /// # Examples
    /// ```
    /// use votecalc_core::utils::block_param::{BlockParameter, BlockRef, BlockTag};
    ///
    /// assert_eq!(BlockParameter::parse("latest").unwrap(), BlockRef::Tag(BlockTag::Latest));
    /// assert_eq!(BlockParameter::parse("0x10").unwrap(), BlockRef::Number(16));
    /// assert_eq!(BlockParameter::parse("100").unwrap(), BlockRef::Number(100));
    /// ```
    ///
    /// # Errors
    /// Returns `ParseError` if the input is not a valid block parameter.
    pub fn parse(param: &str) -> Result<BlockRef, ParseError> {
        match param {
            "latest" => Ok(BlockRef::Tag(BlockTag::Latest)),
            "earliest" => Ok(BlockRef::Tag(BlockTag::Earliest)),
            s => {
                if let Some(hex_str) = s.strip_prefix("0x") {
                    u64::from_str_radix(hex_str, 16)
                        .map(BlockRef::Number)
                        .map_err(|_| ParseError::InvalidHex(s.to_string()))
                } else {
                    s.parse::<u64>()
                        .map(BlockRef::Number)
                        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
                }
            }
        }
    }

    /// Extract a quantity from a JSON value.
    ///
    /// Providers normally send hex strings; some send bare JSON integers, which are accepted too.
    ///
    /// # Examples
    /// ```
    /// use votecalc_core::utils::block_param::BlockParameter;
    /// use serde_json::json;
    ///
    /// assert_eq!(BlockParameter::from_json_value(&json!("0xff")), Some(255));
    /// assert_eq!(BlockParameter::from_json_value(&json!(12)), Some(12));
    /// ```
    #[must_use]
    pub fn from_json_value(value: &serde_json::Value) -> Option<u64> {
        match value {
            serde_json::Value::String(s) => Self::parse_hex(s),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Parse a hex string to u64 (with or without 0x prefix).
    #[must_use]
    pub fn parse_hex(s: &str) -> Option<u64> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        u64::from_str_radix(s, 16).ok()
    }

    /// Formats a block number as a JSON-RPC hex quantity.
    ///
    /// ```
    /// use votecalc_core::utils::block_param::BlockParameter;
    ///
    /// assert_eq!(BlockParameter::to_hex(0), "0x0");
    /// assert_eq!(BlockParameter::to_hex(1000), "0x3e8");
    /// ```
    #[must_use]
    pub fn to_hex(block: u64) -> String {
        format!("0x{block:x}")
    }
}
