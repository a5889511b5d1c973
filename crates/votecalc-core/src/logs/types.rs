use serde_json::{json, Value};

use crate::{upstream::UpstreamError, utils::BlockParameter};

/// Canonical position of a log in chain order.
///
/// Field order matters: the derived `Ord` compares block number, then transaction index, then
/// log index, all numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    pub block_number: u64,
    pub transaction_index: u32,
    pub log_index: u32,
}

/// A raw `eth_getLogs` entry with quantities already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract, lower-cased.
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub transaction_index: u32,
    pub log_index: u32,
    pub transaction_hash: Option<String>,
    pub block_hash: Option<String>,
}

impl RawLog {
    #[must_use]
    pub fn position(&self) -> LogPosition {
        LogPosition {
            block_number: self.block_number,
            transaction_index: self.transaction_index,
            log_index: self.log_index,
        }
    }

    /// The event selector topic, if any.
    #[must_use]
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }

    /// Parses one element of an `eth_getLogs` result array.
    ///
    /// # Errors
    /// Returns [`UpstreamError::InvalidResponse`] if a required field is missing or malformed.
    pub fn from_json(value: &Value) -> Result<Self, UpstreamError> {
        let field = |name: &str| {
            value
                .get(name)
                .ok_or_else(|| UpstreamError::InvalidResponse(format!("log missing {name}")))
        };
        let quantity = |name: &str| -> Result<u64, UpstreamError> {
            BlockParameter::from_json_value(field(name)?)
                .ok_or_else(|| UpstreamError::InvalidResponse(format!("log has invalid {name}")))
        };
        let index = |name: &str| -> Result<u32, UpstreamError> {
            quantity(name)?
                .try_into()
                .map_err(|_| UpstreamError::InvalidResponse(format!("log {name} out of range")))
        };

        let address = field("address")?
            .as_str()
            .ok_or_else(|| UpstreamError::InvalidResponse("log address is not a string".into()))?
            .to_lowercase();

        let topics = field("topics")?
            .as_array()
            .ok_or_else(|| UpstreamError::InvalidResponse("log topics is not an array".into()))?
            .iter()
            .map(|t| {
                t.as_str().map(str::to_lowercase).ok_or_else(|| {
                    UpstreamError::InvalidResponse("log topic is not a string".into())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data = value.get("data").and_then(Value::as_str).unwrap_or("0x").to_string();

        Ok(Self {
            address,
            topics,
            data,
            block_number: quantity("blockNumber")?,
            transaction_index: index("transactionIndex")?,
            log_index: index("logIndex")?,
            transaction_hash: value.get("transactionHash").and_then(Value::as_str).map(String::from),
            block_hash: value.get("blockHash").and_then(Value::as_str).map(String::from),
        })
    }

    /// Renders the log back into provider JSON shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "address": self.address,
            "topics": self.topics,
            "data": self.data,
            "blockNumber": BlockParameter::to_hex(self.block_number),
            "transactionIndex": BlockParameter::to_hex(u64::from(self.transaction_index)),
            "logIndex": BlockParameter::to_hex(u64::from(self.log_index)),
            "transactionHash": self.transaction_hash,
            "blockHash": self.block_hash,
        })
    }
}

/// One `eth_getLogs` filter: a contract, a topic group and an inclusive block range.
///
/// The topic group is an OR-set in topic position 0, so a single query matches any of up to
/// four event selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: String,
    pub topics: Vec<String>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogQuery {
    #[must_use]
    pub fn new(address: impl Into<String>, topics: Vec<String>, from_block: u64, to_block: u64) -> Self {
        Self { address: address.into(), topics, from_block, to_block }
    }

    /// Same filter over a different block range.
    #[must_use]
    pub fn with_range(&self, from_block: u64, to_block: u64) -> Self {
        Self { address: self.address.clone(), topics: self.topics.clone(), from_block, to_block }
    }

    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.to_block.saturating_sub(self.from_block) + 1
    }

    /// Whether `log` falls inside this filter.
    #[must_use]
    pub fn matches(&self, log: &RawLog) -> bool {
        let in_range = (self.from_block..=self.to_block).contains(&log.block_number);
        let address_ok = self.address.eq_ignore_ascii_case(&log.address);
        let topic_ok = self.topics.is_empty() ||
            log.topic0().is_some_and(|t0| self.topics.iter().any(|t| t.eq_ignore_ascii_case(t0)));
        in_range && address_ok && topic_ok
    }

    /// JSON filter object for `eth_getLogs`.
    #[must_use]
    pub fn to_filter(&self) -> Value {
        let mut filter = json!({
            "address": self.address,
            "fromBlock": BlockParameter::to_hex(self.from_block),
            "toBlock": BlockParameter::to_hex(self.to_block),
        });
        if !self.topics.is_empty() {
            filter["topics"] = json!([self.topics]);
        }
        filter
    }
}
