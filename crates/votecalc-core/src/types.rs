//! Shared vote and JSON-RPC types.

use num::BigUint;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::BTreeSet, fmt, str::FromStr, sync::Arc};

/// Arbitrary-precision vote weight.
///
/// On-chain weights are token balances and routinely exceed `u64`. Weights stay integral
/// through aggregation; conversion to `f64` only happens when percentages are computed.
pub type Weight = BigUint;

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Zero-allocation version string for request construction.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Error for support values outside `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid support value: {0}")]
pub struct InvalidSupport(pub i64);

/// Ballot direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Support {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl Support {
    pub const ALL: [Support; 3] = [Support::Against, Support::For, Support::Abstain];
}

impl TryFrom<i64> for Support {
    type Error = InvalidSupport;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Against),
            1 => Ok(Self::For),
            2 => Ok(Self::Abstain),
            other => Err(InvalidSupport(other)),
        }
    }
}

impl TryFrom<u8> for Support {
    type Error = InvalidSupport;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl From<Support> for u8 {
    fn from(support: Support) -> Self {
        support as u8
    }
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Against => f.write_str("against"),
            Self::For => f.write_str("for"),
            Self::Abstain => f.write_str("abstain"),
        }
    }
}

/// Error for unrecognized citizen categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

/// Citizen-house partition used for off-chain multi-house voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    App,
    User,
    Chain,
}

impl Category {
    /// Categories in report order.
    pub const ALL: [Category; 3] = [Category::App, Category::User, Category::Chain];

    /// Maps an attestation selection method (`5.1`, `5.2`, `5.3`) to its category.
    #[must_use]
    pub fn from_selection_method(method: &str) -> Option<Self> {
        match method {
            "5.1" => Some(Self::App),
            "5.2" => Some(Self::User),
            "5.3" => Some(Self::Chain),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::User => "user",
            Self::Chain => "chain",
        }
    }

    /// Human-readable house label used in reports.
    #[must_use]
    pub fn house_label(&self) -> &'static str {
        match self {
            Self::App => "Citizen House - Apps",
            Self::User => "Citizen House - Users",
            Self::Chain => "Citizen House - Chains",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" | "apps" => Ok(Self::App),
            "user" | "users" => Ok(Self::User),
            "chain" | "chains" => Ok(Self::Chain),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ballot as produced by event or attestation decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub proposal_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voter: Option<String>,

    pub support: Support,

    /// Token balance for on-chain votes, a fixed unit for off-chain votes.
    #[serde(with = "weight_string")]
    pub weight: Weight,

    /// Selected option indices, approval scheme only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<BTreeSet<u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl VoteRecord {
    #[must_use]
    pub fn new(proposal_id: impl Into<String>, support: Support, weight: impl Into<Weight>) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            voter: None,
            support,
            weight: weight.into(),
            choices: None,
            category: None,
        }
    }

    #[must_use]
    pub fn with_voter(mut self, voter: impl Into<String>) -> Self {
        self.voter = Some(voter.into());
        self
    }

    #[must_use]
    pub fn with_choices(mut self, choices: impl IntoIterator<Item = u32>) -> Self {
        self.choices = Some(choices.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// Serializes [`Weight`] as a decimal string so values beyond `u64` survive JSON.
pub mod weight_string {
    use super::Weight;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(weight: &Weight, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&weight.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weight, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid weight: {raw}")))
    }

    /// Parses a non-negative decimal integer of any size.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Weight> {
        Weight::parse_bytes(raw.trim().as_bytes(), 10)
    }
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id: Arc::new(id) }
    }
}

/// JSON-RPC 2.0 response. Carries either `result` or `error`, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    pub id: Arc<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}
