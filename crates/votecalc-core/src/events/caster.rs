use std::collections::{BTreeMap, HashMap};

use ethabi::{ParamType, Token};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    decode_hex,
    signatures::{param_types, topic_hash, EventSpec},
    token_to_json, DecodeError,
};
use crate::{
    logs::RawLog,
    types::{weight_string, Support, VoteRecord},
};

/// A log decoded into named, normalized fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub signature: String,
    pub sighash: String,
    pub block_number: u64,
    pub transaction_index: u32,
    pub log_index: u32,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl DecodedEvent {
    pub fn field(&self, name: &str) -> Result<&Value, DecodeError> {
        self.fields.get(name).ok_or_else(|| DecodeError::MissingField(name.to_string()))
    }

    pub fn str_field(&self, name: &str) -> Result<&str, DecodeError> {
        self.field(name)?.as_str().ok_or_else(|| DecodeError::InvalidField {
            field: name.to_string(),
            value: self.fields[name].to_string(),
        })
    }

    /// Drops a field, e.g. free-text `reason` before persisting.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.fields.remove(name);
        self
    }
}

struct CompiledEvent {
    spec: EventSpec,
    params: Vec<ParamType>,
    sighash: String,
}

/// Decodes raw logs of a fixed set of events.
pub struct EventCaster {
    by_topic: HashMap<String, CompiledEvent>,
}

impl EventCaster {
    /// # Errors
    /// [`DecodeError::InvalidSignature`] if a signature does not parse or its names do not line
    /// up with its parameters.
    pub fn new(specs: &[EventSpec]) -> Result<Self, DecodeError> {
        let mut by_topic = HashMap::with_capacity(specs.len());
        for spec in specs {
            let params = param_types(spec.signature)?;
            if params.len() != spec.field_names.len() {
                return Err(DecodeError::InvalidSignature(spec.signature.to_string()));
            }
            let sighash = topic_hash(spec.signature);
            by_topic.insert(sighash.clone(), CompiledEvent { spec: *spec, params, sighash });
        }
        Ok(Self { by_topic })
    }

    /// Topic hashes of every known event, in no particular order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.by_topic.keys().cloned().collect()
    }

    #[must_use]
    pub fn knows(&self, topic: &str) -> bool {
        self.by_topic.contains_key(&topic.to_lowercase())
    }

    /// Decodes one log.
    ///
    /// Indexed parameters are taken to be the leading ones, one per topic after the selector;
    /// every governor event handled here declares its indexed parameters first. Indexed
    /// dynamic values only survive as their hash and are kept as the raw topic.
    pub fn decode(&self, log: &RawLog) -> Result<DecodedEvent, DecodeError> {
        let topic0 = log.topic0().ok_or(DecodeError::MissingTopic)?;
        let event = self
            .by_topic
            .get(&topic0.to_lowercase())
            .ok_or_else(|| DecodeError::UnknownTopic(topic0.to_string()))?;
        let signature = event.spec.signature;
        let abi_error = |reason: String| DecodeError::Abi { signature: signature.to_string(), reason };

        let indexed = log.topics.len() - 1;
        if indexed > event.params.len() {
            return Err(abi_error(format!("{indexed} indexed topics for {} params", event.params.len())));
        }

        let mut values: Vec<Value> = Vec::with_capacity(event.params.len());
        for (topic, param) in log.topics[1..].iter().zip(&event.params) {
            if param.is_dynamic() {
                values.push(Value::String(topic.clone()));
                continue;
            }
            let bytes = decode_hex(topic)?;
            let token = ethabi::decode(std::slice::from_ref(param), &bytes)
                .map_err(|e| abi_error(e.to_string()))?;
            values.extend(token.into_iter().map(token_to_json));
        }

        let data = decode_hex(&log.data)?;
        let tokens: Vec<Token> =
            ethabi::decode(&event.params[indexed..], &data).map_err(|e| abi_error(e.to_string()))?;
        values.extend(tokens.into_iter().map(token_to_json));

        let fields = event
            .spec
            .field_names
            .iter()
            .map(|name| (*name).to_string())
            .zip(values)
            .collect();

        Ok(DecodedEvent {
            signature: signature.to_string(),
            sighash: event.sighash.clone(),
            block_number: log.block_number,
            transaction_index: log.transaction_index,
            log_index: log.log_index,
            fields,
        })
    }
}

/// Decodes approval choices carried in `VoteCastWithParams` params as `uint256[]`.
///
/// Returns `None` when the params are empty, not ABI-encoded, or name a choice beyond `u32`.
#[must_use]
pub fn decode_choice_params(params: &str) -> Option<Vec<u32>> {
    let bytes = decode_hex(params).ok()?;
    if bytes.is_empty() {
        return None;
    }
    let tokens = ethabi::decode(&[ParamType::Array(Box::new(ParamType::Uint(256)))], &bytes).ok()?;
    match tokens.into_iter().next()? {
        Token::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Token::Uint(value) if value <= ethabi::Uint::from(u32::MAX) => Some(value.as_u32()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

impl VoteRecord {
    /// Builds a ballot from a decoded `VoteCast` or `VoteCastWithParams` event.
    ///
    /// Params that do not decode leave the ballot without choices; it still counts toward the
    /// aggregated support totals.
    pub fn from_vote_event(event: &DecodedEvent) -> Result<Self, DecodeError> {
        let invalid = |field: &str, value: &str| DecodeError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        };

        let proposal_id = event.str_field("proposal_id")?;
        let raw_support = event.str_field("support")?;
        let support_code: i64 = raw_support.parse().map_err(|_| invalid("support", raw_support))?;
        let support = Support::try_from(support_code)?;
        let raw_weight = event.str_field("weight")?;
        let weight = weight_string::parse(raw_weight).ok_or_else(|| invalid("weight", raw_weight))?;

        let mut record = Self::new(proposal_id, support, weight).with_voter(event.str_field("voter")?);

        if let Some(params) = event.fields.get("params").and_then(Value::as_str) {
            match decode_choice_params(params) {
                Some(choices) => record = record.with_choices(choices),
                None => tracing::debug!(
                    proposal_id,
                    block_number = event.block_number,
                    "vote params carry no decodable choices"
                ),
            }
        }

        Ok(record)
    }
}
