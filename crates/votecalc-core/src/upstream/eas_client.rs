use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use super::http_client::{build_client, classify_network_error, HttpClientConfig};
use crate::upstream::UpstreamError;

/// Page size used when walking an attestation listing.
pub const ATTESTATION_PAGE_SIZE: usize = 100;

const ATTESTATIONS_QUERY: &str = r"
query Attestations($where: AttestationWhereInput, $take: Int, $skip: Int) {
  attestations(where: $where, take: $take, skip: $skip) {
    id
    attester
    recipient
    refUID
    data
    revocable
    revoked
    revocationTime
    expirationTime
    isOffchain
    time
    txid
    schemaId
  }
}";

const SCHEMA_QUERY: &str = r"
query GetSchema($where: SchemaWhereUniqueInput!) {
  getSchema(where: $where) {
    id
    schema
    revocable
    creator
  }
}";

/// One attestation as listed by an EAS indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub id: String,
    pub attester: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(rename = "refUID", default)]
    pub ref_uid: String,
    /// ABI-encoded payload, `0x`-prefixed.
    pub data: String,
    #[serde(default)]
    pub revocable: bool,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub revocation_time: u64,
    #[serde(default)]
    pub expiration_time: u64,
    #[serde(default)]
    pub is_offchain: bool,
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub txid: String,
    pub schema_id: String,
}

/// Schema registration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub id: String,
    pub schema: String,
    #[serde(default)]
    pub revocable: bool,
    #[serde(default)]
    pub creator: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AttestationsData {
    attestations: Vec<Attestation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaData {
    get_schema: Option<SchemaRecord>,
}

/// GraphQL client for an EAS attestation indexer.
pub struct EasClient {
    client: Client,
    url: String,
    page_size: usize,
}

impl EasClient {
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new(url: impl Into<String>) -> Result<Self, UpstreamError> {
        Self::with_config(url, &HttpClientConfig::default())
    }

    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(
        url: impl Into<String>,
        config: &HttpClientConfig,
    ) -> Result<Self, UpstreamError> {
        Ok(Self { client: build_client(config)?, url: url.into(), page_size: ATTESTATION_PAGE_SIZE })
    }

    /// Overrides the page size; zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lists every attestation made against `schema_id`.
    ///
    /// Pages are requested serially until a page comes back shorter than the page size.
    pub async fn get_attestations(&self, schema_id: &str) -> Result<Vec<Attestation>, UpstreamError> {
        let mut attestations = Vec::new();
        let mut skip = 0usize;

        loop {
            let variables = json!({
                "where": { "schemaId": { "equals": schema_id } },
                "take": self.page_size,
                "skip": skip,
            });
            let page: AttestationsData = self.query(ATTESTATIONS_QUERY, variables).await?;
            let count = page.attestations.len();
            attestations.extend(page.attestations);

            tracing::debug!(schema_id, skip, count, "attestation page");

            if count < self.page_size {
                break;
            }
            skip += self.page_size;
        }

        tracing::info!(schema_id, count = attestations.len(), "attestations fetched");
        Ok(attestations)
    }

    /// Looks up a schema registration.
    ///
    /// # Errors
    /// [`UpstreamError::InvalidResponse`] if the indexer does not know the schema.
    pub async fn get_schema(&self, schema_id: &str) -> Result<SchemaRecord, UpstreamError> {
        let data: SchemaData =
            self.query(SCHEMA_QUERY, json!({ "where": { "id": schema_id } })).await?;
        data.get_schema
            .ok_or_else(|| UpstreamError::InvalidResponse(format!("unknown schema {schema_id}")))
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, UpstreamError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(classify_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::HttpError(status.as_u16(), body));
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(format!("malformed GraphQL body: {e}")))?;

        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(UpstreamError::GraphQl(messages.join("; ")));
        }

        body.data.ok_or_else(|| UpstreamError::InvalidResponse("GraphQL response has no data".into()))
    }
}
