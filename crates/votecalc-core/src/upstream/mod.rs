//! Upstream transports: the JSON-RPC node used for logs and governor reads, and the EAS
//! GraphQL indexer used for attestations.

pub mod eas_client;
pub mod errors;
pub mod governor;
pub mod http_client;

pub use eas_client::{Attestation, EasClient, SchemaRecord, ATTESTATION_PAGE_SIZE};
pub use errors::{RpcErrorCategory, UpstreamError};
pub use governor::{GovernorReader, OnChainPools};
pub use http_client::{HttpClientConfig, JsonRpcClient};
