//! Mock Infrastructure for Testing votecalc
//!
//! Reusable mock types for exercising upstream interactions without real network
//! connections.
//!
//! ## Components
//!
//! - `RpcMockBuilder`: Wraps mockito to provide Ethereum JSON-RPC mocking
//! - `EasMockBuilder`: Wraps mockito to serve EAS GraphQL attestation pages
//! - `LimitedLogSource`: In-memory `LogSource` that rejects ranges wider than a limit
//! - Test helpers for logs, events and attestations
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{create_test_log, RpcMockBuilder};
//!
//! let mut mock = RpcMockBuilder::new().await;
//! mock.mock_get_logs(&[create_test_log(100, 0, 0)]);
//!
//! // Use mock.url() to connect a JsonRpcClient
//! ```

pub mod eas_mock;
pub mod limited_source;

pub use eas_mock::EasMockBuilder;
pub use limited_source::LimitedLogSource;
pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
