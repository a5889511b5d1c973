//! Small parsing helpers shared by the log and event layers.
//!
//! ## Block Parameter Parsing (`block_param`)
//! - Block tags ("latest", "earliest", ...) and hex/decimal quantities
//! - Hex quantity formatting for outgoing `eth_getLogs` filters

pub mod block_param;

pub use block_param::{BlockParameter, BlockRef, BlockTag, ParseError as BlockParseError};
