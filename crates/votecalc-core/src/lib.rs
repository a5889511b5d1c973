//! # Votecalc Core
//!
//! Core library for computing the outcome of governance proposals decided by on-chain
//! token-weighted votes, off-chain attestation votes, or a hybrid of both.
//!
//! This crate provides:
//!
//! - **[`logs`]**: Resilient `eth_getLogs` retrieval. [`logs::RangeFetcher`] bisects block
//!   ranges the provider rejects; [`logs::PaginatedLogReader`] walks large spans in windows and
//!   topic groups and imposes canonical event ordering.
//!
//! - **[`upstream`]**: JSON-RPC and EAS GraphQL clients plus provider error classification.
//!
//! - **[`events`]**: Casting raw logs and attestations into canonical records.
//!
//! - **[`tally`]**: Basic, Approval and Optimistic calculators and the weighted aggregator that
//!   combines per-category tallies into one verdict.
//!
//! - **[`proposal`]**: Proposal classification (on-chain, off-chain, hybrid), vote grouping and
//!   the calculator that wires tallies together.
//!
//! - **[`store`]**: JSON persistence of events, vote tables and proposal records.
//!
//! - **[`config`]**: Layered configuration.
//!
//! ## Data Flow
//!
//! ```text
//! PaginatedLogReader ──► RawLog stream (ordered) ──► EventCaster ──► VoteRecord table
//!                                                                        │
//! EasClient ──► attestations ──► citizen join ──► VoteRecord table ──────┤
//!                                                                        ▼
//!                                         ProposalRegistry ──► calculate(proposal)
//!                                                                        │
//!                                   Basic / Approval / Optimistic tallies ▼
//!                                                              WeightedAggregator
//!                                                                        │
//!                                                                        ▼
//!                                                                  FinalTally
//! ```

pub mod config;
pub mod events;
pub mod logs;
pub mod proposal;
pub mod store;
pub mod tally;
pub mod types;
pub mod upstream;
pub mod utils;
