#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Delta log replication between the authority and its consumers.
//!
//! The authority appends every committed batch to its log. Consumers pull
//! suffixes of that log, merge them into a sparse window indexed by log
//! position and collapse them strictly in order. A consumer that falls too
//! far behind replaces its state with a snapshot instead of replaying.

mod authority;
mod client;
mod config;
mod log;
mod replica;

pub use authority::Authority;
pub use client::{AuthorityLink, ConnectionState, LoopbackLink, SyncClient, TransportError};
pub use config::{AuthorityConfig, SkirmishConfig, SyncConfig};
pub use log::DeltaLog;
pub use replica::Replica;
