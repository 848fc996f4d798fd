//! Client side of the decentralized message network
//!
//! The network offers three primitives:
//!
//! - **Aggregates**: one mutable JSON document per (owner, key), written
//!   with compare-and-swap on a version number
//! - **Posts**: immutable JSON records addressed by the hash of their content
//! - **Blobs**: opaque bytes addressed by their SHA-256 digest
//!
//! [`LedgerProvider`] is the backend contract. [`Ledger`] layers typed
//! documents, per-key serialization and the retry loop on top of it.
//! [`MemoryLedger`] and [`FsLedger`] are local emulations of the network.

mod client;
mod fs;
mod memory;
mod provider;
mod schema;
pub mod security;
mod types;

pub use client::{Ledger, DEFAULT_MAX_UPDATE_ATTEMPTS};
pub use fs::FsLedger;
pub use memory::MemoryLedger;
pub use provider::LedgerProvider;
pub use schema::{parse_or_default, Parsed, Schema};
pub use security::{Authorization, SecurityAggregate, SECURITY_KEY};
pub use types::{Address, Envelope, ItemHash, MessageKind, Post, Versioned, ITEM_HASH_LEN};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Transport failure, safe to retry at the caller's discretion
    #[error("network error: {0}")]
    Network(#[from] anyhow::Error),
    #[error("document {key} failed validation: {reason}")]
    Validation { key: String, reason: String },
    /// A compare-and-swap lost against a concurrent writer
    #[error("version mismatch on {key}: expected {expected}, found {actual}")]
    VersionMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error("gave up updating {key} after {attempts} conflicting attempts")]
    StaleWrite { key: String, attempts: usize },
    #[error("item not found: {0}")]
    NotFound(ItemHash),
    #[error("{signer} is not authorized to write {kind} messages for {owner}")]
    Unauthorized {
        signer: Address,
        owner: Address,
        kind: MessageKind,
    },
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("invalid item hash: {0}")]
    InvalidHash(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid aggregate key: {0}")]
    InvalidKey(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether the failure came from the transport rather than from the
    /// content of the request
    pub fn is_transport(&self) -> bool {
        matches!(self, LedgerError::Network(_) | LedgerError::Io(_))
    }
}

/// Aggregate keys double as file names in [`FsLedger`], so they are kept
/// to a conservative character set everywhere
pub(crate) fn validate_key(key: &str) -> Result<(), LedgerError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
        && !key.starts_with('.');
    if !valid {
        return Err(LedgerError::InvalidKey(key.to_string()));
    }
    Ok(())
}
