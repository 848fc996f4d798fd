use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use super::types::{Address, Envelope, ItemHash, Post, Versioned};
use super::LedgerError;

/// The contract a ledger backend has to fulfil
///
/// Everything the rest of the crate knows about the network goes through
/// these six calls. Backends must enforce the owner's security aggregate
/// on every write, and must never retry on their own: transport failures
/// surface as [`LedgerError::Network`] and the caller decides what to do.
#[async_trait]
pub trait LedgerProvider: Send + Sync + std::fmt::Debug {
    /// Read the current version of an aggregate
    ///
    /// # Returns
    /// * `Ok(None)` - The owner never wrote this key
    /// * `Ok(Some(doc))` - The latest document and its version
    async fn aggregate(
        &self,
        owner: &Address,
        key: &str,
    ) -> Result<Option<Versioned<Value>>, LedgerError>;

    /// Write an aggregate
    ///
    /// # Arguments
    /// * `envelope` - Owner, signer and channel of the write
    /// * `key` - The aggregate key under the owner
    /// * `expected` - `Some(version)` to only write if the stored version
    ///   still matches (`Some(0)` for a key that must not exist yet),
    ///   `None` to overwrite unconditionally
    /// * `content` - The full new document
    ///
    /// # Returns
    /// The new version. Fails with [`LedgerError::VersionMismatch`] when
    /// `expected` no longer matches.
    async fn put_aggregate(
        &self,
        envelope: &Envelope,
        key: &str,
        expected: Option<u64>,
        content: Value,
    ) -> Result<u64, LedgerError>;

    /// Create an immutable post
    ///
    /// Posting identical content again returns the existing hash.
    async fn put_post(
        &self,
        envelope: &Envelope,
        post_type: &str,
        content: Value,
    ) -> Result<ItemHash, LedgerError>;

    async fn post(&self, hash: &ItemHash) -> Result<Option<Post>, LedgerError>;

    /// Store opaque bytes and return their content address
    async fn put_blob(&self, envelope: &Envelope, data: Bytes) -> Result<ItemHash, LedgerError>;

    async fn blob(&self, hash: &ItemHash) -> Result<Option<Bytes>, LedgerError>;
}
