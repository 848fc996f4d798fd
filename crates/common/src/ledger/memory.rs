use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::Value;

use super::provider::LedgerProvider;
use super::security::{check_write, SECURITY_KEY};
use super::types::{Address, Envelope, ItemHash, MessageKind, Post, Versioned};
use super::{validate_key, LedgerError};

/// In-memory ledger
///
/// Every call yields to the scheduler once before touching state, the
/// way a network round trip would, so concurrent sessions interleave
/// their reads and writes. Supports fault injection for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<MemoryLedgerInner>>,
}

#[derive(Debug, Default)]
struct MemoryLedgerInner {
    aggregates: HashMap<(Address, String), Versioned<Value>>,
    posts: HashMap<ItemHash, Post>,
    blobs: HashMap<ItemHash, Bytes>,
    /// Every call fails with a network error while set
    offline: bool,
    /// Blob uploads above this size are rejected
    max_blob_size: Option<usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_blob_size(self, limit: usize) -> Self {
        self.inner.write().max_blob_size = Some(limit);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.write().offline = offline;
    }

    pub fn blob_count(&self) -> usize {
        self.inner.read().blobs.len()
    }

    pub fn post_count(&self) -> usize {
        self.inner.read().posts.len()
    }

    async fn round_trip(&self) -> Result<(), LedgerError> {
        tokio::task::yield_now().await;
        if self.inner.read().offline {
            return Err(anyhow::anyhow!("ledger unreachable").into());
        }
        Ok(())
    }
}

impl MemoryLedgerInner {
    fn security(&self, owner: &Address) -> Option<Value> {
        self.aggregates
            .get(&(owner.clone(), SECURITY_KEY.to_string()))
            .map(|doc| doc.content.clone())
    }
}

#[async_trait]
impl LedgerProvider for MemoryLedger {
    async fn aggregate(
        &self,
        owner: &Address,
        key: &str,
    ) -> Result<Option<Versioned<Value>>, LedgerError> {
        self.round_trip().await?;
        let inner = self.inner.read();
        Ok(inner
            .aggregates
            .get(&(owner.clone(), key.to_string()))
            .cloned())
    }

    async fn put_aggregate(
        &self,
        envelope: &Envelope,
        key: &str,
        expected: Option<u64>,
        content: Value,
    ) -> Result<u64, LedgerError> {
        validate_key(key)?;
        self.round_trip().await?;
        let mut inner = self.inner.write();
        check_write(
            inner.security(&envelope.owner),
            envelope,
            MessageKind::Aggregate,
            key,
        )?;

        let slot = (envelope.owner.clone(), key.to_string());
        let actual = inner.aggregates.get(&slot).map(|d| d.version).unwrap_or(0);
        if let Some(expected) = expected {
            if expected != actual {
                return Err(LedgerError::VersionMismatch {
                    key: key.to_string(),
                    expected,
                    actual,
                });
            }
        }

        let version = actual + 1;
        inner.aggregates.insert(slot, Versioned { version, content });
        tracing::trace!(owner = %envelope.owner, key, version, "memory ledger aggregate written");
        Ok(version)
    }

    async fn put_post(
        &self,
        envelope: &Envelope,
        post_type: &str,
        content: Value,
    ) -> Result<ItemHash, LedgerError> {
        self.round_trip().await?;
        let mut inner = self.inner.write();
        check_write(
            inner.security(&envelope.owner),
            envelope,
            MessageKind::Post,
            post_type,
        )?;

        let post = Post {
            owner: envelope.owner.clone(),
            post_type: post_type.to_string(),
            content,
        };
        let hash = post.item_hash()?;
        inner.posts.entry(hash.clone()).or_insert(post);
        Ok(hash)
    }

    async fn post(&self, hash: &ItemHash) -> Result<Option<Post>, LedgerError> {
        self.round_trip().await?;
        Ok(self.inner.read().posts.get(hash).cloned())
    }

    async fn put_blob(&self, envelope: &Envelope, data: Bytes) -> Result<ItemHash, LedgerError> {
        self.round_trip().await?;
        let mut inner = self.inner.write();
        check_write(
            inner.security(&envelope.owner),
            envelope,
            MessageKind::Store,
            "",
        )?;

        if let Some(limit) = inner.max_blob_size {
            if data.len() > limit {
                return Err(LedgerError::PayloadTooLarge {
                    size: data.len(),
                    limit,
                });
            }
        }

        let hash = ItemHash::digest(&data);
        inner.blobs.entry(hash.clone()).or_insert(data);
        Ok(hash)
    }

    async fn blob(&self, hash: &ItemHash) -> Result<Option<Bytes>, LedgerError> {
        self.round_trip().await?;
        Ok(self.inner.read().blobs.get(hash).cloned())
    }
}
