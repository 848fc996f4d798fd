use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::provider::LedgerProvider;
use super::schema::{parse_or_default, Parsed, Schema};
use super::types::{Address, Envelope, ItemHash, Versioned};
use super::LedgerError;

/// How many times an update re-reads and re-applies its mutator after
/// losing a compare-and-swap before giving up
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: usize = 5;

/// Typed ledger access on behalf of one owner
///
/// Cloning is cheap and clones share the per-key locks, so every clone
/// of a session's ledger serializes updates to the same key.
#[derive(Debug)]
pub struct Ledger<P> {
    provider: Arc<P>,
    envelope: Envelope,
    max_update_attempts: usize,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl<P> Clone for Ledger<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            envelope: self.envelope.clone(),
            max_update_attempts: self.max_update_attempts,
            locks: self.locks.clone(),
        }
    }
}

impl<P: LedgerProvider> Ledger<P> {
    pub fn new(provider: Arc<P>, envelope: Envelope) -> Self {
        Self {
            provider,
            envelope,
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_max_update_attempts(mut self, attempts: usize) -> Self {
        self.max_update_attempts = attempts.max(1);
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn owner(&self) -> &Address {
        &self.envelope.owner
    }

    async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Read any owner's aggregate without failing on its content
    pub async fn fetch_aggregate_parsed<T: Schema>(
        &self,
        owner: &Address,
        key: &str,
    ) -> Result<Versioned<Parsed<T>>, LedgerError> {
        match self.provider.aggregate(owner, key).await? {
            Some(doc) => Ok(doc.map(|content| parse_or_default(Some(content)))),
            None => Ok(Versioned {
                version: 0,
                content: Parsed::UseDefault,
            }),
        }
    }

    /// Read one of our aggregates
    ///
    /// Returns the schema default when the key was never written and
    /// [`LedgerError::Validation`] when the stored document is malformed.
    pub async fn fetch_aggregate<T: Schema>(&self, key: &str) -> Result<T, LedgerError> {
        let owner = self.envelope.owner.clone();
        self.fetch_aggregate_of(&owner, key).await
    }

    pub async fn fetch_aggregate_of<T: Schema>(
        &self,
        owner: &Address,
        key: &str,
    ) -> Result<T, LedgerError> {
        match self.fetch_aggregate_parsed(owner, key).await?.content {
            Parsed::Ok(value) => Ok(value),
            Parsed::UseDefault => Ok(T::default()),
            Parsed::Invalid(reason) => Err(LedgerError::Validation {
                key: key.to_string(),
                reason,
            }),
        }
    }

    /// Read, mutate and write back an aggregate
    ///
    /// Updates to the same key from this session run one at a time.
    /// Writers from other sessions are detected by compare-and-swap: on a
    /// lost race the document is read again and `mutator` runs again on
    /// the fresh value, so conflict checks inside it always see the
    /// latest state.
    ///
    /// If `mutator` fails nothing is written and its error is returned.
    /// Transport errors are returned as is, without retrying.
    pub async fn update_aggregate<T, E, F>(&self, key: &str, mut mutator: F) -> Result<T, E>
    where
        T: Schema,
        E: From<LedgerError>,
        F: FnMut(T) -> Result<T, E>,
    {
        let _guard = self.lock_key(key).await;

        for attempt in 1..=self.max_update_attempts {
            let owner = self.envelope.owner.clone();
            let current = self.fetch_aggregate_parsed::<T>(&owner, key).await?;
            let value = match current.content {
                Parsed::Ok(value) => value,
                Parsed::UseDefault => T::default(),
                Parsed::Invalid(reason) => {
                    return Err(LedgerError::Validation {
                        key: key.to_string(),
                        reason,
                    }
                    .into())
                }
            };

            let before = serde_json::to_value(&value).map_err(LedgerError::from)?;
            let next = mutator(value)?;
            next.validate().map_err(|reason| LedgerError::Validation {
                key: key.to_string(),
                reason,
            })?;
            let content = serde_json::to_value(&next).map_err(LedgerError::from)?;
            if content == before {
                tracing::debug!(key, version = current.version, "aggregate unchanged, skipping write");
                return Ok(next);
            }

            match self
                .provider
                .put_aggregate(&self.envelope, key, Some(current.version), content)
                .await
            {
                Ok(version) => {
                    tracing::debug!(key, version, attempt, "aggregate updated");
                    return Ok(next);
                }
                Err(LedgerError::VersionMismatch {
                    expected, actual, ..
                }) => {
                    tracing::debug!(
                        key,
                        expected,
                        actual,
                        attempt,
                        "aggregate changed underneath us, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(key, attempts = self.max_update_attempts, "aggregate update gave up");
        Err(LedgerError::StaleWrite {
            key: key.to_string(),
            attempts: self.max_update_attempts,
        }
        .into())
    }

    /// Overwrite an aggregate regardless of what is stored
    pub async fn replace_aggregate<T: Schema>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<u64, LedgerError> {
        value.validate().map_err(|reason| LedgerError::Validation {
            key: key.to_string(),
            reason,
        })?;
        let _guard = self.lock_key(key).await;
        self.provider
            .put_aggregate(&self.envelope, key, None, serde_json::to_value(value)?)
            .await
    }

    pub async fn create_post<T: Serialize>(
        &self,
        post_type: &str,
        content: &T,
    ) -> Result<ItemHash, LedgerError> {
        let hash = self
            .provider
            .put_post(&self.envelope, post_type, serde_json::to_value(content)?)
            .await?;
        tracing::debug!(post_type, %hash, "post created");
        Ok(hash)
    }

    /// Fetch a post and decode its content
    ///
    /// Fails with [`LedgerError::Validation`] if the post has a different
    /// type or its content does not decode as `T`.
    pub async fn fetch_post<T: DeserializeOwned>(
        &self,
        hash: &ItemHash,
        post_type: &str,
    ) -> Result<(Address, T), LedgerError> {
        let post = self
            .provider
            .post(hash)
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.clone()))?;
        if post.post_type != post_type {
            return Err(LedgerError::Validation {
                key: hash.to_string(),
                reason: format!("expected post type {post_type}, found {}", post.post_type),
            });
        }
        let content = serde_json::from_value(post.content).map_err(|e| LedgerError::Validation {
            key: hash.to_string(),
            reason: e.to_string(),
        })?;
        Ok((post.owner, content))
    }

    pub async fn upload_file(&self, data: Bytes) -> Result<ItemHash, LedgerError> {
        let size = data.len();
        let hash = self.provider.put_blob(&self.envelope, data).await?;
        tracing::debug!(%hash, size, "blob stored");
        Ok(hash)
    }

    pub async fn download_file(&self, hash: &ItemHash) -> Result<Bytes, LedgerError> {
        self.provider
            .blob(hash)
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.clone()))
    }
}
