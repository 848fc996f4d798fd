use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::provider::LedgerProvider;
use super::security::{check_write, SECURITY_KEY};
use super::types::{Address, Envelope, ItemHash, MessageKind, Post, Versioned};
use super::{validate_key, LedgerError};

/// Ledger emulation on the local filesystem
///
/// # Layout
///
/// ```text
/// <root>/
///   aggregates/<owner>/<key>.json   versioned document
///   posts/<item_hash>.json          immutable post
///   blobs/<item_hash>               raw bytes
/// ```
///
/// Writes land in a temporary file first and are renamed into place.
/// Compare-and-swap is serialized by a lock held by this handle, so
/// separate processes sharing one root are not protected from each other.
#[derive(Debug, Clone)]
pub struct FsLedger {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FsLedger {
    /// Open a ledger rooted at `root`, creating the layout if needed
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let root = root.as_ref().to_path_buf();
        for dir in ["aggregates", "posts", "blobs"] {
            tokio::fs::create_dir_all(root.join(dir)).await?;
        }
        tracing::debug!(root = %root.display(), "opened filesystem ledger");
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn aggregate_path(&self, owner: &Address, key: &str) -> PathBuf {
        self.root
            .join("aggregates")
            .join(owner.as_str())
            .join(format!("{key}.json"))
    }

    fn post_path(&self, hash: &ItemHash) -> PathBuf {
        self.root.join("posts").join(format!("{hash}.json"))
    }

    fn blob_path(&self, hash: &ItemHash) -> PathBuf {
        self.root.join("blobs").join(hash.as_str())
    }

    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, LedgerError> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LedgerError> {
        match Self::read_bytes(path).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LedgerError> {
        Self::write_atomic(path, &serde_json::to_vec_pretty(value)?).await
    }

    async fn security(&self, owner: &Address) -> Result<Option<Value>, LedgerError> {
        let doc: Option<Versioned<Value>> =
            Self::read_json(&self.aggregate_path(owner, SECURITY_KEY)).await?;
        Ok(doc.map(|d| d.content))
    }
}

#[async_trait]
impl LedgerProvider for FsLedger {
    async fn aggregate(
        &self,
        owner: &Address,
        key: &str,
    ) -> Result<Option<Versioned<Value>>, LedgerError> {
        validate_key(key)?;
        Self::read_json(&self.aggregate_path(owner, key)).await
    }

    async fn put_aggregate(
        &self,
        envelope: &Envelope,
        key: &str,
        expected: Option<u64>,
        content: Value,
    ) -> Result<u64, LedgerError> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        check_write(
            self.security(&envelope.owner).await?,
            envelope,
            MessageKind::Aggregate,
            key,
        )?;

        let path = self.aggregate_path(&envelope.owner, key);
        let current: Option<Versioned<Value>> = Self::read_json(&path).await?;
        let actual = current.map(|d| d.version).unwrap_or(0);
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
        Self::write_json(&path, &Versioned { version, content }).await?;
        Ok(version)
    }

    async fn put_post(
        &self,
        envelope: &Envelope,
        post_type: &str,
        content: Value,
    ) -> Result<ItemHash, LedgerError> {
        let _guard = self.write_lock.lock().await;
        check_write(
            self.security(&envelope.owner).await?,
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
        let path = self.post_path(&hash);
        if tokio::fs::try_exists(&path).await? {
            return Ok(hash);
        }
        Self::write_json(&path, &post).await?;
        Ok(hash)
    }

    async fn post(&self, hash: &ItemHash) -> Result<Option<Post>, LedgerError> {
        Self::read_json(&self.post_path(hash)).await
    }

    async fn put_blob(&self, envelope: &Envelope, data: Bytes) -> Result<ItemHash, LedgerError> {
        let _guard = self.write_lock.lock().await;
        check_write(
            self.security(&envelope.owner).await?,
            envelope,
            MessageKind::Store,
            "",
        )?;

        let hash = ItemHash::digest(&data);
        let path = self.blob_path(&hash);
        if !tokio::fs::try_exists(&path).await? {
            Self::write_atomic(&path, &data).await?;
        }
        Ok(hash)
    }

    async fn blob(&self, hash: &ItemHash) -> Result<Option<Bytes>, LedgerError> {
        Ok(Self::read_bytes(&self.blob_path(hash)).await?.map(Bytes::from))
    }
}
