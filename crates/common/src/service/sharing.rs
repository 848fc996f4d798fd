//! Sharing files with contacts
//!
//! A share is a `bedrock_file_share` post holding the file key and IV
//! wrapped for the contact's public key. The owner's aggregate entry
//! records which keys a file is shared with and where their share post
//! lives; recipients discover files by reading that aggregate.
//!
//! Unsharing removes the record but cannot take back a key the contact
//! has already seen. Re-encrypting under a fresh key is done with
//! [`BedrockService::replace_file_content`].

use futures::future::join_all;

use super::files::{open_meta, unwrap_key_iv};
use super::types::{
    Contact, EncryptedFileEntry, EncryptedFileMeta, EncryptedShare, FileEntriesAggregate,
    SharedWith, FILE_ENTRIES_KEY, FILE_POST_TYPE, SHARE_POST_TYPE,
};
use super::{BedrockService, FileError};
use crate::crypto::{PublicKey, SealedBox};
use crate::drive::{path, DriveFile};
use crate::ledger::{Address, ItemHash, LedgerProvider, Parsed};

impl<P: LedgerProvider> BedrockService<P> {
    /// Share the live file at `file_path` with `contact`
    ///
    /// # Returns
    /// The hash of the share post
    pub async fn share_file(&self, file_path: &str, contact: &Contact) -> Result<ItemHash, FileError> {
        let entry = self
            .fetch_file_entries()
            .await?
            .into_iter()
            .find(|e| e.path == file_path)
            .ok_or_else(|| FileError::NotFound(file_path.to_string()))?;
        let already_shared = || FileError::AlreadyShared {
            path: file_path.to_string(),
            public_key: contact.public_key,
        };
        if entry.shared_with.iter().any(|s| s.public_key == contact.public_key) {
            return Err(already_shared());
        }

        let file = self.load_drive_file(&entry).await?;
        let share = EncryptedShare {
            post_hash: entry.post_hash.clone(),
            key: SealedBox::wrap(file.key.bytes(), &contact.public_key)?.to_hex(),
            iv: SealedBox::wrap(file.iv.bytes(), &contact.public_key)?.to_hex(),
            path: file.key.seal_str(file_path)?,
        };
        let share_hash = self.ledger.create_post(SHARE_POST_TYPE, &share).await?;

        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                let index = self.find_live(&aggregate.files, file_path)?;
                let target: &mut EncryptedFileEntry = &mut aggregate.files[index];
                if target.post_hash != entry.post_hash {
                    // replaced while we were building the share
                    return Err(FileError::NotFound(file_path.to_string()));
                }
                if target.shared_with.iter().any(|s| s.public_key == contact.public_key) {
                    return Err(already_shared());
                }
                target.shared_with.push(SharedWith {
                    public_key: contact.public_key,
                    share_hash: share_hash.clone(),
                });
                Ok(aggregate)
            })
            .await?;

        tracing::info!(
            path = file_path,
            contact = %contact.address,
            %share_hash,
            "file shared"
        );
        Ok(share_hash)
    }

    /// Stop listing the file for `public_key`
    pub async fn unshare_file(&self, file_path: &str, public_key: &PublicKey) -> Result<(), FileError> {
        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                let index = self.find_live(&aggregate.files, file_path)?;
                let shared_with = &mut aggregate.files[index].shared_with;
                let position = shared_with
                    .iter()
                    .position(|s| &s.public_key == public_key)
                    .ok_or_else(|| FileError::NotShared {
                        path: file_path.to_string(),
                        public_key: *public_key,
                    })?;
                shared_with.remove(position);
                Ok(aggregate)
            })
            .await?;
        tracing::info!(path = file_path, %public_key, "file unshared");
        Ok(())
    }

    /// Files `contact` has shared with us
    ///
    /// Paths are the ones the owner had when sharing. Shares that fail to
    /// resolve are skipped with a warning.
    pub async fn fetch_files_shared_by(&self, contact: &Contact) -> Result<Vec<DriveFile>, FileError> {
        let doc = self
            .ledger
            .fetch_aggregate_parsed::<FileEntriesAggregate>(&contact.address, FILE_ENTRIES_KEY)
            .await?;
        let aggregate = match doc.content {
            Parsed::Ok(aggregate) => aggregate,
            Parsed::UseDefault => return Ok(Vec::new()),
            Parsed::Invalid(reason) => {
                tracing::warn!(owner = %contact.address, reason, "contact's file entries are malformed");
                return Ok(Vec::new());
            }
        };

        let me = self.public_key();
        let shares: Vec<(ItemHash, ItemHash)> = aggregate
            .files
            .iter()
            .filter(|entry| entry.is_live())
            .filter_map(|entry| {
                entry
                    .shared_with
                    .iter()
                    .find(|s| s.public_key == me)
                    .map(|s| (entry.post_hash.clone(), s.share_hash.clone()))
            })
            .collect();

        let results = join_all(
            shares
                .iter()
                .map(|(post_hash, share_hash)| self.load_shared_file(&contact.address, post_hash, share_hash)),
        )
        .await;

        Ok(shares
            .iter()
            .zip(results)
            .filter_map(|((_, share_hash), result)| match result {
                Ok(file) => Some(file),
                Err(e) => {
                    tracing::warn!(owner = %contact.address, %share_hash, error = %e, "skipping unreadable share");
                    None
                }
            })
            .collect())
    }

    async fn load_shared_file(
        &self,
        owner: &Address,
        post_hash: &ItemHash,
        share_hash: &ItemHash,
    ) -> Result<DriveFile, FileError> {
        let (share_owner, share) = self
            .ledger
            .fetch_post::<EncryptedShare>(share_hash, SHARE_POST_TYPE)
            .await?;
        if &share_owner != owner || &share.post_hash != post_hash {
            return Err(FileError::InvalidMeta(format!(
                "share {share_hash} does not belong to post {post_hash} of {owner}"
            )));
        }
        let (key, iv) = unwrap_key_iv(&share.key, &share.iv, self.identity.secret_key())?;

        let (meta_owner, meta) = self
            .ledger
            .fetch_post::<EncryptedFileMeta>(post_hash, FILE_POST_TYPE)
            .await?;
        if &meta_owner != owner {
            return Err(FileError::InvalidMeta(format!(
                "post {post_hash} belongs to {meta_owner}"
            )));
        }
        let opened = open_meta(&key, &meta)?;
        let shared_path = key.open_str(&share.path)?;

        Ok(DriveFile {
            name: path::file_name(&shared_path).to_string(),
            path: shared_path,
            post_hash: post_hash.clone(),
            store_hash: opened.store_hash,
            key,
            iv,
            size: opened.size,
            created_at: opened.created_at,
            deleted_at: None,
            shared_with: Vec::new(),
            content: None,
        })
    }
}
