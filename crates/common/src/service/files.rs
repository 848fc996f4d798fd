use std::collections::HashSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;

use super::types::{
    EncryptedFileEntry, EncryptedFileMeta, FailedFile, FileEntriesAggregate, FileEntry,
    FileSource, PendingFile, SaveReport, UploadReport, FILE_ENTRIES_KEY, FILE_POST_TYPE,
};
use super::{BedrockService, FileError};
use crate::crypto::{CryptoError, Iv, SealedBox, Secret};
use crate::drive::{path, DriveFile, PathError};
use crate::ledger::{ItemHash, LedgerProvider, Parsed};

pub(super) fn parse_time(value: &str) -> Result<DateTime<Utc>, CryptoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CryptoError::Encoding(format!("timestamp: {e}")))
}

/// Fields of a metadata post, opened with the file key
pub(super) struct OpenedMeta {
    pub store_hash: ItemHash,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

pub(super) fn open_meta(key: &Secret, meta: &EncryptedFileMeta) -> Result<OpenedMeta, FileError> {
    let store_hash = key
        .open_str(&meta.store_hash)?
        .parse()
        .map_err(|_| FileError::InvalidMeta("store hash".into()))?;
    let size = key
        .open_str(&meta.size)?
        .parse()
        .map_err(|_| FileError::InvalidMeta("size".into()))?;
    let created_at = parse_time(&key.open_str(&meta.created_at)?)?;
    Ok(OpenedMeta {
        store_hash,
        size,
        created_at,
    })
}

/// Recover a file key and IV wrapped for `recipient`
pub(super) fn unwrap_key_iv(
    key: &str,
    iv: &str,
    recipient: &crate::crypto::SecretKey,
) -> Result<(Secret, Iv), CryptoError> {
    let key = Secret::from_slice(&SealedBox::from_hex(key)?.unwrap(recipient)?)?;
    let iv = Iv::from_slice(&SealedBox::from_hex(iv)?.unwrap(recipient)?)?;
    Ok((key, iv))
}

impl<P: LedgerProvider> BedrockService<P> {
    pub(super) fn decrypt_entry(&self, entry: &EncryptedFileEntry) -> Result<FileEntry, CryptoError> {
        let path = self.unwrap_own(&entry.path)?;
        let deleted_at = entry
            .deleted_at
            .as_deref()
            .map(|sealed| self.unwrap_own(sealed).and_then(|t| parse_time(&t)))
            .transpose()?;
        Ok(FileEntry {
            path,
            post_hash: entry.post_hash.clone(),
            deleted_at,
            shared_with: entry.shared_with.clone(),
        })
    }

    /// Decrypted paths of live entries, with their index in `files`
    ///
    /// Entries that cannot be decrypted are skipped. Mutators leave them
    /// untouched.
    pub(super) fn live_paths(&self, files: &[EncryptedFileEntry]) -> Vec<(usize, String)> {
        files
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_live())
            .filter_map(|(i, entry)| match self.unwrap_own(&entry.path) {
                Ok(path) => Some((i, path)),
                Err(e) => {
                    tracing::debug!(post_hash = %entry.post_hash, error = %e, "skipping unreadable entry");
                    None
                }
            })
            .collect()
    }

    pub(super) fn find_live(&self, files: &[EncryptedFileEntry], target: &str) -> Result<usize, FileError> {
        self.live_paths(files)
            .into_iter()
            .find(|(_, path)| path == target)
            .map(|(i, _)| i)
            .ok_or_else(|| FileError::NotFound(target.to_string()))
    }

    async fn fetch_entries_aggregate(&self) -> Result<FileEntriesAggregate, FileError> {
        let owner = self.address().clone();
        let doc = self
            .ledger
            .fetch_aggregate_parsed::<FileEntriesAggregate>(&owner, FILE_ENTRIES_KEY)
            .await?;
        Ok(match doc.content {
            Parsed::Ok(aggregate) => aggregate,
            Parsed::UseDefault => FileEntriesAggregate::default(),
            Parsed::Invalid(reason) => {
                tracing::warn!(%owner, reason, "file entries aggregate is malformed, treating it as empty");
                FileEntriesAggregate::default()
            }
        })
    }

    /// Every entry, live or trashed, whose path we can decrypt
    pub async fn fetch_all_entries(&self) -> Result<Vec<FileEntry>, FileError> {
        let aggregate = self.fetch_entries_aggregate().await?;
        Ok(aggregate
            .files
            .iter()
            .filter_map(|entry| match self.decrypt_entry(entry) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(post_hash = %entry.post_hash, error = %e, "dropping entry that failed to decrypt");
                    None
                }
            })
            .collect())
    }

    /// Entries in the default listing, i.e. not in the trash
    pub async fn fetch_file_entries(&self) -> Result<Vec<FileEntry>, FileError> {
        let mut entries = self.fetch_all_entries().await?;
        entries.retain(|e| e.deleted_at.is_none());
        Ok(entries)
    }

    /// Entries in the trash
    pub async fn fetch_deleted_entries(&self) -> Result<Vec<FileEntry>, FileError> {
        let mut entries = self.fetch_all_entries().await?;
        entries.retain(|e| e.deleted_at.is_some());
        Ok(entries)
    }

    async fn encrypt_and_store(
        &self,
        path: &str,
        content: &Bytes,
    ) -> Result<PendingFile, FileError> {
        let key = Secret::generate()?;
        let iv = Iv::generate()?;
        let encrypted = key.encrypt_file(&iv, content.as_ref())?;
        let store_hash = self.ledger.upload_file(Bytes::from(encrypted)).await?;
        Ok(PendingFile {
            path: path.to_string(),
            key,
            iv,
            store_hash,
            size: content.len() as u64,
            created_at: Utc::now(),
        })
    }

    /// Encrypt and store a batch of files under `directory`
    ///
    /// Files whose path is already taken by a live entry, or appears twice
    /// in the batch, are reported as conflicts without being uploaded.
    /// The others are uploaded concurrently; one failing never affects
    /// the rest. Nothing is added to the drive until the returned files
    /// are passed to [`BedrockService::save_files`].
    pub async fn upload_files(
        &self,
        directory: &str,
        sources: Vec<FileSource>,
    ) -> Result<UploadReport, FileError> {
        let mut taken: HashSet<String> = self
            .fetch_file_entries()
            .await?
            .into_iter()
            .map(|entry| entry.path)
            .collect();

        let mut report = UploadReport::default();
        let mut jobs = Vec::new();
        for source in sources {
            let path = path::join(directory, &source.name);
            if let Err(e) = path::validate_file_path(&path) {
                report.failed.push(FailedFile {
                    path,
                    error: e.into(),
                });
                continue;
            }
            if !taken.insert(path.clone()) {
                tracing::warn!(path, "file already exists, not uploading");
                report.failed.push(FailedFile {
                    path: path.clone(),
                    error: FileError::PathConflict(path),
                });
                continue;
            }
            jobs.push(async move {
                match self.encrypt_and_store(&path, &source.content).await {
                    Ok(pending) => Ok(pending),
                    Err(error) => Err(FailedFile { path, error }),
                }
            });
        }

        for result in join_all(jobs).await {
            match result {
                Ok(pending) => report.uploaded.push(pending),
                Err(failed) => {
                    tracing::warn!(path = failed.path, error = %failed.error, "failed to upload file");
                    report.failed.push(failed);
                }
            }
        }

        tracing::info!(
            directory,
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "upload finished"
        );
        Ok(report)
    }

    async fn post_file_meta(&self, pending: &PendingFile) -> Result<ItemHash, FileError> {
        let public_key = self.public_key();
        let key = &pending.key;
        let meta = EncryptedFileMeta {
            key: SealedBox::wrap(key.bytes(), &public_key)?.to_hex(),
            iv: SealedBox::wrap(pending.iv.bytes(), &public_key)?.to_hex(),
            store_hash: key.seal_str(pending.store_hash.as_str())?,
            size: key.seal_str(&pending.size.to_string())?,
            created_at: key.seal_str(&pending.created_at.to_rfc3339())?,
        };
        Ok(self.ledger.create_post(FILE_POST_TYPE, &meta).await?)
    }

    /// Post the metadata of a pending file and build its aggregate entry
    async fn prepare_entry(&self, pending: &PendingFile) -> Result<EncryptedFileEntry, FileError> {
        path::validate_file_path(&pending.path)?;
        let post_hash = self.post_file_meta(pending).await?;
        Ok(EncryptedFileEntry {
            path: self.wrap_for_self(&pending.path)?,
            post_hash,
            deleted_at: None,
            shared_with: Vec::new(),
        })
    }

    /// Add one uploaded file to the drive
    ///
    /// Fails with [`FileError::PathConflict`] if a live file already has
    /// this path, including one added concurrently by another session.
    pub async fn save_file(&self, pending: &PendingFile) -> Result<FileEntry, FileError> {
        let entry = self.prepare_entry(pending).await?;

        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                let live = self.live_paths(&aggregate.files);
                if live.iter().any(|(_, path)| path == &pending.path) {
                    return Err(FileError::PathConflict(pending.path.clone()));
                }
                aggregate.files.push(entry.clone());
                Ok(aggregate)
            })
            .await?;

        tracing::debug!(path = pending.path, post_hash = %entry.post_hash, "file saved");
        Ok(FileEntry {
            path: pending.path.clone(),
            post_hash: entry.post_hash,
            deleted_at: None,
            shared_with: Vec::new(),
        })
    }

    /// Add a batch of uploaded files in a single aggregate update
    ///
    /// Metadata posts are created concurrently. Files whose post failed or
    /// whose path turned out to be taken are reported in `failed`; the
    /// rest are saved.
    pub async fn save_files(&self, pending: Vec<PendingFile>) -> Result<SaveReport, FileError> {
        let mut report = SaveReport::default();

        let prepared = join_all(pending.iter().map(|p| self.prepare_entry(p))).await;
        let mut candidates = Vec::new();
        for (file, result) in pending.iter().zip(prepared) {
            match result {
                Ok(entry) => candidates.push((file.path.clone(), entry)),
                Err(error) => {
                    tracing::warn!(path = file.path, %error, "failed to save file");
                    report.failed.push(FailedFile {
                        path: file.path.clone(),
                        error,
                    });
                }
            }
        }
        if candidates.is_empty() {
            return Ok(report);
        }

        let mut accepted = Vec::new();
        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                accepted.clear();
                let mut taken: HashSet<String> = self
                    .live_paths(&aggregate.files)
                    .into_iter()
                    .map(|(_, path)| path)
                    .collect();
                for (i, (path, entry)) in candidates.iter().enumerate() {
                    if taken.insert(path.clone()) {
                        aggregate.files.push(entry.clone());
                        accepted.push(i);
                    }
                }
                Ok(aggregate)
            })
            .await?;

        for (i, (path, entry)) in candidates.into_iter().enumerate() {
            if accepted.contains(&i) {
                report.saved.push(FileEntry {
                    path,
                    post_hash: entry.post_hash,
                    deleted_at: None,
                    shared_with: Vec::new(),
                });
            } else {
                tracing::warn!(path, "file already exists, not saved");
                report.failed.push(FailedFile {
                    path: path.clone(),
                    error: FileError::PathConflict(path),
                });
            }
        }
        Ok(report)
    }

    pub(super) async fn load_drive_file(&self, entry: &FileEntry) -> Result<DriveFile, FileError> {
        let (owner, meta) = self
            .ledger
            .fetch_post::<EncryptedFileMeta>(&entry.post_hash, FILE_POST_TYPE)
            .await?;
        if &owner != self.address() {
            return Err(FileError::InvalidMeta(format!(
                "post {} belongs to {owner}",
                entry.post_hash
            )));
        }

        let (key, iv) = unwrap_key_iv(&meta.key, &meta.iv, self.identity.secret_key())?;
        let opened = open_meta(&key, &meta)?;
        Ok(DriveFile {
            path: entry.path.clone(),
            name: path::file_name(&entry.path).to_string(),
            post_hash: entry.post_hash.clone(),
            store_hash: opened.store_hash,
            key,
            iv,
            size: opened.size,
            created_at: opened.created_at,
            deleted_at: entry.deleted_at,
            shared_with: entry.shared_with.iter().map(|s| s.public_key).collect(),
            content: None,
        })
    }

    /// Join entries with their metadata posts
    ///
    /// An entry whose post is missing or unreadable is dropped with a
    /// warning; the others are still returned.
    pub async fn fetch_files_meta(&self, entries: &[FileEntry]) -> Vec<DriveFile> {
        let results = join_all(entries.iter().map(|entry| self.load_drive_file(entry))).await;
        entries
            .iter()
            .zip(results)
            .filter_map(|(entry, result)| match result {
                Ok(file) => Some(file),
                Err(e) => {
                    tracing::warn!(path = entry.path, post_hash = %entry.post_hash, error = %e, "dropping file with unreadable metadata");
                    None
                }
            })
            .collect()
    }

    /// Download and decrypt a file's content
    pub async fn download_file(&self, file: &DriveFile) -> Result<Bytes, FileError> {
        let encrypted = self.ledger.download_file(&file.store_hash).await?;
        Ok(Bytes::from(file.key.decrypt_file(&file.iv, &encrypted)?))
    }

    /// Rename a file; its content and metadata post are untouched
    pub async fn move_file(&self, old_path: &str, new_path: &str) -> Result<(), FileError> {
        path::validate_file_path(new_path)?;
        let sealed = self.wrap_for_self(new_path)?;

        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                let index = self.find_live(&aggregate.files, old_path)?;
                if old_path != new_path
                    && self
                        .live_paths(&aggregate.files)
                        .iter()
                        .any(|(_, path)| path == new_path)
                {
                    return Err(FileError::PathConflict(new_path.to_string()));
                }
                aggregate.files[index].path = sealed.clone();
                Ok(aggregate)
            })
            .await?;
        tracing::debug!(old_path, new_path, "file moved");
        Ok(())
    }

    /// Move every live file under `old_dir` to `new_dir`
    ///
    /// All renames land in one aggregate write. If any destination is
    /// taken by a file outside the folder, nothing moves.
    ///
    /// # Returns
    /// `(old_path, new_path)` for every moved file
    pub async fn move_folder(
        &self,
        old_dir: &str,
        new_dir: &str,
    ) -> Result<Vec<(String, String)>, FileError> {
        let old_dir = path::normalize_dir(old_dir);
        let new_dir = path::normalize_dir(new_dir);
        if new_dir.starts_with(&old_dir) {
            return Err(PathError::MoveIntoSelf {
                from: old_dir,
                to: new_dir,
            }
            .into());
        }

        let mut pairs = Vec::new();
        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                pairs.clear();
                let live = self.live_paths(&aggregate.files);
                let staying: HashSet<&str> = live
                    .iter()
                    .filter(|(_, path)| !path::is_within(path, &old_dir))
                    .map(|(_, path)| path.as_str())
                    .collect();

                for (index, old_path) in &live {
                    let Some(new_path) = path::rebase(old_path, &old_dir, &new_dir) else {
                        continue;
                    };
                    path::validate_file_path(&new_path)?;
                    if staying.contains(new_path.as_str()) {
                        return Err(FileError::PathConflict(new_path));
                    }
                    aggregate.files[*index].path = self.wrap_for_self(&new_path)?;
                    pairs.push((old_path.clone(), new_path));
                }
                Ok(aggregate)
            })
            .await?;

        tracing::debug!(old_dir, new_dir, moved = pairs.len(), "folder moved");
        Ok(pairs)
    }

    /// Move files to the trash
    ///
    /// The deletion time is recorded, encrypted, on the aggregate entry.
    /// Content and metadata stay where they are and can be restored.
    ///
    /// # Returns
    /// The post hashes of the trashed files
    pub async fn soft_delete_files(
        &self,
        paths: &[String],
        at: DateTime<Utc>,
    ) -> Result<Vec<ItemHash>, FileError> {
        let sealed_at = self.wrap_for_self(&at.to_rfc3339())?;

        let mut hashes = Vec::new();
        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                hashes.clear();
                for target in paths {
                    let index = self.find_live(&aggregate.files, target)?;
                    aggregate.files[index].deleted_at = Some(sealed_at.clone());
                    hashes.push(aggregate.files[index].post_hash.clone());
                }
                Ok(aggregate)
            })
            .await?;
        Ok(hashes)
    }

    /// Bring a trashed file back
    ///
    /// Fails with [`FileError::PathConflict`] if a live file has taken
    /// its path in the meantime.
    pub async fn restore_file(&self, target: &str) -> Result<(), FileError> {
        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                let mut trashed = None;
                for (i, entry) in aggregate.files.iter().enumerate() {
                    let Ok(path) = self.unwrap_own(&entry.path) else {
                        continue;
                    };
                    if path != target {
                        continue;
                    }
                    if entry.is_live() {
                        return Err(FileError::PathConflict(target.to_string()));
                    }
                    trashed.get_or_insert(i);
                }
                let index = trashed.ok_or_else(|| FileError::NotFound(target.to_string()))?;
                aggregate.files[index].deleted_at = None;
                Ok(aggregate)
            })
            .await?;
        Ok(())
    }

    /// Remove entries from the drive for good
    ///
    /// This only revokes the mapping from path to content. Content
    /// addressed storage is immutable: the encrypted blob and the
    /// metadata post remain on the network, unreadable without the key
    /// but not erased.
    pub async fn hard_delete_files(&self, post_hashes: &[ItemHash]) -> Result<(), FileError> {
        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                for hash in post_hashes {
                    if !aggregate.files.iter().any(|e| &e.post_hash == hash) {
                        return Err(FileError::NotFound(hash.to_string()));
                    }
                }
                aggregate.files.retain(|e| !post_hashes.contains(&e.post_hash));
                Ok(aggregate)
            })
            .await?;
        tracing::info!(count = post_hashes.len(), "files removed, stored content is orphaned");
        Ok(())
    }

    /// Copy a file to `new_path`, sharing its stored content
    pub async fn duplicate_file(&self, old_path: &str, new_path: &str) -> Result<FileEntry, FileError> {
        let entry = self
            .fetch_file_entries()
            .await?
            .into_iter()
            .find(|e| e.path == old_path)
            .ok_or_else(|| FileError::NotFound(old_path.to_string()))?;
        let original = self.load_drive_file(&entry).await?;

        let copy = PendingFile {
            path: new_path.to_string(),
            key: original.key,
            iv: original.iv,
            store_hash: original.store_hash,
            size: original.size,
            created_at: Utc::now(),
        };
        self.save_file(&copy).await
    }

    /// Replace a file's content
    ///
    /// Posts are immutable, so this stores new content under a fresh key,
    /// creates a new metadata post and swaps the entry over to it. Shares
    /// of the old version are not carried over.
    pub async fn replace_file_content(
        &self,
        target: &str,
        content: Bytes,
    ) -> Result<FileEntry, FileError> {
        let current = self
            .fetch_file_entries()
            .await?
            .into_iter()
            .find(|e| e.path == target)
            .ok_or_else(|| FileError::NotFound(target.to_string()))?;

        let pending = self.encrypt_and_store(target, &content).await?;
        let replacement = self.prepare_entry(&pending).await?;

        self.ledger
            .update_aggregate(FILE_ENTRIES_KEY, |mut aggregate: FileEntriesAggregate| -> Result<_, FileError> {
                let index = aggregate
                    .files
                    .iter()
                    .position(|e| e.is_live() && e.post_hash == current.post_hash)
                    .ok_or_else(|| FileError::NotFound(target.to_string()))?;
                aggregate.files[index] = replacement.clone();
                Ok(aggregate)
            })
            .await?;

        Ok(FileEntry {
            path: target.to_string(),
            post_hash: replacement.post_hash,
            deleted_at: None,
            shared_with: Vec::new(),
        })
    }

    /// Forget every file entry
    pub async fn reset_files(&self) -> Result<(), FileError> {
        self.ledger
            .replace_aggregate(FILE_ENTRIES_KEY, &FileEntriesAggregate::default())
            .await?;
        Ok(())
    }
}
