//! Documents stored on the ledger and their decrypted counterparts
//!
//! Everything that would reveal the structure of a drive is encrypted
//! before it leaves the client:
//!
//! - paths, trash timestamps and contact names are wrapped for the
//!   owner's own public key
//! - file keys and IVs are wrapped for the owner (or for a contact, in
//!   share posts)
//! - the remaining metadata is sealed under the file's own key
//!
//! Only content addresses, public keys and wallet addresses are stored in
//! the clear.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{Iv, PublicKey, Secret};
use crate::ledger::{Address, ItemHash, Schema};

use super::FileError;

pub const FILE_ENTRIES_KEY: &str = "bedrock_file_entries";
pub const CONTACTS_KEY: &str = "bedrock_contacts";
pub const FILE_POST_TYPE: &str = "bedrock_file";
pub const SHARE_POST_TYPE: &str = "bedrock_file_share";

/// A contact a file has been shared with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedWith {
    pub public_key: PublicKey,
    /// The share post holding the file key wrapped for `public_key`
    pub share_hash: ItemHash,
}

/// One file in the `bedrock_file_entries` aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedFileEntry {
    /// Path wrapped for the owner
    pub path: String,
    pub post_hash: ItemHash,
    /// Deletion time wrapped for the owner. Present only for trashed files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub shared_with: Vec<SharedWith>,
}

impl EncryptedFileEntry {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEntriesAggregate {
    #[serde(default)]
    pub files: Vec<EncryptedFileEntry>,
}

/// Entries are checked one at a time when they are decrypted, so a
/// corrupt entry never makes the rest of the drive unreadable
impl Schema for FileEntriesAggregate {}

/// Content of a `bedrock_file` post
///
/// Immutable once posted. The path is deliberately not part of it: it
/// lives in the aggregate entry, so moves never touch the post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedFileMeta {
    /// File key wrapped for the owner
    pub key: String,
    /// File IV wrapped for the owner
    pub iv: String,
    // sealed under the file key
    pub store_hash: String,
    pub size: String,
    pub created_at: String,
}

/// Content of a `bedrock_file_share` post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedShare {
    /// The shared file's metadata post
    pub post_hash: ItemHash,
    /// File key wrapped for the recipient
    pub key: String,
    /// File IV wrapped for the recipient
    pub iv: String,
    /// Path at the time of sharing, sealed under the file key
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContact {
    /// Name wrapped for the owner
    pub name: String,
    pub address: Address,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactsAggregate {
    #[serde(default)]
    pub contacts: Vec<EncryptedContact>,
}

impl Schema for ContactsAggregate {}

/// A decrypted aggregate entry
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub post_hash: ItemHash,
    pub deleted_at: Option<DateTime<Utc>>,
    pub shared_with: Vec<SharedWith>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub address: Address,
    pub public_key: PublicKey,
}

/// Raw input to an upload
#[derive(Debug, Clone)]
pub struct FileSource {
    pub name: String,
    pub content: Bytes,
}

impl FileSource {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A file whose encrypted content is stored but which has no entry yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFile {
    pub path: String,
    pub key: Secret,
    pub iv: Iv,
    pub store_hash: ItemHash,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FailedFile {
    pub path: String,
    pub error: FileError,
}

/// Result of a batch upload
///
/// A non-empty `failed` list means a partial failure: everything in
/// `uploaded` still went through.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<PendingFile>,
    pub failed: Vec<FailedFile>,
}

#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<FileEntry>,
    pub failed: Vec<FailedFile>,
}
