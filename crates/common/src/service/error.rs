use crate::crypto::{CryptoError, IdentityError, PublicKey};
use crate::drive::PathError;
use crate::ledger::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// A live file already exists at the target path
    #[error("a file already exists at {0}")]
    PathConflict(String),
    #[error("no file at {0}")]
    NotFound(String),
    #[error("file {path} is already shared with {public_key}")]
    AlreadyShared { path: String, public_key: PublicKey },
    #[error("file {path} is not shared with {public_key}")]
    NotShared { path: String, public_key: PublicKey },
    #[error("invalid file metadata: {0}")]
    InvalidMeta(String),
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("a contact named {0} already exists")]
    DuplicateName(String),
    #[error("a contact with public key {0} already exists")]
    DuplicatePublicKey(PublicKey),
    #[error("no contact with public key {0}")]
    NotFound(PublicKey),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Failure to open a session
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
