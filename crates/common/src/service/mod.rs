//! Bedrock session: encrypted files, contacts and sharing on top of a ledger
//!
//! A [`BedrockService`] is opened once per wallet session. Opening it
//! derives the sub-identity from a wallet signature and makes sure that
//! identity is authorized to write on the wallet's behalf. From then on
//! every write is signed by the sub-identity and lands under the wallet
//! address.
//!
//! # Consistency
//!
//! The file and contact aggregates are the only shared mutable state.
//! Every change to them goes through [`Ledger::update_aggregate`], whose
//! mutator re-checks invariants (unique paths, unique contacts) against
//! the freshest document on each attempt. Losing a race therefore either
//! retries or fails with an explicit conflict, never a silent overwrite.

mod authorization;
mod contacts;
mod error;
mod files;
mod sharing;
mod sync;
mod types;

use std::sync::Arc;

use crate::config::BedrockConfig;
use crate::crypto::{CryptoError, PublicKey, SealedBox, SubIdentity, Wallet};
use crate::ledger::{Address, Envelope, Ledger, LedgerProvider};

pub use authorization::{ensure_authorization, AuthorizationOutcome};
pub use error::{ContactError, FileError, ServiceError};
pub use sync::DriveSync;
pub use types::{
    Contact, ContactsAggregate, EncryptedContact, EncryptedFileEntry, EncryptedFileMeta,
    EncryptedShare, FailedFile, FileEntriesAggregate, FileEntry, FileSource, PendingFile,
    SaveReport, SharedWith, UploadReport, CONTACTS_KEY, FILE_ENTRIES_KEY, FILE_POST_TYPE,
    SHARE_POST_TYPE,
};

#[derive(Debug)]
pub struct BedrockService<P> {
    ledger: Ledger<P>,
    identity: SubIdentity,
    authorization: AuthorizationOutcome,
}

impl<P: LedgerProvider> BedrockService<P> {
    /// Open a session for `wallet`
    pub async fn connect<W>(
        wallet: &W,
        provider: Arc<P>,
        config: &BedrockConfig,
    ) -> Result<Self, ServiceError>
    where
        W: Wallet + ?Sized,
    {
        let identity = SubIdentity::derive(wallet).await?;
        let owner = wallet.address();

        let owner_ledger = Ledger::new(
            provider.clone(),
            Envelope::new(owner.clone(), owner.clone(), config.channel.clone()),
        )
        .with_max_update_attempts(config.max_update_attempts);
        let authorization = ensure_authorization(&owner_ledger, &identity.address()).await?;

        let ledger = Ledger::new(
            provider,
            Envelope::new(owner.clone(), identity.address(), config.channel.clone()),
        )
        .with_max_update_attempts(config.max_update_attempts);

        tracing::info!(
            %owner,
            delegate = %identity.address(),
            ?authorization,
            "bedrock session opened"
        );
        Ok(Self {
            ledger,
            identity,
            authorization,
        })
    }

    /// The wallet address all data is stored under
    pub fn address(&self) -> &Address {
        self.ledger.owner()
    }

    /// Address of the sub-identity that signs writes
    pub fn delegate_address(&self) -> Address {
        self.identity.address()
    }

    /// The key contacts need to share files with us
    pub fn public_key(&self) -> PublicKey {
        self.identity.public_key()
    }

    pub fn ledger(&self) -> &Ledger<P> {
        &self.ledger
    }

    pub fn authorization(&self) -> AuthorizationOutcome {
        self.authorization
    }

    /// Wrap a value so only this session's identity can read it
    fn wrap_for_self(&self, value: &str) -> Result<String, CryptoError> {
        SealedBox::wrap_str(value, &self.identity.public_key())
    }

    fn unwrap_own(&self, hex: &str) -> Result<String, CryptoError> {
        SealedBox::unwrap_str(hex, self.identity.secret_key())
    }
}
