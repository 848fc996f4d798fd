//! Wallet boundary and sub-identity derivation
//!
//! The primary wallet is only asked for one signature per session, over a
//! fixed message. The Keccak-256 digest of that signature seeds the
//! sub-identity keypair, which then signs every ledger write and unwraps
//! every secret. Signing the same message with the same wallet always
//! yields the same sub-identity, so nothing but the wallet has to be kept
//! between sessions.

use async_trait::async_trait;
use sha3::{Digest, Keccak256};

use super::keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE};
use crate::ledger::Address;

/// Message signed by the wallet to derive the sub-identity.
///
/// Changing it changes every derived key, which makes all previously
/// stored data unreadable.
pub const BEDROCK_MESSAGE: &str = "Bedrock.im";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("wallet refused to sign: {0}")]
    Signature(#[source] anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

/// What the core needs from the external wallet layer
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, IdentityError>;
}

/// Wallet backed by a local Ed25519 key
///
/// Ed25519 signatures are deterministic, which the derivation requires.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    key: SecretKey,
}

impl LocalWallet {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    pub fn generate() -> Result<Self, IdentityError> {
        Ok(Self::new(SecretKey::generate()?))
    }

    pub fn key(&self) -> &SecretKey {
        &self.key
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.key.public().address()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, IdentityError> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// Keypair derived from a wallet signature
#[derive(Debug, Clone)]
pub struct SubIdentity {
    secret: SecretKey,
}

impl SubIdentity {
    /// Ask the wallet to sign [`BEDROCK_MESSAGE`] and derive the keypair
    pub async fn derive<W>(wallet: &W) -> Result<Self, IdentityError>
    where
        W: Wallet + ?Sized,
    {
        let signature = wallet.sign_message(BEDROCK_MESSAGE.as_bytes()).await?;
        tracing::debug!(wallet = %wallet.address(), "derived sub-identity from wallet signature");
        Ok(Self::from_signature(&signature))
    }

    pub fn from_signature(signature: &[u8]) -> Self {
        let seed: [u8; PRIVATE_KEY_SIZE] = Keccak256::digest(signature).into();
        Self {
            secret: SecretKey::from(seed),
        }
    }

    pub fn address(&self) -> Address {
        self.secret.public().address()
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public()
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}
