//! Wrapping small secrets for a public key
//!
//! File keys, IVs, paths and contact names are wrapped so that only the
//! holder of the matching private key can read them:
//!
//! 1. Generate an ephemeral Ed25519 keypair
//! 2. Convert both keys to X25519 and perform ECDH
//! 3. Derive a one-time key with BLAKE3 over the shared secret and both public keys
//! 4. Encrypt the secret with ChaCha20-Poly1305 under a random nonce
//!
//! The recipient repeats the ECDH with its private key. Using the wrong
//! private key fails authentication instead of producing garbage.

use std::fmt;

use super::keys::{PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::{CryptoError, Secret, IV_SIZE, TAG_SIZE};

const KDF_CONTEXT: &str = "bedrock.im 2024-05 sealed box v1";

/// Smallest possible sealed box: ephemeral key, nonce and tag over an
/// empty message
pub const SEALED_OVERHEAD: usize = PUBLIC_KEY_SIZE + IV_SIZE + TAG_SIZE;

/// A secret wrapped for one recipient
///
/// # Wire Format
///
/// ```text
/// [ ephemeral_pubkey: 32 bytes ][ nonce: 12 bytes ][ ciphertext || tag ]
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBox(Vec<u8>);

impl fmt::Debug for SealedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedBox({} bytes)", self.0.len())
    }
}

fn derive_key(shared: &[u8; 32], ephemeral: &PublicKey, recipient: &PublicKey) -> Secret {
    let mut material = Vec::with_capacity(32 + 2 * PUBLIC_KEY_SIZE);
    material.extend_from_slice(shared);
    material.extend_from_slice(&ephemeral.to_bytes());
    material.extend_from_slice(&recipient.to_bytes());
    Secret::from(blake3::derive_key(KDF_CONTEXT, &material))
}

impl SealedBox {
    /// Wrap `secret` so that only `recipient` can recover it
    pub fn wrap(secret: &[u8], recipient: &PublicKey) -> Result<Self, CryptoError> {
        let ephemeral_private = SecretKey::generate()?;
        let ephemeral_public = ephemeral_private.public();

        let shared = ephemeral_private
            .to_x25519()
            .diffie_hellman(&recipient.to_x25519()?);
        if !shared.was_contributory() {
            return Err(CryptoError::Encryption);
        }

        let key = derive_key(shared.as_bytes(), &ephemeral_public, recipient);
        let sealed = key.seal(secret)?;

        let mut out = Vec::with_capacity(PUBLIC_KEY_SIZE + sealed.len());
        out.extend_from_slice(&ephemeral_public.to_bytes());
        out.extend_from_slice(&sealed);
        Ok(Self(out))
    }

    /// Recover the wrapped secret with the recipient's private key
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] when the box was wrapped for a
    /// different key or has been corrupted.
    pub fn unwrap(&self, recipient: &SecretKey) -> Result<Vec<u8>, CryptoError> {
        if self.0.len() < SEALED_OVERHEAD {
            return Err(CryptoError::Decryption);
        }
        let ephemeral_public = PublicKey::try_from(&self.0[..PUBLIC_KEY_SIZE])
            .map_err(|_| CryptoError::Decryption)?;

        let shared = recipient
            .to_x25519()
            .diffie_hellman(
                &ephemeral_public
                    .to_x25519()
                    .map_err(|_| CryptoError::Decryption)?,
            );
        if !shared.was_contributory() {
            return Err(CryptoError::Decryption);
        }

        let key = derive_key(shared.as_bytes(), &ephemeral_public, &recipient.public());
        key.open(&self.0[PUBLIC_KEY_SIZE..])
    }

    /// Wrap a UTF-8 value and return it hex encoded, the format used in
    /// ledger documents
    pub fn wrap_str(value: &str, recipient: &PublicKey) -> Result<String, CryptoError> {
        Ok(Self::wrap(value.as_bytes(), recipient)?.to_hex())
    }

    /// Unwrap a hex encoded box holding a UTF-8 value
    pub fn unwrap_str(hex: &str, recipient: &SecretKey) -> Result<String, CryptoError> {
        let bytes = Self::from_hex(hex)?.unwrap(recipient)?;
        String::from_utf8(bytes).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}
