//! Cryptographic primitives for Bedrock
//!
//! - **Identity**: a wallet signs a fixed message once per session; the
//!   digest of that signature seeds an Ed25519 sub-identity keypair
//! - **Content encryption**: ChaCha20-Poly1305 with a per-file 256-bit
//!   [`Secret`] and 96-bit [`Iv`]
//! - **Key wrapping**: [`SealedBox`] wraps keys, IVs and paths for a
//!   recipient public key (X25519 ECDH after Ed25519 to Montgomery
//!   conversion)
//!
//! Nothing leaves the client in plaintext except content addresses and
//! wallet addresses.

mod identity;
mod keys;
mod sealed;
mod secret;

pub use ed25519_dalek::Signature;
pub use identity::{IdentityError, LocalWallet, SubIdentity, Wallet, BEDROCK_MESSAGE};
pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use sealed::{SealedBox, SEALED_OVERHEAD};
pub use secret::{CryptoError, Iv, Secret, IV_SIZE, SECRET_SIZE, TAG_SIZE};
